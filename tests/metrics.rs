// Integration tests for the metrics aggregator.
//
// The aggregation day is always "today" (UTC) because the status and flag
// rows get their timestamps from SQLite's datetime('now').

use std::sync::Arc;

use chrono::Utc;
use rusqlite::Connection;

use sieve::classifier::Classifier;
use sieve::classifier::ClassifierHandle;
use sieve::db::models::ContentKind;
use sieve::db::schema::create_tables;
use sieve::db::sqlite::SqliteDatabase;
use sieve::db::Database;
use sieve::metrics::{
    MetricsAggregator, AVG_PROCESSING_TIME, DAILY_PROCESSED, FLAG_DISTRIBUTION,
    STATUS_DISTRIBUTION,
};
use sieve::pipeline::ContentProcessor;

fn test_db() -> Arc<dyn Database> {
    let conn = Connection::open_in_memory().unwrap();
    create_tables(&conn).unwrap();
    Arc::new(SqliteDatabase::new(conn))
}

async fn seed_content(db: &Arc<dyn Database>, texts: &[&str]) {
    let handle = Arc::new(ClassifierHandle::new(Classifier::new()));
    let processor = ContentProcessor::new(db.clone(), handle);
    for text in texts {
        processor
            .process(text, ContentKind::Text, None, None)
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn generate_daily_writes_all_four_types() {
    let db = test_db();
    seed_content(&db, &["first", "second"]).await;

    let aggregator = MetricsAggregator::new(db.clone());
    let today = Utc::now().date_naive();

    let written = aggregator.generate_daily(today).await.unwrap();
    assert_eq!(written.len(), 4);

    let rows = db
        .get_metrics_between(&today.to_string(), &today.to_string())
        .await
        .unwrap();
    assert_eq!(rows.len(), 4);

    // Both processed statuses were updated today
    let daily = rows
        .iter()
        .find(|m| m.metric_type == DAILY_PROCESSED)
        .unwrap();
    assert_eq!(daily.metric_value["count"], 2);

    // Latency average exists and is non-negative
    let avg = rows
        .iter()
        .find(|m| m.metric_type == AVG_PROCESSING_TIME)
        .unwrap();
    assert!(avg.metric_value.as_f64().unwrap() >= 0.0);

    // Histograms are objects
    for metric_type in [FLAG_DISTRIBUTION, STATUS_DISTRIBUTION] {
        let row = rows.iter().find(|m| m.metric_type == metric_type).unwrap();
        assert!(row.metric_value.is_object());
    }
}

#[tokio::test]
async fn generate_daily_is_idempotent() {
    let db = test_db();
    seed_content(&db, &["only item"]).await;

    let aggregator = MetricsAggregator::new(db.clone());
    let today = Utc::now().date_naive();

    let first = aggregator.generate_daily(today).await.unwrap();
    assert_eq!(first.len(), 4);
    let rows_after_first = db
        .get_metrics_between(&today.to_string(), &today.to_string())
        .await
        .unwrap();

    // Second run is a no-op, not an overwrite
    let second = aggregator.generate_daily(today).await.unwrap();
    assert!(second.is_empty());

    let rows_after_second = db
        .get_metrics_between(&today.to_string(), &today.to_string())
        .await
        .unwrap();
    assert_eq!(rows_after_first.len(), rows_after_second.len());
    for (a, b) in rows_after_first.iter().zip(&rows_after_second) {
        assert_eq!(a.metric_value, b.metric_value);
    }
}

#[tokio::test]
async fn generate_daily_with_no_activity_writes_zeros() {
    let db = test_db();
    let aggregator = MetricsAggregator::new(db.clone());
    let today = Utc::now().date_naive();

    let written = aggregator.generate_daily(today).await.unwrap();
    assert_eq!(written.len(), 4);

    let rows = db
        .get_metrics_between(&today.to_string(), &today.to_string())
        .await
        .unwrap();
    let daily = rows
        .iter()
        .find(|m| m.metric_type == DAILY_PROCESSED)
        .unwrap();
    assert_eq!(daily.metric_value["count"], 0);
    // No latencies at all resolves to 0, never a division error
    let avg = rows
        .iter()
        .find(|m| m.metric_type == AVG_PROCESSING_TIME)
        .unwrap();
    assert_eq!(avg.metric_value.as_f64().unwrap(), 0.0);
}

#[tokio::test]
async fn get_metrics_fills_missing_days_with_placeholders() {
    let db = test_db();
    seed_content(&db, &["one", "two", "three"]).await;

    let aggregator = MetricsAggregator::new(db.clone());
    aggregator
        .generate_daily(Utc::now().date_naive())
        .await
        .unwrap();

    let series = aggregator.get_metrics(5).await.unwrap();

    // Only today was aggregated, but every series has one entry per day
    let daily = &series[DAILY_PROCESSED];
    assert_eq!(daily.len(), 5);
    // Dates ascend
    for pair in daily.windows(2) {
        assert!(pair[0].date < pair[1].date);
    }
    // The most recent day carries the real count, earlier days the placeholder
    assert_eq!(daily.last().unwrap().value["count"], 3);
    assert_eq!(daily.first().unwrap().value["count"], 0);
}

#[tokio::test]
async fn get_metrics_empty_store_yields_demo_series() {
    let db = test_db();
    let aggregator = MetricsAggregator::new(db);

    let series = aggregator.get_metrics(7).await.unwrap();

    // All four series present, one bounded point per day
    assert_eq!(series.len(), 4);
    for points in series.values() {
        assert_eq!(points.len(), 7);
    }
    for point in &series[DAILY_PROCESSED] {
        let count = point.value["count"].as_i64().unwrap();
        assert!((50..=200).contains(&count), "demo count {count} out of bounds");
    }
}
