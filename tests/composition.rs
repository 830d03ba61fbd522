// Full-flow composition test: generate data, train, moderate, decide,
// aggregate. Exercises the subsystems together the way the CLI does.

use std::sync::Arc;

use chrono::Utc;
use rusqlite::Connection;

use sieve::classifier::{Classifier, ClassifierHandle};
use sieve::db::models::{ContentKind, Disposition};
use sieve::db::schema::create_tables;
use sieve::db::sqlite::SqliteDatabase;
use sieve::db::Database;
use sieve::metrics::{MetricsAggregator, DAILY_PROCESSED};
use sieve::pipeline::{ContentProcessor, ModerateRequest};
use sieve::training::dataset::generate_sample;
use sieve::training::Trainer;

#[tokio::test]
async fn end_to_end_moderation_flow() {
    let dir = tempfile::tempdir().unwrap();
    let model_path = dir.path().join("model.json");

    // 1. Generate a clean synthetic dataset and train every category
    let csv_path = dir.path().join("train.csv");
    generate_sample(&csv_path, 200, 0.0, 9).unwrap();

    let handle = Arc::new(ClassifierHandle::new(Classifier::new()));
    let trainer = Trainer::new(handle.clone(), model_path);
    let report = trainer.train_from_file(&csv_path, 0.2, 42).unwrap();
    assert_eq!(report.results.len(), 5);

    // 2. Moderate a batch through the trained engine
    let conn = Connection::open_in_memory().unwrap();
    create_tables(&conn).unwrap();
    let db: Arc<dyn Database> = Arc::new(SqliteDatabase::new(conn));
    let processor = ContentProcessor::new(db.clone(), handle);

    let items = vec![
        ModerateRequest {
            content: Some("I will kill you tomorrow".to_string()),
            content_type: None,
            user_id: Some(1),
            metadata: None,
        },
        ModerateRequest {
            content: Some("thanks, the package arrived safely".to_string()),
            content_type: None,
            user_id: Some(2),
            metadata: None,
        },
    ];
    let results = processor.batch_process(items).await;
    assert_eq!(results.len(), 2);

    let threat = &results[0];
    assert!(threat.flags.iter().any(|f| f.flag_type == "violence"));
    assert_ne!(threat.status.disposition, Disposition::Approved);

    // 3. A human reviewer overrides the first item
    let updated = processor
        .update_status(
            threat.content.id,
            Disposition::Rejected,
            Some(99),
            Some("credible threat".to_string()),
        )
        .await
        .unwrap();
    assert_eq!(updated.disposition, Disposition::Rejected);

    let actions = db.get_actions(threat.content.id).await.unwrap();
    assert_eq!(actions.len(), 2);
    assert_eq!(actions[1].previous_status, Some(threat.status.disposition));

    // 4. Review surface sees the final state
    let view = processor.get_content(threat.content.id).await.unwrap();
    assert_eq!(view.status.unwrap().disposition, Disposition::Rejected);

    // 5. Daily aggregation picks everything up and is idempotent
    let aggregator = MetricsAggregator::new(db);
    let today = Utc::now().date_naive();
    assert_eq!(aggregator.generate_daily(today).await.unwrap().len(), 4);
    assert!(aggregator.generate_daily(today).await.unwrap().is_empty());

    let series = aggregator.get_metrics(3).await.unwrap();
    let daily = series[DAILY_PROCESSED].last().unwrap();
    assert_eq!(daily.value["count"], 2);

    // 6. A media submission flows through the stub policy alongside text
    let media = processor
        .process(
            &"C".repeat(3000),
            ContentKind::Video,
            None,
            Some(serde_json::json!({"filename": "clip.mp4"})),
        )
        .await
        .unwrap();
    assert_eq!(media.content.original_content, "[VIDEO content] - clip.mp4");
}
