// Metrics aggregation — daily roll-ups over moderation activity.
//
// generate_daily is idempotent per (date, metric type): a type already
// recorded for the date is skipped, so re-running an aggregation is a no-op
// rather than an overwrite. get_metrics always returns one entry per day
// per series; gaps are filled with zero/empty placeholders, and a store
// with no metrics at all yields a bounded random demo series so dashboards
// never render empty before the first aggregation run.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use chrono::{Duration, NaiveDate, Utc};
use rand::Rng;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use crate::db::Database;

pub const DAILY_PROCESSED: &str = "daily_processed";
pub const FLAG_DISTRIBUTION: &str = "flag_distribution";
pub const STATUS_DISTRIBUTION: &str = "status_distribution";
pub const AVG_PROCESSING_TIME: &str = "avg_processing_time";

/// One point of a per-type metric series.
#[derive(Debug, Clone, Serialize)]
pub struct MetricPoint {
    pub date: String,
    pub value: Value,
}

pub struct MetricsAggregator {
    db: Arc<dyn Database>,
}

impl MetricsAggregator {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// Compute and persist the daily metrics for one calendar day. Returns
    /// the metric types newly written; types already recorded are skipped.
    pub async fn generate_daily(&self, date: NaiveDate) -> Result<Vec<String>> {
        let date_str = date.to_string();
        let day_start = format!("{date_str} 00:00:00");
        let day_end = format!("{date_str} 23:59:59");

        let existing = self.db.metric_types_for_date(&date_str).await?;
        let mut computed: Vec<(String, Value)> = Vec::new();

        if !existing.iter().any(|t| t == DAILY_PROCESSED) {
            let count = self
                .db
                .count_statuses_updated_between(&day_start, &day_end)
                .await?;
            computed.push((DAILY_PROCESSED.to_string(), json!({ "count": count })));
        }

        if !existing.iter().any(|t| t == FLAG_DISTRIBUTION) {
            let counts = self.db.flag_type_counts_between(&day_start, &day_end).await?;
            computed.push((FLAG_DISTRIBUTION.to_string(), histogram(counts)));
        }

        if !existing.iter().any(|t| t == STATUS_DISTRIBUTION) {
            let counts = self.db.status_counts_between(&day_start, &day_end).await?;
            computed.push((STATUS_DISTRIBUTION.to_string(), histogram(counts)));
        }

        if !existing.iter().any(|t| t == AVG_PROCESSING_TIME) {
            let avg = self
                .db
                .avg_processing_time_between(&day_start, &day_end)
                .await?
                .unwrap_or(0.0);
            computed.push((AVG_PROCESSING_TIME.to_string(), json!(avg)));
        }

        if computed.is_empty() {
            info!(date = %date_str, "All daily metrics already recorded");
            return Ok(Vec::new());
        }

        let written: Vec<String> = computed.iter().map(|(t, _)| t.clone()).collect();
        self.db.insert_metrics(&date_str, computed).await?;

        info!(date = %date_str, types = written.len(), "Generated daily metrics");
        Ok(written)
    }

    /// Per-type, date-ordered metric series over the trailing window.
    pub async fn get_metrics(&self, days: i64) -> Result<BTreeMap<String, Vec<MetricPoint>>> {
        let days = days.max(1);
        let end = Utc::now().date_naive();
        let start = end - Duration::days(days);

        let rows = self
            .db
            .get_metrics_between(&start.to_string(), &end.to_string())
            .await?;

        if rows.is_empty() {
            return Ok(sample_series(end, days));
        }

        let mut by_type: BTreeMap<String, Vec<MetricPoint>> = BTreeMap::new();
        for row in rows {
            by_type.entry(row.metric_type).or_default().push(MetricPoint {
                date: row.metric_date,
                value: row.metric_value,
            });
        }

        // Every series gets one entry per day in the window.
        let window: Vec<String> = (0..days).map(|i| (end - Duration::days(i)).to_string()).collect();
        for (metric_type, points) in &mut by_type {
            for date in &window {
                if !points.iter().any(|p| &p.date == date) {
                    points.push(MetricPoint {
                        date: date.clone(),
                        value: placeholder_value(metric_type),
                    });
                }
            }
            points.sort_by(|a, b| a.date.cmp(&b.date));
        }

        Ok(by_type)
    }
}

fn histogram(counts: Vec<(String, i64)>) -> Value {
    let map: serde_json::Map<String, Value> = counts
        .into_iter()
        .map(|(key, count)| (key, json!(count)))
        .collect();
    Value::Object(map)
}

/// Zero/empty value for a missing day of a given series.
fn placeholder_value(metric_type: &str) -> Value {
    match metric_type {
        DAILY_PROCESSED => json!({ "count": 0 }),
        FLAG_DISTRIBUTION | STATUS_DISTRIBUTION => json!({}),
        AVG_PROCESSING_TIME => json!(0.0),
        _ => json!(0),
    }
}

/// Bounded random demo series for an empty store.
fn sample_series(end: NaiveDate, days: i64) -> BTreeMap<String, Vec<MetricPoint>> {
    let flag_types = [
        "profanity",
        "hate_speech",
        "violence",
        "sexual_content",
        "harassment",
    ];
    let statuses = ["pending", "approved", "rejected"];
    let mut rng = rand::rng();

    let mut daily_processed = Vec::new();
    let mut flag_distribution = Vec::new();
    let mut status_distribution = Vec::new();
    let mut avg_processing_time = Vec::new();

    // Oldest first, one point per day.
    for i in (0..days).rev() {
        let date = (end - Duration::days(i)).to_string();

        daily_processed.push(MetricPoint {
            date: date.clone(),
            value: json!({ "count": rng.random_range(50..=200) }),
        });

        let mut flags = serde_json::Map::new();
        for flag_type in flag_types {
            if rng.random_bool(0.8) {
                flags.insert(flag_type.to_string(), json!(rng.random_range(5..=50)));
            }
        }
        flag_distribution.push(MetricPoint {
            date: date.clone(),
            value: Value::Object(flags),
        });

        let mut status_counts = serde_json::Map::new();
        for status in statuses {
            status_counts.insert(status.to_string(), json!(rng.random_range(10..=70)));
        }
        status_distribution.push(MetricPoint {
            date: date.clone(),
            value: Value::Object(status_counts),
        });

        let time = (rng.random_range(0.1..2.0) * 100.0_f64).round() / 100.0;
        avg_processing_time.push(MetricPoint {
            date,
            value: json!(time),
        });
    }

    BTreeMap::from([
        (DAILY_PROCESSED.to_string(), daily_processed),
        (FLAG_DISTRIBUTION.to_string(), flag_distribution),
        (STATUS_DISTRIBUTION.to_string(), status_distribution),
        (AVG_PROCESSING_TIME.to_string(), avg_processing_time),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_values_by_type() {
        assert_eq!(placeholder_value(DAILY_PROCESSED), json!({"count": 0}));
        assert_eq!(placeholder_value(FLAG_DISTRIBUTION), json!({}));
        assert_eq!(placeholder_value(AVG_PROCESSING_TIME), json!(0.0));
        assert_eq!(placeholder_value("something_else"), json!(0));
    }

    #[test]
    fn test_sample_series_shape() {
        let end = NaiveDate::from_ymd_opt(2026, 8, 6).unwrap();
        let series = sample_series(end, 7);
        assert_eq!(series.len(), 4);
        for (metric_type, points) in &series {
            assert_eq!(points.len(), 7, "{metric_type} series length");
            // Oldest first
            assert!(points.first().unwrap().date < points.last().unwrap().date);
        }
        // Bounded counts
        for point in &series[DAILY_PROCESSED] {
            let count = point.value["count"].as_i64().unwrap();
            assert!((50..=200).contains(&count));
        }
    }

    #[test]
    fn test_histogram_builds_object() {
        let value = histogram(vec![("violence".to_string(), 3), ("profanity".to_string(), 1)]);
        assert_eq!(value["violence"], 3);
        assert_eq!(value["profanity"], 1);
    }
}
