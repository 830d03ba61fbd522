// Database trait — backend-agnostic async interface for all DB operations.
//
// Implementor: SqliteDatabase (wraps rusqlite). All methods are async so a
// sync backend (rusqlite via Mutex) and any future native-async backend fit
// behind a single interface.
//
// The trait mirrors the queries.rs function signatures, so callers hold an
// `Arc<dyn Database>` and never see a Connection.

use anyhow::Result;
use async_trait::async_trait;

use super::models::{
    ActionKind, ContentFlag, ContentItem, Disposition, ModerationAction, ModerationMetric,
    ModerationSetting, ModerationStatus, NewProcessedContent, ProcessedContent,
};

#[async_trait]
pub trait Database: Send + Sync {
    // --- Lifecycle ---

    /// Count the number of user-created tables in the database.
    async fn table_count(&self) -> Result<i64>;

    // --- Content ingest ---

    /// Persist one processed submission (content + status + flags + action)
    /// atomically and return the stored records.
    async fn insert_processed(&self, new: NewProcessedContent) -> Result<ProcessedContent>;

    async fn get_content(&self, content_id: i64) -> Result<Option<ContentItem>>;

    async fn get_status(&self, content_id: i64) -> Result<Option<ModerationStatus>>;

    async fn get_flags(&self, content_id: i64) -> Result<Vec<ContentFlag>>;

    /// Audit actions for one content item, oldest first.
    async fn get_actions(&self, content_id: i64) -> Result<Vec<ModerationAction>>;

    /// Apply a human decision and append its audit action atomically.
    async fn update_status_with_action(
        &self,
        content_id: i64,
        new_status: Disposition,
        action: ActionKind,
        user_id: Option<i64>,
        notes: Option<String>,
    ) -> Result<ModerationStatus>;

    // --- Aggregation range queries (datetime strings) ---

    async fn count_statuses_updated_between(&self, start: &str, end: &str) -> Result<i64>;

    async fn status_counts_between(&self, start: &str, end: &str) -> Result<Vec<(String, i64)>>;

    async fn flag_type_counts_between(&self, start: &str, end: &str)
        -> Result<Vec<(String, i64)>>;

    async fn avg_processing_time_between(&self, start: &str, end: &str) -> Result<Option<f64>>;

    // --- Metrics ---

    /// Metric types already recorded for an ISO date.
    async fn metric_types_for_date(&self, date: &str) -> Result<Vec<String>>;

    /// Write newly computed metrics for one date in one transaction.
    async fn insert_metrics(
        &self,
        date: &str,
        metrics: Vec<(String, serde_json::Value)>,
    ) -> Result<()>;

    async fn get_metrics_between(&self, start: &str, end: &str) -> Result<Vec<ModerationMetric>>;

    // --- Settings ---

    async fn get_setting(&self, name: &str) -> Result<Option<ModerationSetting>>;

    async fn set_setting(&self, name: &str, value: &str, description: Option<&str>) -> Result<()>;

    async fn list_settings(&self) -> Result<Vec<ModerationSetting>>;

    // --- System status ---

    async fn content_count(&self) -> Result<i64>;

    /// Disposition histogram over the whole store.
    async fn status_counts_all(&self) -> Result<Vec<(String, i64)>>;

    /// Flag types in use across the whole store.
    async fn distinct_flag_types(&self) -> Result<Vec<String>>;
}
