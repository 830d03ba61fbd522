// SqliteDatabase — rusqlite backend implementing the Database trait.
//
// The Connection is wrapped in tokio::sync::Mutex because Connection is !Send.
// Trait methods lock the mutex, do synchronous rusqlite work, and return.
// The lock is never held across .await points — Rust enforces this because
// MutexGuard is !Send.
//
// The free functions in queries.rs remain usable against a Connection
// directly, which keeps unit tests synchronous.

use anyhow::Result;
use async_trait::async_trait;
use rusqlite::Connection;
use tokio::sync::Mutex;

use super::models::{
    ActionKind, ContentFlag, ContentItem, Disposition, ModerationAction, ModerationMetric,
    ModerationSetting, ModerationStatus, NewProcessedContent, ProcessedContent,
};
use super::traits::Database;

pub struct SqliteDatabase {
    conn: Mutex<Connection>,
}

impl SqliteDatabase {
    /// Wrap an already-opened rusqlite Connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    async fn table_count(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::schema::table_count(&conn)
    }

    async fn insert_processed(&self, new: NewProcessedContent) -> Result<ProcessedContent> {
        let mut conn = self.conn.lock().await;
        super::queries::insert_processed(&mut conn, &new)
    }

    async fn get_content(&self, content_id: i64) -> Result<Option<ContentItem>> {
        let conn = self.conn.lock().await;
        super::queries::get_content(&conn, content_id)
    }

    async fn get_status(&self, content_id: i64) -> Result<Option<ModerationStatus>> {
        let conn = self.conn.lock().await;
        super::queries::get_status(&conn, content_id)
    }

    async fn get_flags(&self, content_id: i64) -> Result<Vec<ContentFlag>> {
        let conn = self.conn.lock().await;
        super::queries::get_flags(&conn, content_id)
    }

    async fn get_actions(&self, content_id: i64) -> Result<Vec<ModerationAction>> {
        let conn = self.conn.lock().await;
        super::queries::get_actions(&conn, content_id)
    }

    async fn update_status_with_action(
        &self,
        content_id: i64,
        new_status: Disposition,
        action: ActionKind,
        user_id: Option<i64>,
        notes: Option<String>,
    ) -> Result<ModerationStatus> {
        let mut conn = self.conn.lock().await;
        super::queries::update_status_with_action(
            &mut conn,
            content_id,
            new_status,
            action,
            user_id,
            notes.as_deref(),
        )
    }

    async fn count_statuses_updated_between(&self, start: &str, end: &str) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::queries::count_statuses_updated_between(&conn, start, end)
    }

    async fn status_counts_between(&self, start: &str, end: &str) -> Result<Vec<(String, i64)>> {
        let conn = self.conn.lock().await;
        super::queries::status_counts_between(&conn, start, end)
    }

    async fn flag_type_counts_between(
        &self,
        start: &str,
        end: &str,
    ) -> Result<Vec<(String, i64)>> {
        let conn = self.conn.lock().await;
        super::queries::flag_type_counts_between(&conn, start, end)
    }

    async fn avg_processing_time_between(&self, start: &str, end: &str) -> Result<Option<f64>> {
        let conn = self.conn.lock().await;
        super::queries::avg_processing_time_between(&conn, start, end)
    }

    async fn metric_types_for_date(&self, date: &str) -> Result<Vec<String>> {
        let conn = self.conn.lock().await;
        super::queries::metric_types_for_date(&conn, date)
    }

    async fn insert_metrics(
        &self,
        date: &str,
        metrics: Vec<(String, serde_json::Value)>,
    ) -> Result<()> {
        let mut conn = self.conn.lock().await;
        super::queries::insert_metrics(&mut conn, date, &metrics)
    }

    async fn get_metrics_between(&self, start: &str, end: &str) -> Result<Vec<ModerationMetric>> {
        let conn = self.conn.lock().await;
        super::queries::get_metrics_between(&conn, start, end)
    }

    async fn get_setting(&self, name: &str) -> Result<Option<ModerationSetting>> {
        let conn = self.conn.lock().await;
        super::queries::get_setting(&conn, name)
    }

    async fn set_setting(&self, name: &str, value: &str, description: Option<&str>) -> Result<()> {
        let conn = self.conn.lock().await;
        super::queries::set_setting(&conn, name, value, description)
    }

    async fn list_settings(&self) -> Result<Vec<ModerationSetting>> {
        let conn = self.conn.lock().await;
        super::queries::list_settings(&conn)
    }

    async fn content_count(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::queries::content_count(&conn)
    }

    async fn status_counts_all(&self) -> Result<Vec<(String, i64)>> {
        let conn = self.conn.lock().await;
        super::queries::status_counts_all(&conn)
    }

    async fn distinct_flag_types(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock().await;
        super::queries::distinct_flag_types(&conn)
    }
}
