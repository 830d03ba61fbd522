// Database schema — table creation and migrations.
//
// We use a simple version-based migration approach: a `schema_version` table
// tracks which migrations have run. The initial schema covers the six
// moderation entities; later changes go through run_migration.

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Create all tables if they don't exist yet.
///
/// This is idempotent — safe to call on every startup.
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        -- Tracks schema version for future migrations
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Submitted content. Immutable after creation.
        CREATE TABLE IF NOT EXISTS content (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER,                   -- submitting user, null for anonymous
            content_type TEXT NOT NULL,        -- text / image / video
            content_text TEXT NOT NULL,        -- truncated display text
            original_content TEXT NOT NULL,    -- full payload, or a reference string for large media
            content_metadata TEXT,             -- JSON blob
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- One moderation state row per content item
        CREATE TABLE IF NOT EXISTS moderation_status (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            content_id INTEGER NOT NULL UNIQUE REFERENCES content(id),
            status TEXT NOT NULL DEFAULT 'pending',   -- pending / approved / rejected
            moderation_score REAL,             -- max per-category score
            is_automated INTEGER NOT NULL DEFAULT 1,
            processing_time REAL,              -- seconds
            last_updated TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Per-category flags above the reporting threshold. Never mutated.
        CREATE TABLE IF NOT EXISTS content_flags (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            content_id INTEGER NOT NULL REFERENCES content(id),
            flag_type TEXT NOT NULL,           -- profanity, hate_speech, violence, ...
            flag_score REAL NOT NULL,          -- 0.0 to 1.0
            flag_details TEXT,                 -- JSON explanation payload
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Append-only audit log. user_id null means automated.
        CREATE TABLE IF NOT EXISTS moderation_actions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            content_id INTEGER NOT NULL REFERENCES content(id),
            user_id INTEGER,
            action_type TEXT NOT NULL,         -- automated_*, approved, rejected, escalate
            action_notes TEXT,
            previous_status TEXT,              -- the status before this action
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Named string-valued settings
        CREATE TABLE IF NOT EXISTS moderation_settings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            setting_name TEXT NOT NULL UNIQUE,
            setting_value TEXT NOT NULL,
            setting_description TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Daily aggregates, one row per (date, type)
        CREATE TABLE IF NOT EXISTS moderation_metrics (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            metric_date TEXT NOT NULL,         -- ISO date
            metric_type TEXT NOT NULL,         -- daily_processed, flag_distribution, ...
            metric_value TEXT NOT NULL,        -- JSON aggregate
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(metric_date, metric_type)
        );

        -- Index for looking up flags and actions by content
        CREATE INDEX IF NOT EXISTS idx_flags_content
            ON content_flags(content_id);

        CREATE INDEX IF NOT EXISTS idx_actions_content
            ON moderation_actions(content_id);

        -- Indexes for the daily aggregation range scans
        CREATE INDEX IF NOT EXISTS idx_status_updated
            ON moderation_status(last_updated);

        CREATE INDEX IF NOT EXISTS idx_flags_created
            ON content_flags(created_at);

        CREATE INDEX IF NOT EXISTS idx_metrics_date
            ON moderation_metrics(metric_date);
        ",
    )
    .context("Failed to create database tables")?;

    // Record initial schema version if not already set
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [1],
    )?;

    Ok(())
}

/// Run a migration if it hasn't been applied yet.
/// The migration function receives the connection and should execute its SQL.
#[allow(dead_code)]
fn run_migration<F>(conn: &Connection, version: i64, migrate: F) -> Result<()>
where
    F: FnOnce(&Connection) -> rusqlite::Result<()>,
{
    let already_applied: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM schema_version WHERE version = ?1",
        [version],
        |row| row.get(0),
    )?;

    if !already_applied {
        migrate(conn).with_context(|| format!("Migration v{version} failed"))?;
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [version],
        )?;
    }

    Ok(())
}

/// Count the number of tables in the database (useful for init confirmation).
pub fn table_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}
