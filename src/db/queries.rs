// Database queries — CRUD operations for all tables.
//
// Every database interaction goes through this module. This keeps SQL
// contained in one place and gives the rest of the app clean Rust interfaces.
//
// The two multi-row writes (insert_processed, update_status_with_action)
// run inside a single transaction: either every row lands or none do.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::ModerationError;

use super::models::{
    ActionKind, ContentFlag, ContentItem, ContentKind, Disposition, ModerationAction,
    ModerationMetric, ModerationSetting, ModerationStatus, NewProcessedContent, ProcessedContent,
};

// --- Row mapping helpers ---

fn row_to_content(row: &rusqlite::Row<'_>) -> rusqlite::Result<ContentItem> {
    let kind: String = row.get(2)?;
    let metadata: Option<String> = row.get(5)?;
    Ok(ContentItem {
        id: row.get(0)?,
        user_id: row.get(1)?,
        kind: ContentKind::parse_or_text(&kind),
        content_text: row.get(3)?,
        original_content: row.get(4)?,
        metadata: metadata.and_then(|s| serde_json::from_str(&s).ok()),
        created_at: row.get(6)?,
    })
}

fn row_to_status(row: &rusqlite::Row<'_>) -> rusqlite::Result<ModerationStatus> {
    let status: String = row.get(2)?;
    Ok(ModerationStatus {
        id: row.get(0)?,
        content_id: row.get(1)?,
        disposition: Disposition::parse(&status).unwrap_or(Disposition::Pending),
        moderation_score: row.get(3)?,
        is_automated: row.get(4)?,
        processing_time: row.get(5)?,
        last_updated: row.get(6)?,
    })
}

fn row_to_flag(row: &rusqlite::Row<'_>) -> rusqlite::Result<ContentFlag> {
    let details: Option<String> = row.get(4)?;
    Ok(ContentFlag {
        id: row.get(0)?,
        content_id: row.get(1)?,
        flag_type: row.get(2)?,
        flag_score: row.get(3)?,
        flag_details: details.and_then(|s| serde_json::from_str(&s).ok()),
        created_at: row.get(5)?,
    })
}

fn row_to_action(row: &rusqlite::Row<'_>) -> rusqlite::Result<ModerationAction> {
    let previous: Option<String> = row.get(5)?;
    Ok(ModerationAction {
        id: row.get(0)?,
        content_id: row.get(1)?,
        user_id: row.get(2)?,
        action_type: row.get(3)?,
        action_notes: row.get(4)?,
        previous_status: previous.as_deref().and_then(Disposition::parse),
        created_at: row.get(6)?,
    })
}

fn row_to_metric(row: &rusqlite::Row<'_>) -> rusqlite::Result<ModerationMetric> {
    let value: String = row.get(3)?;
    Ok(ModerationMetric {
        id: row.get(0)?,
        metric_date: row.get(1)?,
        metric_type: row.get(2)?,
        metric_value: serde_json::from_str(&value).unwrap_or(serde_json::Value::Null),
        created_at: row.get(4)?,
    })
}

// --- Content / status / flags / actions ---

const CONTENT_COLS: &str =
    "id, user_id, content_type, content_text, original_content, content_metadata, created_at";
const STATUS_COLS: &str =
    "id, content_id, status, moderation_score, is_automated, processing_time, last_updated";
const FLAG_COLS: &str = "id, content_id, flag_type, flag_score, flag_details, created_at";
const ACTION_COLS: &str =
    "id, content_id, user_id, action_type, action_notes, previous_status, created_at";

pub fn get_content(conn: &Connection, content_id: i64) -> Result<Option<ContentItem>> {
    let mut stmt =
        conn.prepare(&format!("SELECT {CONTENT_COLS} FROM content WHERE id = ?1"))?;
    let result = stmt.query_row(params![content_id], row_to_content).optional()?;
    Ok(result)
}

pub fn get_status(conn: &Connection, content_id: i64) -> Result<Option<ModerationStatus>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {STATUS_COLS} FROM moderation_status WHERE content_id = ?1"
    ))?;
    let result = stmt.query_row(params![content_id], row_to_status).optional()?;
    Ok(result)
}

pub fn get_flags(conn: &Connection, content_id: i64) -> Result<Vec<ContentFlag>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {FLAG_COLS} FROM content_flags WHERE content_id = ?1 ORDER BY id"
    ))?;
    let rows = stmt.query_map(params![content_id], row_to_flag)?;
    let mut flags = Vec::new();
    for row in rows {
        flags.push(row?);
    }
    Ok(flags)
}

/// Actions for one content item, oldest first. The ordered chain
/// reconstructs the item's full moderation history.
pub fn get_actions(conn: &Connection, content_id: i64) -> Result<Vec<ModerationAction>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ACTION_COLS} FROM moderation_actions
         WHERE content_id = ?1 ORDER BY created_at, id"
    ))?;
    let rows = stmt.query_map(params![content_id], row_to_action)?;
    let mut actions = Vec::new();
    for row in rows {
        actions.push(row?);
    }
    Ok(actions)
}

/// Persist a processed submission: content row, status row, flags, and the
/// automated audit action, in one transaction. Returns the stored records.
pub fn insert_processed(
    conn: &mut Connection,
    new: &NewProcessedContent,
) -> Result<ProcessedContent> {
    let tx = conn.transaction()?;

    let metadata_json = new
        .metadata
        .as_ref()
        .map(|v| serde_json::to_string(v))
        .transpose()?;

    tx.execute(
        "INSERT INTO content (user_id, content_type, content_text, original_content, content_metadata)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            new.user_id,
            new.kind.as_str(),
            new.content_text,
            new.original_content,
            metadata_json,
        ],
    )?;
    let content_id = tx.last_insert_rowid();

    tx.execute(
        "INSERT INTO moderation_status (content_id, status, moderation_score, is_automated, processing_time)
         VALUES (?1, ?2, ?3, 1, ?4)",
        params![
            content_id,
            new.disposition.as_str(),
            new.moderation_score,
            new.processing_time,
        ],
    )?;

    for flag in &new.flags {
        tx.execute(
            "INSERT INTO content_flags (content_id, flag_type, flag_score, flag_details)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                content_id,
                flag.flag_type,
                flag.flag_score,
                serde_json::to_string(&flag.flag_details)?,
            ],
        )?;
    }

    tx.execute(
        "INSERT INTO moderation_actions (content_id, user_id, action_type, action_notes, previous_status)
         VALUES (?1, NULL, ?2, ?3, NULL)",
        params![
            content_id,
            ActionKind::automated(new.disposition).as_str(),
            new.action_notes,
        ],
    )?;

    // Read the stored rows back while still inside the transaction
    let content = get_content(&tx, content_id)?
        .context("content row missing immediately after insert")?;
    let status = get_status(&tx, content_id)?
        .context("status row missing immediately after insert")?;
    let flags = get_flags(&tx, content_id)?;
    let action = get_actions(&tx, content_id)?
        .pop()
        .context("action row missing immediately after insert")?;

    tx.commit()?;

    Ok(ProcessedContent {
        content,
        status,
        flags,
        action,
    })
}

/// Apply a human decision: overwrite the disposition, clear the automated
/// flag, and append the audit action recording the prior status — one
/// transaction. Fails with NotFound when the content or its status row is
/// absent; nothing is written in that case.
pub fn update_status_with_action(
    conn: &mut Connection,
    content_id: i64,
    new_status: Disposition,
    action: ActionKind,
    user_id: Option<i64>,
    notes: Option<&str>,
) -> Result<ModerationStatus> {
    let tx = conn.transaction()?;

    let exists: Option<i64> = tx
        .query_row(
            "SELECT id FROM content WHERE id = ?1",
            params![content_id],
            |row| row.get(0),
        )
        .optional()?;
    if exists.is_none() {
        return Err(ModerationError::ContentNotFound(content_id).into());
    }

    let current = get_status(&tx, content_id)?
        .ok_or(ModerationError::StatusNotFound(content_id))?;

    tx.execute(
        "UPDATE moderation_status
         SET status = ?2, is_automated = 0, last_updated = datetime('now')
         WHERE content_id = ?1",
        params![content_id, new_status.as_str()],
    )?;

    tx.execute(
        "INSERT INTO moderation_actions (content_id, user_id, action_type, action_notes, previous_status)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            content_id,
            user_id,
            action.as_str(),
            notes,
            current.disposition.as_str(),
        ],
    )?;

    let updated = get_status(&tx, content_id)?
        .context("status row missing immediately after update")?;

    tx.commit()?;
    Ok(updated)
}

// --- Aggregation range queries ---

/// Count status rows last updated within [start, end] (datetime strings).
pub fn count_statuses_updated_between(conn: &Connection, start: &str, end: &str) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM moderation_status WHERE last_updated BETWEEN ?1 AND ?2",
        params![start, end],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Per-disposition counts over status rows last updated within the range.
pub fn status_counts_between(
    conn: &Connection,
    start: &str,
    end: &str,
) -> Result<Vec<(String, i64)>> {
    let mut stmt = conn.prepare(
        "SELECT status, COUNT(*) FROM moderation_status
         WHERE last_updated BETWEEN ?1 AND ?2 GROUP BY status",
    )?;
    let rows = stmt.query_map(params![start, end], |row| Ok((row.get(0)?, row.get(1)?)))?;
    let mut counts = Vec::new();
    for row in rows {
        counts.push(row?);
    }
    Ok(counts)
}

/// Per-type counts over flags created within the range.
pub fn flag_type_counts_between(
    conn: &Connection,
    start: &str,
    end: &str,
) -> Result<Vec<(String, i64)>> {
    let mut stmt = conn.prepare(
        "SELECT flag_type, COUNT(*) FROM content_flags
         WHERE created_at BETWEEN ?1 AND ?2 GROUP BY flag_type",
    )?;
    let rows = stmt.query_map(params![start, end], |row| Ok((row.get(0)?, row.get(1)?)))?;
    let mut counts = Vec::new();
    for row in rows {
        counts.push(row?);
    }
    Ok(counts)
}

/// Mean processing latency over status rows updated within the range,
/// ignoring null latencies. None when no row qualifies.
pub fn avg_processing_time_between(
    conn: &Connection,
    start: &str,
    end: &str,
) -> Result<Option<f64>> {
    let avg: Option<f64> = conn.query_row(
        "SELECT AVG(processing_time) FROM moderation_status
         WHERE last_updated BETWEEN ?1 AND ?2 AND processing_time IS NOT NULL",
        params![start, end],
        |row| row.get(0),
    )?;
    Ok(avg)
}

// --- Metrics ---

/// Metric types already recorded for a date.
pub fn metric_types_for_date(conn: &Connection, date: &str) -> Result<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT metric_type FROM moderation_metrics WHERE metric_date = ?1")?;
    let rows = stmt.query_map(params![date], |row| row.get(0))?;
    let mut types = Vec::new();
    for row in rows {
        types.push(row?);
    }
    Ok(types)
}

/// Write a batch of newly computed metrics for one date in one transaction.
pub fn insert_metrics(
    conn: &mut Connection,
    date: &str,
    metrics: &[(String, serde_json::Value)],
) -> Result<()> {
    let tx = conn.transaction()?;
    for (metric_type, value) in metrics {
        tx.execute(
            "INSERT INTO moderation_metrics (metric_date, metric_type, metric_value)
             VALUES (?1, ?2, ?3)",
            params![date, metric_type, serde_json::to_string(value)?],
        )?;
    }
    tx.commit()?;
    Ok(())
}

/// All metric rows with metric_date in [start, end] (ISO date strings),
/// ordered by date.
pub fn get_metrics_between(
    conn: &Connection,
    start: &str,
    end: &str,
) -> Result<Vec<ModerationMetric>> {
    let mut stmt = conn.prepare(
        "SELECT id, metric_date, metric_type, metric_value, created_at
         FROM moderation_metrics
         WHERE metric_date BETWEEN ?1 AND ?2
         ORDER BY metric_date",
    )?;
    let rows = stmt.query_map(params![start, end], row_to_metric)?;
    let mut metrics = Vec::new();
    for row in rows {
        metrics.push(row?);
    }
    Ok(metrics)
}

// --- Settings ---

pub fn get_setting(conn: &Connection, name: &str) -> Result<Option<ModerationSetting>> {
    let mut stmt = conn.prepare(
        "SELECT setting_name, setting_value, setting_description, updated_at
         FROM moderation_settings WHERE setting_name = ?1",
    )?;
    let result = stmt
        .query_row(params![name], |row| {
            Ok(ModerationSetting {
                name: row.get(0)?,
                value: row.get(1)?,
                description: row.get(2)?,
                updated_at: row.get(3)?,
            })
        })
        .optional()?;
    Ok(result)
}

pub fn set_setting(
    conn: &Connection,
    name: &str,
    value: &str,
    description: Option<&str>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO moderation_settings (setting_name, setting_value, setting_description, updated_at)
         VALUES (?1, ?2, ?3, datetime('now'))
         ON CONFLICT(setting_name) DO UPDATE SET
            setting_value = ?2,
            setting_description = COALESCE(?3, setting_description),
            updated_at = datetime('now')",
        params![name, value, description],
    )?;
    Ok(())
}

pub fn list_settings(conn: &Connection) -> Result<Vec<ModerationSetting>> {
    let mut stmt = conn.prepare(
        "SELECT setting_name, setting_value, setting_description, updated_at
         FROM moderation_settings ORDER BY setting_name",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(ModerationSetting {
            name: row.get(0)?,
            value: row.get(1)?,
            description: row.get(2)?,
            updated_at: row.get(3)?,
        })
    })?;
    let mut settings = Vec::new();
    for row in rows {
        settings.push(row?);
    }
    Ok(settings)
}

// --- System status ---

pub fn content_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM content", [], |row| row.get(0))?;
    Ok(count)
}

/// Disposition histogram over all status rows.
pub fn status_counts_all(conn: &Connection) -> Result<Vec<(String, i64)>> {
    let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM moderation_status GROUP BY status")?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    let mut counts = Vec::new();
    for row in rows {
        counts.push(row?);
    }
    Ok(counts)
}

/// Flag types in use across the whole store.
pub fn distinct_flag_types(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT DISTINCT flag_type FROM content_flags ORDER BY flag_type")?;
    let rows = stmt.query_map([], |row| row.get(0))?;
    let mut types = Vec::new();
    for row in rows {
        types.push(row?);
    }
    Ok(types)
}
