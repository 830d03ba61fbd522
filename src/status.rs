// System status display — shows DB stats, moderation queue, model age.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

use crate::db::Database;

/// Display system status to the terminal.
pub async fn show(db: &Arc<dyn Database>, db_display_path: &str, model_path: &Path) -> Result<()> {
    if !Path::new(db_display_path).exists() {
        println!("Database: not initialized");
        println!("\nRun `sieve init` to set up the database.");
        return Ok(());
    }

    // Database file size
    let file_size = std::fs::metadata(db_display_path)
        .map(|m| format_bytes(m.len()))
        .unwrap_or_else(|_| "unknown".to_string());
    println!("Database: {} ({})", db_display_path, file_size);

    // Content and queue
    let total = db.content_count().await?;
    println!("Content items: {total}");

    let counts = db.status_counts_all().await?;
    if counts.is_empty() {
        println!("Moderation queue: empty");
    } else {
        let line: Vec<String> = counts
            .iter()
            .map(|(status, count)| format!("{count} {status}"))
            .collect();
        println!("Moderation queue: {}", line.join(", "));
    }

    // Flag types in use
    let flag_types = db.distinct_flag_types().await?;
    if !flag_types.is_empty() {
        println!("Flag types in use: {}", flag_types.join(", "));
    }

    // Model artifact
    if model_path.exists() {
        let modified = std::fs::metadata(model_path)
            .ok()
            .and_then(|m| m.modified().ok())
            .map(|t| chrono::DateTime::<chrono::Utc>::from(t).to_rfc3339())
            .unwrap_or_else(|| "unknown".to_string());
        println!("Model artifact: {} (modified {})", model_path.display(), modified);
    } else {
        println!("Model artifact: not trained yet");
        println!("  Run `sieve train <dataset.csv>` to fit one");
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
