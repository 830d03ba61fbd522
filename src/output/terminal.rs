// Colored terminal output for moderation results, metrics, and reports.
//
// This module handles all terminal-specific formatting: colors, tables,
// summaries. The main.rs display paths delegate here.

use std::collections::BTreeMap;

use colored::{ColoredString, Colorize};

use crate::db::models::{ModerationAction, ModerationSetting, ProcessedContent};
use crate::metrics::MetricPoint;
use crate::pipeline::ContentView;
use crate::training::trainer::{ModelInfo, TextEvaluation};
use crate::training::TrainingReport;

use super::truncate_chars;

fn colorize_status(status: &str) -> ColoredString {
    match status {
        "approved" => status.green(),
        "rejected" => status.red().bold(),
        "pending" => status.yellow(),
        other => other.normal(),
    }
}

/// Display the result of one moderation call.
pub fn display_moderation_result(record: &ProcessedContent) {
    println!(
        "\n{} content #{}",
        "Moderated".bold(),
        record.content.id
    );
    println!(
        "  Status: {}  Score: {:.2}  ({:.0} ms)",
        colorize_status(record.status.disposition.as_str()),
        record.status.moderation_score.unwrap_or(0.0),
        record.status.processing_time.unwrap_or(0.0) * 1000.0,
    );

    if record.flags.is_empty() {
        println!("  Flags: none");
    } else {
        println!("  Flags:");
        for flag in &record.flags {
            println!("    {:<18} {:.2}", flag.flag_type, flag.flag_score);
        }
    }
}

/// Display a batch summary: per-item one-liners plus a count.
pub fn display_batch_summary(results: &[ProcessedContent], submitted: usize) {
    println!(
        "\n{}",
        format!("=== Batch: {}/{} processed ===", results.len(), submitted).bold()
    );
    for record in results {
        println!(
            "  #{:<5} {:<10} {:.2}  {}",
            record.content.id,
            colorize_status(record.status.disposition.as_str()),
            record.status.moderation_score.unwrap_or(0.0),
            truncate_chars(&record.content.content_text, 48).dimmed(),
        );
    }
    if results.len() < submitted {
        println!(
            "  {} {} item(s) skipped or failed",
            "!".yellow(),
            submitted - results.len()
        );
    }
}

/// Display one content item with its moderation state and audit trail.
pub fn display_content_detail(view: &ContentView, actions: &[ModerationAction]) {
    println!("\n{} #{}", "Content".bold(), view.content.id);
    println!("  Type: {}  Submitted: {}", view.content.kind, view.content.created_at);
    if let Some(user_id) = view.content.user_id {
        println!("  User: {user_id}");
    }
    println!("  Text: {}", truncate_chars(&view.content.content_text, 120));

    match &view.status {
        Some(status) => {
            println!(
                "  Status: {} ({})  Score: {:.2}  Updated: {}",
                colorize_status(status.disposition.as_str()),
                if status.is_automated { "automated" } else { "manual" },
                status.moderation_score.unwrap_or(0.0),
                status.last_updated,
            );
        }
        None => println!("  Status: {}", "unknown".dimmed()),
    }

    if !view.flags.is_empty() {
        println!("  Flags:");
        for flag in &view.flags {
            println!("    {:<18} {:.2}", flag.flag_type, flag.flag_score);
            if let Some(terms) = flag
                .flag_details
                .as_ref()
                .and_then(|d| d.get("explanation"))
                .and_then(|e| e.as_array())
            {
                let top: Vec<String> = terms
                    .iter()
                    .take(3)
                    .filter_map(|t| t.get("term").and_then(|v| v.as_str()).map(str::to_string))
                    .collect();
                if !top.is_empty() {
                    println!("      {}", format!("terms: {}", top.join(", ")).dimmed());
                }
            }
        }
    }

    if !actions.is_empty() {
        println!("  History:");
        for action in actions {
            let prev = action
                .previous_status
                .map(|p| format!(" (was {p})"))
                .unwrap_or_default();
            println!(
                "    {} {}{}  {}",
                action.created_at.dimmed(),
                action.action_type,
                prev,
                action.action_notes.as_deref().unwrap_or("").dimmed(),
            );
        }
    }
}

/// Display metric series, most recent day last.
pub fn display_metrics(series: &BTreeMap<String, Vec<MetricPoint>>) {
    if series.is_empty() {
        println!("No metrics recorded yet. Run `sieve aggregate` first.");
        return;
    }

    for (metric_type, points) in series {
        println!("\n{}", format!("=== {metric_type} ===").bold());
        for point in points {
            println!("  {}  {}", point.date, render_value(&point.value));
        }
    }
}

fn render_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Object(map) => {
            if let Some(count) = map.get("count") {
                count.to_string()
            } else if map.is_empty() {
                "-".to_string()
            } else {
                map.iter()
                    .map(|(k, v)| format!("{k}:{v}"))
                    .collect::<Vec<_>>()
                    .join("  ")
            }
        }
        other => other.to_string(),
    }
}

/// Display the per-category training report.
pub fn display_training_report(report: &TrainingReport) {
    println!("\n{}", "=== Training Report ===".bold());
    println!(
        "  {:<16} {:>6} {:>6} {:>7} {:>7} {:>6} {:>6} {:>6}",
        "Category".dimmed(),
        "Train".dimmed(),
        "Test".dimmed(),
        "TrAcc".dimmed(),
        "TeAcc".dimmed(),
        "Prec".dimmed(),
        "Rec".dimmed(),
        "F1".dimmed(),
    );
    for (category, r) in &report.results {
        println!(
            "  {:<16} {:>6} {:>6} {:>7.3} {:>7.3} {:>6.3} {:>6.3} {:>6.3}",
            category,
            r.train_size,
            r.test_size,
            r.train_accuracy,
            r.test_accuracy,
            r.precision,
            r.recall,
            r.f1,
        );
    }
    println!("\n  Model saved to {}", report.model_path.display());
}

/// Display model artifact metadata.
pub fn display_model_info(info: &ModelInfo) {
    println!("\n{}", "=== Model ===".bold());
    if info.exists {
        println!("  Artifact: {}", info.path.display());
        if let Some(modified) = &info.last_modified {
            println!("  Last modified: {modified}");
        }
    } else {
        println!("  Artifact: {} ({})", info.path.display(), "not found".yellow());
    }
    if info.categories.is_empty() {
        println!("  Trained categories: none (classification uses fallback scores)");
    } else {
        println!("  Trained categories: {}", info.categories.join(", "));
    }
    println!("  Thresholds:");
    for (label, threshold) in &info.thresholds {
        println!("    {label:<16} {threshold:.2}");
    }
}

/// Display a non-persisting text evaluation.
pub fn display_evaluation(evaluations: &[TextEvaluation]) {
    println!("\n{}", "=== Evaluation ===".bold());
    for eval in evaluations {
        println!(
            "  {:<16} {:.2}  {}",
            eval.category,
            eval.score,
            eval.origin.dimmed()
        );
        let top: Vec<String> = eval
            .explanation
            .iter()
            .take(3)
            .map(|t| format!("{} ({:+.2})", t.term, t.weight))
            .collect();
        if !top.is_empty() {
            println!("      {}", top.join("  ").dimmed());
        }
    }
}

/// Display the settings table.
pub fn display_settings(settings: &[ModerationSetting]) {
    if settings.is_empty() {
        println!("No settings stored.");
        return;
    }
    for setting in settings {
        println!(
            "  {:<24} {}  {}",
            setting.name,
            setting.value,
            setting.description.as_deref().unwrap_or("").dimmed()
        );
    }
}
