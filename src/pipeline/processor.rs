// Content processor — orchestrates preprocessing, classification, and
// persistence for one submission.
//
// process() is all-or-nothing: the content row, its status, its flags, and
// the automated audit action commit in a single transaction. On any failure
// the caller sees "no record created", never a partial record.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::classifier::{CategoryScore, Classifier, ClassifierHandle};
use crate::db::models::{
    ActionKind, ContentFlag, ContentItem, ContentKind, Disposition, ModerationStatus, NewFlag,
    NewProcessedContent, ProcessedContent,
};
use crate::db::Database;
use crate::error::ModerationError;
use crate::pipeline::media;
use crate::preprocess;

/// Cap on the persisted display text.
pub const DISPLAY_TEXT_LIMIT: usize = 1000;

/// Minimum score for a category to produce a persisted flag.
pub const FLAG_THRESHOLD: f64 = 0.3;

/// One item of a batch moderation request. `content` is optional so a batch
/// can carry malformed items without failing to parse — items missing it
/// are skipped, not fatal.
#[derive(Debug, Clone, Deserialize)]
pub struct ModerateRequest {
    pub content: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// A content item with its moderation state, for review surfaces.
#[derive(Debug, Clone)]
pub struct ContentView {
    pub content: ContentItem,
    pub status: Option<ModerationStatus>,
    pub flags: Vec<ContentFlag>,
}

pub struct ContentProcessor {
    db: Arc<dyn Database>,
    classifier: Arc<ClassifierHandle>,
}

impl ContentProcessor {
    pub fn new(db: Arc<dyn Database>, classifier: Arc<ClassifierHandle>) -> Self {
        Self { db, classifier }
    }

    /// Run one submission through the moderation pipeline and persist the
    /// result.
    pub async fn process(
        &self,
        content: &str,
        kind: ContentKind,
        user_id: Option<i64>,
        metadata: Option<serde_json::Value>,
    ) -> Result<ProcessedContent> {
        if content.is_empty() {
            return Err(ModerationError::MissingContent.into());
        }

        let started = Instant::now();
        let engine = self.classifier.current();

        let filename = metadata
            .as_ref()
            .and_then(|m| m.get("filename"))
            .and_then(|v| v.as_str())
            .map(str::to_string);

        // Large media payloads are never retained: store a reference string
        // instead of the raw data.
        let original_content = if kind != ContentKind::Text
            && content.chars().count() > DISPLAY_TEXT_LIMIT
        {
            match &filename {
                Some(name) => format!("[{} content] - {}", kind.as_str().to_uppercase(), name),
                None => format!("[{} content]", kind.as_str().to_uppercase()),
            }
        } else {
            content.to_string()
        };

        // What the engine actually sees: normalized text, or a placeholder
        // description for media.
        let classify_input = match kind {
            ContentKind::Text => preprocess::normalize(content),
            ContentKind::Image | ContentKind::Video => match &filename {
                Some(name) => format!("analyzing {} content: {}", kind.as_str(), name),
                None => format!("analyzing {} content", kind.as_str()),
            },
        };

        let scores: Vec<(String, CategoryScore)> = match kind {
            ContentKind::Text => engine
                .classify(&classify_input)
                .into_iter()
                .map(|(category, score)| (category.as_str().to_string(), score))
                .collect(),
            ContentKind::Image | ContentKind::Video => {
                media::stub_scores(kind, metadata.as_ref())
            }
        };

        // A single strong signal must not be diluted: the overall score is
        // the maximum, not the average.
        let overall = scores
            .iter()
            .map(|(_, score)| score.value())
            .fold(0.0, f64::max);

        let disposition = Disposition::from_overall_score(overall);
        let flags = build_flags(&engine, &classify_input, &scores);

        let new = NewProcessedContent {
            user_id,
            kind,
            content_text: clamp_chars(content, DISPLAY_TEXT_LIMIT),
            original_content,
            metadata,
            disposition,
            moderation_score: overall,
            processing_time: started.elapsed().as_secs_f64(),
            flags,
            action_notes: format!("Automated {} with score {:.2}", disposition, overall),
        };

        let record = self
            .db
            .insert_processed(new)
            .await
            .context("Failed to persist moderation result")?;

        info!(
            content_id = record.content.id,
            status = %record.status.disposition,
            score = format!("{overall:.2}"),
            flags = record.flags.len(),
            "Processed content"
        );

        Ok(record)
    }

    /// Process a batch of items independently. A failed item is logged and
    /// omitted from the results; it never aborts the rest of the batch.
    pub async fn batch_process(&self, items: Vec<ModerateRequest>) -> Vec<ProcessedContent> {
        let mut results = Vec::new();

        for (i, item) in items.into_iter().enumerate() {
            let Some(content) = item.content else {
                warn!(item = i, "Skipping batch item without content");
                continue;
            };
            let kind = item
                .content_type
                .as_deref()
                .map(ContentKind::parse_or_text)
                .unwrap_or(ContentKind::Text);

            match self.process(&content, kind, item.user_id, item.metadata).await {
                Ok(record) => results.push(record),
                Err(e) => {
                    warn!(item = i, error = %e, "Batch item failed, continuing");
                }
            }
        }

        results
    }

    /// Apply a human decision. The only path for human override: overwrites
    /// the disposition, clears the automated flag, and appends one audit
    /// action — re-applying the same status still appends a new action.
    pub async fn update_status(
        &self,
        content_id: i64,
        new_status: Disposition,
        user_id: Option<i64>,
        notes: Option<String>,
    ) -> Result<ModerationStatus> {
        let action = ActionKind::human(new_status)
            .ok_or_else(|| ModerationError::InvalidStatus(new_status.to_string()))?;

        let updated = self
            .db
            .update_status_with_action(content_id, new_status, action, user_id, notes)
            .await?;

        info!(
            content_id,
            status = %updated.disposition,
            user_id,
            "Moderation status updated"
        );
        Ok(updated)
    }

    /// Apply the same decision to many items, continuing past per-item
    /// failures. Returns the number of items updated.
    pub async fn batch_update_status(
        &self,
        content_ids: &[i64],
        new_status: Disposition,
        user_id: Option<i64>,
        notes: Option<String>,
    ) -> usize {
        let mut updated = 0;
        for &content_id in content_ids {
            match self
                .update_status(content_id, new_status, user_id, notes.clone())
                .await
            {
                Ok(_) => updated += 1,
                Err(e) => {
                    warn!(content_id, error = %e, "Batch status update failed, continuing");
                }
            }
        }
        updated
    }

    /// Load a content item with its status and flags for review.
    pub async fn get_content(&self, content_id: i64) -> Result<ContentView> {
        let content = self
            .db
            .get_content(content_id)
            .await?
            .ok_or(ModerationError::ContentNotFound(content_id))?;
        let status = self.db.get_status(content_id).await?;
        let flags = self.db.get_flags(content_id).await?;
        Ok(ContentView {
            content,
            status,
            flags,
        })
    }
}

/// One flag per category whose score clears the reporting threshold
/// (strictly), each carrying its explanation payload and score provenance.
fn build_flags(
    engine: &Classifier,
    classify_input: &str,
    scores: &[(String, CategoryScore)],
) -> Vec<NewFlag> {
    scores
        .iter()
        .filter(|(_, score)| score.value() > FLAG_THRESHOLD)
        .map(|(label, score)| {
            let explanation = engine.explain(classify_input, label);
            NewFlag {
                flag_type: label.clone(),
                flag_score: score.value(),
                flag_details: json!({
                    "explanation": explanation,
                    "score_origin": score.origin(),
                }),
            }
        })
        .collect()
}

/// Hard cap at a character boundary, no ellipsis — this is the persisted
/// display field, not terminal output.
fn clamp_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_chars_short_text_unchanged() {
        assert_eq!(clamp_chars("hello", 10), "hello");
    }

    #[test]
    fn test_clamp_chars_cuts_at_char_boundary() {
        // Multi-byte characters must not panic or split
        let text = "héllo wörld".repeat(200);
        let clamped = clamp_chars(&text, 1000);
        assert_eq!(clamped.chars().count(), 1000);
    }

    #[test]
    fn test_flag_threshold_is_strict() {
        let engine = Classifier::new();
        let scores = vec![
            ("violence".to_string(), CategoryScore::Trained(0.29)),
            ("profanity".to_string(), CategoryScore::Trained(0.31)),
            ("harassment".to_string(), CategoryScore::Trained(0.30)),
        ];
        let flags = build_flags(&engine, "some text", &scores);
        // 0.29 and exactly 0.30 produce no flag; 0.31 produces exactly one
        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].flag_type, "profanity");
        assert!((flags[0].flag_score - 0.31).abs() < f64::EPSILON);
    }

    #[test]
    fn test_flags_carry_explanation_payload() {
        let engine = Classifier::new();
        let scores = vec![("violence".to_string(), CategoryScore::Trained(0.9))];
        let flags = build_flags(&engine, "i will kill you", &scores);
        assert_eq!(flags.len(), 1);
        let details = &flags[0].flag_details;
        assert!(details["explanation"].is_array());
        assert_eq!(details["score_origin"], "trained");
    }
}
