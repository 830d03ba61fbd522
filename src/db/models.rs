// Data models — Rust structs that map to database rows.
//
// These are the types that flow through the application. They're separate
// from the database queries so other modules can use them without depending
// on rusqlite directly.

use serde::{Deserialize, Serialize};

/// What kind of payload a submission carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentKind {
    Text,
    Image,
    Video,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Text => "text",
            ContentKind::Image => "image",
            ContentKind::Video => "video",
        }
    }

    /// Parse a content-type label. Unknown labels fall back to text,
    /// which is also how unknown types get classified.
    pub fn parse_or_text(s: &str) -> Self {
        match s {
            "image" => ContentKind::Image,
            "video" => ContentKind::Video,
            _ => ContentKind::Text,
        }
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The moderation verdict for a content item.
///
/// Automated ingest decides via `from_overall_score`; human review may set
/// Approved or Rejected unconditionally. Every change is paired with a
/// ModerationAction row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Disposition {
    Pending,
    Approved,
    Rejected,
}

impl Disposition {
    /// Automated disposition policy: reject above 0.8, approve below 0.3,
    /// hold for review in between. Both bounds are strict.
    pub fn from_overall_score(score: f64) -> Self {
        if score > 0.8 {
            Disposition::Rejected
        } else if score < 0.3 {
            Disposition::Approved
        } else {
            Disposition::Pending
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Pending => "pending",
            Disposition::Approved => "approved",
            Disposition::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Disposition::Pending),
            "approved" => Some(Disposition::Approved),
            "rejected" => Some(Disposition::Rejected),
            _ => None,
        }
    }
}

impl std::fmt::Display for Disposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The kind of audit-log entry a ModerationAction records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    AutomatedPending,
    AutomatedApproved,
    AutomatedRejected,
    Approved,
    Rejected,
    Escalate,
}

impl ActionKind {
    /// The automated action matching an ingest disposition.
    pub fn automated(disposition: Disposition) -> Self {
        match disposition {
            Disposition::Pending => ActionKind::AutomatedPending,
            Disposition::Approved => ActionKind::AutomatedApproved,
            Disposition::Rejected => ActionKind::AutomatedRejected,
        }
    }

    /// The human action matching an override decision. Pending is not a
    /// valid human decision.
    pub fn human(disposition: Disposition) -> Option<Self> {
        match disposition {
            Disposition::Approved => Some(ActionKind::Approved),
            Disposition::Rejected => Some(ActionKind::Rejected),
            Disposition::Pending => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::AutomatedPending => "automated_pending",
            ActionKind::AutomatedApproved => "automated_approved",
            ActionKind::AutomatedRejected => "automated_rejected",
            ActionKind::Approved => "approved",
            ActionKind::Rejected => "rejected",
            ActionKind::Escalate => "escalate",
        }
    }
}

/// A submitted content item. Immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: i64,
    pub user_id: Option<i64>,
    pub kind: ContentKind,
    /// Truncated display text (capped at 1000 characters).
    pub content_text: String,
    /// Full original payload, or a reference string for large media.
    pub original_content: String,
    pub metadata: Option<serde_json::Value>,
    pub created_at: String,
}

/// One-to-one moderation state for a content item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationStatus {
    pub id: i64,
    pub content_id: i64,
    pub disposition: Disposition,
    /// The maximum per-category score observed at classification time.
    pub moderation_score: Option<f64>,
    pub is_automated: bool,
    /// Wall-clock processing latency in seconds.
    pub processing_time: Option<f64>,
    pub last_updated: String,
}

/// A per-category flag recorded when a score exceeds the reporting threshold.
/// Created at classification time, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentFlag {
    pub id: i64,
    pub content_id: i64,
    pub flag_type: String,
    pub flag_score: f64,
    /// Structured explanation payload.
    pub flag_details: Option<serde_json::Value>,
    pub created_at: String,
}

/// Append-only audit-log entry. A null user_id means the action was automated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationAction {
    pub id: i64,
    pub content_id: i64,
    pub user_id: Option<i64>,
    pub action_type: String,
    pub action_notes: Option<String>,
    /// The disposition immediately before this action.
    pub previous_status: Option<Disposition>,
    pub created_at: String,
}

/// Named string-valued configuration, independently mutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationSetting {
    pub name: String,
    pub value: String,
    pub description: Option<String>,
    pub updated_at: String,
}

/// One aggregate record per (date, metric type) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationMetric {
    pub id: i64,
    /// ISO date, e.g. "2026-08-06".
    pub metric_date: String,
    pub metric_type: String,
    pub metric_value: serde_json::Value,
    pub created_at: String,
}

/// Everything the processing pipeline persists for one submission,
/// written as a single transaction.
#[derive(Debug, Clone)]
pub struct NewProcessedContent {
    pub user_id: Option<i64>,
    pub kind: ContentKind,
    pub content_text: String,
    pub original_content: String,
    pub metadata: Option<serde_json::Value>,
    pub disposition: Disposition,
    pub moderation_score: f64,
    pub processing_time: f64,
    pub flags: Vec<NewFlag>,
    pub action_notes: String,
}

/// A flag to be created alongside a new content row.
#[derive(Debug, Clone)]
pub struct NewFlag {
    pub flag_type: String,
    pub flag_score: f64,
    pub flag_details: serde_json::Value,
}

/// The persisted result of one process() call.
#[derive(Debug, Clone)]
pub struct ProcessedContent {
    pub content: ContentItem,
    pub status: ModerationStatus,
    pub flags: Vec<ContentFlag>,
    pub action: ModerationAction,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disposition_rejects_above_threshold() {
        assert_eq!(Disposition::from_overall_score(0.85), Disposition::Rejected);
    }

    #[test]
    fn disposition_approves_below_threshold() {
        assert_eq!(Disposition::from_overall_score(0.1), Disposition::Approved);
    }

    #[test]
    fn disposition_pending_in_between() {
        assert_eq!(Disposition::from_overall_score(0.5), Disposition::Pending);
    }

    #[test]
    fn disposition_boundaries_are_strict() {
        // Exactly 0.8 is not rejected; exactly 0.3 is not approved.
        assert_eq!(Disposition::from_overall_score(0.8), Disposition::Pending);
        assert_eq!(Disposition::from_overall_score(0.3), Disposition::Pending);
    }

    #[test]
    fn disposition_nan_holds_for_review() {
        assert_eq!(Disposition::from_overall_score(f64::NAN), Disposition::Pending);
    }

    #[test]
    fn disposition_parse_round_trip() {
        for d in [Disposition::Pending, Disposition::Approved, Disposition::Rejected] {
            assert_eq!(Disposition::parse(d.as_str()), Some(d));
        }
        assert_eq!(Disposition::parse("escalated"), None);
    }

    #[test]
    fn action_kind_for_automated_decisions() {
        assert_eq!(
            ActionKind::automated(Disposition::Rejected).as_str(),
            "automated_rejected"
        );
        assert_eq!(
            ActionKind::automated(Disposition::Pending).as_str(),
            "automated_pending"
        );
    }

    #[test]
    fn action_kind_human_rejects_pending() {
        assert!(ActionKind::human(Disposition::Pending).is_none());
        assert_eq!(
            ActionKind::human(Disposition::Approved).map(|a| a.as_str()),
            Some("approved")
        );
    }

    #[test]
    fn content_kind_unknown_falls_back_to_text() {
        assert_eq!(ContentKind::parse_or_text("audio"), ContentKind::Text);
        assert_eq!(ContentKind::parse_or_text("image"), ContentKind::Image);
    }
}
