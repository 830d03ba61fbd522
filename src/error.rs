// Structured failure codes for the moderation pipeline.
//
// Application flow uses anyhow throughout; these variants ride inside
// anyhow::Error so API boundaries can downcast and map failures to the
// right response (validation vs not-found vs storage).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModerationError {
    /// The submission had no content to moderate.
    #[error("missing required content field")]
    MissingContent,

    /// The referenced content row does not exist.
    #[error("content not found: {0}")]
    ContentNotFound(i64),

    /// The content exists but has no moderation status row.
    #[error("moderation status not found for content: {0}")]
    StatusNotFound(i64),

    /// A human decision must be approved or rejected.
    #[error("invalid status: {0}")]
    InvalidStatus(String),

    /// A category label outside the closed category set.
    #[error("unsupported category: {0}")]
    UnsupportedCategory(String),

    /// The model artifact on disk was written by an incompatible version.
    #[error("model artifact schema version {found} is not supported (expected {expected})")]
    ArtifactSchemaVersion { expected: u32, found: u32 },
}
