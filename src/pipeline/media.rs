// Media placeholder scoring.
//
// There is no real image/video understanding here: scores derive from a
// fixed-key hash of the submission metadata, one salt per category, clamped
// to [0.05, 0.95]. The policy is deliberate and clearly labeled — every
// media score is tagged as a MediaStub fallback so nothing downstream can
// mistake it for model output. Swapping in a real model only requires
// replacing this module.

use std::hash::{DefaultHasher, Hash, Hasher};

use crate::classifier::{CategoryScore, FallbackReason};
use crate::db::models::ContentKind;

/// Categories scored for still images.
const IMAGE_CATEGORIES: [&str; 5] = [
    "violence",
    "adult_content",
    "graphic_violence",
    "sexual_content",
    "hate_symbols",
];

/// Categories scored for videos.
const VIDEO_CATEGORIES: [&str; 6] = [
    "violence",
    "adult_content",
    "graphic_violence",
    "sexual_content",
    "dangerous_activity",
    "hate_speech",
];

/// Deterministic pseudo-scores for a media submission. The same metadata
/// always produces the same scores.
pub fn stub_scores(
    kind: ContentKind,
    metadata: Option<&serde_json::Value>,
) -> Vec<(String, CategoryScore)> {
    let categories: &[&str] = match kind {
        ContentKind::Image => &IMAGE_CATEGORIES,
        ContentKind::Video => &VIDEO_CATEGORIES,
        // Text never reaches the stub; score nothing rather than lie.
        ContentKind::Text => &[],
    };

    let meta_key = metadata
        .map(|v| v.to_string())
        .unwrap_or_else(|| "null".to_string());

    categories
        .iter()
        .map(|&category| {
            let raw = seeded_hash(&meta_key, category) % 100;
            let score = (raw as f64 / 100.0).clamp(0.05, 0.95);
            (
                category.to_string(),
                CategoryScore::Fallback {
                    score,
                    reason: FallbackReason::MediaStub,
                },
            )
        })
        .collect()
}

/// DefaultHasher::new() uses fixed keys, so this is stable across runs.
fn seeded_hash(meta_key: &str, salt: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    meta_key.hash(&mut hasher);
    salt.hash(&mut hasher);
    hasher.finish()
}
