// Model artifact — versioned serialization of the full engine state.
//
// One JSON blob holds the category list, every category's vectorizer state
// (vocabulary + IDF) and classifier state (coefficients + bias), and the
// threshold table. The schema id is checked on load: an artifact written by
// an incompatible version is rejected rather than silently corrupting the
// engine.
//
// Saves go through a temp file and rename, so a reader never observes a
// half-written artifact.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::ModerationError;

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub schema_version: u32,
    pub categories: Vec<String>,
    /// Per-category model state, keyed by category label. Categories without
    /// a trained model are absent.
    pub models: BTreeMap<String, CategoryArtifact>,
    pub thresholds: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryArtifact {
    /// Vocabulary in index order.
    pub terms: Vec<String>,
    pub idf: Vec<f64>,
    pub weights: Vec<f64>,
    pub bias: f64,
}

/// Write the artifact atomically: serialize to a sibling temp file, then
/// rename over the target.
pub fn save(artifact: &ModelArtifact, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create model directory: {}", parent.display())
            })?;
        }
    }

    let json = serde_json::to_vec(artifact).context("Failed to serialize model artifact")?;

    let tmp = path.with_extension("tmp");
    fs::write(&tmp, &json)
        .with_context(|| format!("Failed to write model artifact to {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("Failed to move model artifact into {}", path.display()))?;

    Ok(())
}

/// Load and version-check an artifact.
pub fn load(path: &Path) -> Result<ModelArtifact> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read model artifact at {}", path.display()))?;
    let artifact: ModelArtifact =
        serde_json::from_str(&json).context("Failed to parse model artifact")?;

    if artifact.schema_version != SCHEMA_VERSION {
        return Err(ModerationError::ArtifactSchemaVersion {
            expected: SCHEMA_VERSION,
            found: artifact.schema_version,
        }
        .into());
    }

    Ok(artifact)
}
