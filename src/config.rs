use std::env;
use std::path::PathBuf;

use anyhow::Result;

/// Central configuration loaded from environment variables.
///
/// Everything has a sensible default so `sieve init` works out of the box.
/// The .env file is loaded automatically at startup via dotenvy.
pub struct Config {
    pub db_path: String,
    /// Where the serialized classifier artifact lives.
    pub model_path: PathBuf,
    /// Directory for generated sample datasets.
    pub data_dir: PathBuf,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        Ok(Self {
            db_path: env::var("SIEVE_DB_PATH").unwrap_or_else(|_| "./sieve.db".to_string()),
            model_path: env::var("SIEVE_MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_model_path()),
            data_dir: env::var("SIEVE_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data")),
        })
    }
}

/// Platform data directory, falling back to a repo-local path when the
/// platform has none (containers, CI).
pub fn default_model_path() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("sieve").join("model.json"))
        .unwrap_or_else(|| PathBuf::from("./models/model.json"))
}
