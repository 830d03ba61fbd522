// Training and evaluation subsystem — builds and scores per-category
// models from labeled datasets.

pub mod dataset;
pub mod trainer;

pub use trainer::{ModelInfo, Trainer, TrainingReport};
