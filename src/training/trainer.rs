// Model training and evaluation.
//
// For each category in the dataset: stratified train/test split (seeded,
// reproducible), fit through the classification engine, then evaluate on
// the held-out split at that category's configured threshold. Once every
// category is trained the whole engine is persisted and swapped into the
// live handle atomically.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use tracing::info;

use crate::classifier::explain::TermWeight;
use crate::classifier::{Category, Classifier, ClassifierHandle};
use crate::preprocess;
use crate::training::dataset::LabeledRow;

/// Held-out evaluation results for one category.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryReport {
    pub train_size: usize,
    pub test_size: usize,
    pub train_accuracy: f64,
    pub test_accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub model_path: PathBuf,
    pub results: BTreeMap<String, CategoryReport>,
}

/// Current model artifact metadata for operator surfaces.
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub exists: bool,
    pub path: PathBuf,
    pub last_modified: Option<String>,
    pub categories: Vec<String>,
    pub thresholds: BTreeMap<String, f64>,
}

/// Non-persisting classification of one text, for operator spot checks.
#[derive(Debug, Clone, Serialize)]
pub struct TextEvaluation {
    pub category: String,
    pub score: f64,
    pub origin: &'static str,
    pub explanation: Vec<TermWeight>,
}

pub struct Trainer {
    handle: Arc<ClassifierHandle>,
    model_path: PathBuf,
}

impl Trainer {
    pub fn new(handle: Arc<ClassifierHandle>, model_path: PathBuf) -> Self {
        Self { handle, model_path }
    }

    /// Train from a CSV file (long or wide shape, see dataset::load_csv).
    pub fn train_from_file(
        &self,
        path: &Path,
        test_fraction: f64,
        seed: u64,
    ) -> Result<TrainingReport> {
        let rows = super::dataset::load_csv(path)?;
        self.train_from_rows(rows, test_fraction, seed)
    }

    /// Train every category present in the rows, evaluate each on its
    /// held-out split, persist the engine, and publish it to the handle.
    pub fn train_from_rows(
        &self,
        rows: Vec<LabeledRow>,
        test_fraction: f64,
        seed: u64,
    ) -> Result<TrainingReport> {
        if rows.is_empty() {
            bail!("training dataset is empty");
        }
        if !(0.0..1.0).contains(&test_fraction) {
            bail!("test fraction must be in [0, 1), got {test_fraction}");
        }

        // Group by category, normalizing text so the feature space matches
        // what process() feeds the engine.
        let mut groups: BTreeMap<Category, Vec<(String, u8)>> = BTreeMap::new();
        for row in rows {
            groups
                .entry(row.category)
                .or_default()
                .push((preprocess::normalize(&row.text), row.label));
        }

        let mut classifier = Classifier::new();
        let mut results = BTreeMap::new();

        let pb = ProgressBar::new(groups.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  Training [{bar:30}] {pos}/{len} {msg}")
                .unwrap(),
        );

        for (category, samples) in groups {
            pb.set_message(category.as_str().to_string());

            let (train, test) = stratified_split(samples, test_fraction, seed);
            let (train_texts, train_labels): (Vec<String>, Vec<u8>) = train.into_iter().unzip();

            let train_accuracy = classifier.train(category, &train_texts, &train_labels);
            let eval = evaluate(&classifier, category, &test);

            results.insert(
                category.as_str().to_string(),
                CategoryReport {
                    train_size: train_texts.len(),
                    test_size: test.len(),
                    train_accuracy,
                    test_accuracy: eval.accuracy,
                    precision: eval.precision,
                    recall: eval.recall,
                    f1: eval.f1,
                },
            );
            pb.inc(1);
        }
        pb.finish_and_clear();

        classifier
            .save(&self.model_path)
            .with_context(|| format!("Failed to save model to {}", self.model_path.display()))?;
        self.handle.swap(classifier);

        info!(
            categories = results.len(),
            path = %self.model_path.display(),
            "Training complete, model published"
        );

        Ok(TrainingReport {
            model_path: self.model_path.clone(),
            results,
        })
    }

    /// Metadata about the artifact and the live engine.
    pub fn model_info(&self) -> ModelInfo {
        let exists = self.model_path.exists();
        let last_modified = std::fs::metadata(&self.model_path)
            .ok()
            .and_then(|m| m.modified().ok())
            .map(|t| chrono::DateTime::<chrono::Utc>::from(t).to_rfc3339());

        let engine = self.handle.current();
        ModelInfo {
            exists,
            path: self.model_path.clone(),
            last_modified,
            categories: engine
                .trained_categories()
                .iter()
                .map(|c| c.as_str().to_string())
                .collect(),
            thresholds: engine.thresholds().clone(),
        }
    }

    /// Classify and explain one text without persisting anything.
    pub fn evaluate_text(&self, text: &str) -> Vec<TextEvaluation> {
        let normalized = preprocess::normalize(text);
        let engine = self.handle.current();
        engine
            .classify(&normalized)
            .into_iter()
            .map(|(category, score)| TextEvaluation {
                category: category.as_str().to_string(),
                score: score.value(),
                origin: score.origin(),
                explanation: engine.explain(&normalized, category.as_str()),
            })
            .collect()
    }
}

/// Split samples into train/test, stratified by label so both splits keep
/// the class balance. Same seed, same split.
fn stratified_split(
    samples: Vec<(String, u8)>,
    test_fraction: f64,
    seed: u64,
) -> (Vec<(String, u8)>, Vec<(String, u8)>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();

    // Iterate strata in label order so the split is deterministic.
    for target in [0u8, 1u8] {
        let mut stratum: Vec<(String, u8)> = samples
            .iter()
            .filter(|(_, label)| *label == target)
            .cloned()
            .collect();
        stratum.shuffle(&mut rng);

        let n_test = (stratum.len() as f64 * test_fraction).round() as usize;
        let split_at = stratum.len() - n_test.min(stratum.len());
        test.extend(stratum.split_off(split_at));
        train.extend(stratum);
    }

    (train, test)
}

struct EvalMetrics {
    accuracy: f64,
    precision: f64,
    recall: f64,
    f1: f64,
}

/// Confusion-count evaluation at the category's configured threshold. All
/// ratios resolve to 0 when their denominator is 0 — never a division error.
fn evaluate(classifier: &Classifier, category: Category, test: &[(String, u8)]) -> EvalMetrics {
    if test.is_empty() {
        return EvalMetrics {
            accuracy: 0.0,
            precision: 0.0,
            recall: 0.0,
            f1: 0.0,
        };
    }

    let threshold = classifier.threshold(category.as_str());
    let mut tp = 0usize;
    let mut fp = 0usize;
    let mut fn_ = 0usize;
    let mut correct = 0usize;

    for (text, label) in test {
        let score = classifier.classify(text)[&category].value();
        let predicted = u8::from(score >= threshold);
        if predicted == *label {
            correct += 1;
        }
        match (predicted, *label) {
            (1, 1) => tp += 1,
            (1, 0) => fp += 1,
            (0, 1) => fn_ += 1,
            _ => {}
        }
    }

    let accuracy = correct as f64 / test.len() as f64;
    let precision = ratio(tp as f64, (tp + fp) as f64);
    let recall = ratio(tp as f64, (tp + fn_) as f64);
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    EvalMetrics {
        accuracy,
        precision,
        recall,
        f1,
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stratified_split_is_reproducible() {
        let samples: Vec<(String, u8)> = (0..20)
            .map(|i| (format!("sample {i}"), u8::from(i % 2 == 0)))
            .collect();
        let (train_a, test_a) = stratified_split(samples.clone(), 0.25, 42);
        let (train_b, test_b) = stratified_split(samples, 0.25, 42);
        assert_eq!(train_a, train_b);
        assert_eq!(test_a, test_b);
    }

    #[test]
    fn test_stratified_split_keeps_class_balance() {
        let samples: Vec<(String, u8)> = (0..40)
            .map(|i| (format!("sample {i}"), u8::from(i < 20)))
            .collect();
        let (train, test) = stratified_split(samples, 0.25, 1);
        assert_eq!(test.len(), 10);
        assert_eq!(train.len(), 30);
        // Both labels show up in both splits
        assert_eq!(test.iter().filter(|(_, l)| *l == 1).count(), 5);
        assert_eq!(train.iter().filter(|(_, l)| *l == 1).count(), 15);
    }

    #[test]
    fn test_stratified_split_zero_fraction() {
        let samples: Vec<(String, u8)> =
            (0..10).map(|i| (format!("s{i}"), u8::from(i % 2 == 0))).collect();
        let (train, test) = stratified_split(samples, 0.0, 3);
        assert_eq!(train.len(), 10);
        assert!(test.is_empty());
    }

    #[test]
    fn test_evaluate_empty_test_set_is_zero() {
        let classifier = Classifier::new();
        let metrics = evaluate(&classifier, Category::Violence, &[]);
        assert_eq!(metrics.accuracy, 0.0);
        assert_eq!(metrics.f1, 0.0);
    }

    #[test]
    fn test_ratio_zero_denominator() {
        assert_eq!(ratio(5.0, 0.0), 0.0);
    }
}
