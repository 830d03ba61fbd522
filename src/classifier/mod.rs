// Classification engine — per-category scoring with explainability.
//
// Each policy category owns an independent (vectorizer, classifier) pair.
// Untrained categories never block the pipeline: they fall back to a random
// score in (0.1, 0.9), tagged as such, so moderation always produces some
// score and callers can still tell genuine model output from placeholder
// output.

pub mod artifact;
pub mod explain;
pub mod linear;
pub mod vectorizer;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use anyhow::Result;
use rand::Rng;
use tracing::{error, info, warn};

use crate::error::ModerationError;

use artifact::{CategoryArtifact, ModelArtifact};
use explain::TermWeight;
use linear::LogisticModel;
use vectorizer::{TfidfVectorizer, DEFAULT_MAX_FEATURES};

/// The closed set of policy categories the text engine scores.
///
/// Media stub scoring may emit flag labels outside this set (e.g.
/// "hate_symbols"); those labels exist only as flags, never as trainable
/// categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Profanity,
    HateSpeech,
    Violence,
    SexualContent,
    Harassment,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Profanity,
        Category::HateSpeech,
        Category::Violence,
        Category::SexualContent,
        Category::Harassment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Profanity => "profanity",
            Category::HateSpeech => "hate_speech",
            Category::Violence => "violence",
            Category::SexualContent => "sexual_content",
            Category::Harassment => "harassment",
        }
    }

    /// Parse a category label, with an explicit unsupported-category error.
    pub fn parse(s: &str) -> Result<Self, ModerationError> {
        match s {
            "profanity" => Ok(Category::Profanity),
            "hate_speech" => Ok(Category::HateSpeech),
            "violence" => Ok(Category::Violence),
            "sexual_content" => Ok(Category::SexualContent),
            "harassment" => Ok(Category::Harassment),
            other => Err(ModerationError::UnsupportedCategory(other.to_string())),
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a score is a placeholder rather than model output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// No trained model exists for the category.
    Untrained,
    /// The score comes from the media placeholder policy, not a model.
    MediaStub,
}

/// A per-category score with its provenance. Callers and tests can always
/// distinguish genuine model output from placeholder output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CategoryScore {
    Trained(f64),
    Fallback { score: f64, reason: FallbackReason },
}

impl CategoryScore {
    pub fn value(&self) -> f64 {
        match self {
            CategoryScore::Trained(score) => *score,
            CategoryScore::Fallback { score, .. } => *score,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, CategoryScore::Fallback { .. })
    }

    pub fn origin(&self) -> &'static str {
        match self {
            CategoryScore::Trained(_) => "trained",
            CategoryScore::Fallback {
                reason: FallbackReason::Untrained,
                ..
            } => "fallback_untrained",
            CategoryScore::Fallback {
                reason: FallbackReason::MediaStub,
                ..
            } => "media_stub",
        }
    }
}

/// Default per-category thresholds plus the overall threshold. These gate
/// which flags get recorded, not the disposition decision.
const DEFAULT_THRESHOLDS: [(&str, f64); 6] = [
    ("profanity", 0.7),
    ("hate_speech", 0.65),
    ("violence", 0.7),
    ("sexual_content", 0.7),
    ("harassment", 0.65),
    ("overall", 0.6),
];

struct CategoryModel {
    vectorizer: TfidfVectorizer,
    model: LogisticModel,
}

/// The classification engine: one independent model slot per category plus
/// the threshold table.
pub struct Classifier {
    models: [Option<CategoryModel>; Category::ALL.len()],
    thresholds: BTreeMap<String, f64>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier {
    /// An untrained engine with default thresholds. Every classification
    /// falls back to random scores until a model is trained or loaded.
    pub fn new() -> Self {
        Self {
            models: std::array::from_fn(|_| None),
            thresholds: DEFAULT_THRESHOLDS
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
        }
    }

    /// Load the engine from an artifact path, falling back to an untrained
    /// engine on any failure. Load failure must never crash the caller.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            info!(path = %path.display(), "No model artifact found, starting untrained");
            return Self::new();
        }
        match artifact::load(path).and_then(Self::from_artifact) {
            Ok(classifier) => {
                info!(
                    path = %path.display(),
                    categories = classifier.trained_categories().len(),
                    "Loaded model artifact"
                );
                classifier
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to load model artifact, starting untrained");
                Self::new()
            }
        }
    }

    /// Rebuild an engine from a deserialized artifact. Unknown category
    /// labels in the artifact are skipped with a warning.
    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self> {
        let mut classifier = Self::new();
        if !artifact.thresholds.is_empty() {
            classifier.thresholds = artifact.thresholds;
        }

        for (label, state) in artifact.models {
            let category = match Category::parse(&label) {
                Ok(c) => c,
                Err(_) => {
                    warn!(category = label, "Skipping unknown category in model artifact");
                    continue;
                }
            };
            let vectorizer = TfidfVectorizer::from_parts(state.terms, state.idf)?;
            classifier.models[category as usize] = Some(CategoryModel {
                vectorizer,
                model: LogisticModel {
                    weights: state.weights,
                    bias: state.bias,
                },
            });
        }
        Ok(classifier)
    }

    /// Snapshot the full engine state into a serializable artifact.
    pub fn to_artifact(&self) -> ModelArtifact {
        let mut models = BTreeMap::new();
        for category in Category::ALL {
            if let Some(cm) = &self.models[category as usize] {
                models.insert(
                    category.as_str().to_string(),
                    CategoryArtifact {
                        terms: cm.vectorizer.terms().to_vec(),
                        idf: cm.vectorizer.idf().to_vec(),
                        weights: cm.model.weights.clone(),
                        bias: cm.model.bias,
                    },
                );
            }
        }
        ModelArtifact {
            schema_version: artifact::SCHEMA_VERSION,
            categories: Category::ALL.iter().map(|c| c.as_str().to_string()).collect(),
            models,
            thresholds: self.thresholds.clone(),
        }
    }

    /// Persist the engine as one atomic artifact.
    pub fn save(&self, path: &Path) -> Result<()> {
        artifact::save(&self.to_artifact(), path)
    }

    /// Fit one category's vectorizer and classifier. Returns training-set
    /// accuracy, or 0.0 if the fit fails — the failure is logged, not
    /// propagated, so a batch run over many categories keeps going.
    pub fn train(&mut self, category: Category, texts: &[String], labels: &[u8]) -> f64 {
        match fit_category(texts, labels) {
            Ok((cm, accuracy)) => {
                self.models[category as usize] = Some(cm);
                info!(
                    category = category.as_str(),
                    samples = texts.len(),
                    accuracy = format!("{accuracy:.3}"),
                    "Trained category model"
                );
                accuracy
            }
            Err(e) => {
                error!(category = category.as_str(), error = %e, "Training failed");
                0.0
            }
        }
    }

    /// Score a text against every category. Untrained categories get a
    /// random fallback score in (0.1, 0.9) — an explicit degradation, never
    /// a hard failure.
    pub fn classify(&self, text: &str) -> BTreeMap<Category, CategoryScore> {
        let mut rng = rand::rng();
        Category::ALL
            .iter()
            .map(|&category| {
                let score = match &self.models[category as usize] {
                    Some(cm) => {
                        let features = cm.vectorizer.transform(text);
                        CategoryScore::Trained(cm.model.predict_proba(&features))
                    }
                    None => CategoryScore::Fallback {
                        score: rng.random_range(0.1..0.9),
                        reason: FallbackReason::Untrained,
                    },
                };
                (category, score)
            })
            .collect()
    }

    /// Explain a classification for one category label. Trained categories
    /// read model coefficients; everything else (untrained categories and
    /// media-only labels) uses the lexicon heuristic.
    pub fn explain(&self, text: &str, label: &str) -> Vec<TermWeight> {
        if let Ok(category) = Category::parse(label) {
            if let Some(cm) = &self.models[category as usize] {
                return explain::trained_explanation(&cm.vectorizer, &cm.model, text);
            }
        }
        explain::lexicon_explanation(text, label)
    }

    /// The configured threshold for a label, defaulting to 0.5 for labels
    /// outside the table.
    pub fn threshold(&self, label: &str) -> f64 {
        self.thresholds.get(label).copied().unwrap_or(0.5)
    }

    pub fn thresholds(&self) -> &BTreeMap<String, f64> {
        &self.thresholds
    }

    pub fn is_trained(&self) -> bool {
        self.models.iter().any(Option::is_some)
    }

    pub fn trained_categories(&self) -> Vec<Category> {
        Category::ALL
            .iter()
            .copied()
            .filter(|&c| self.models[c as usize].is_some())
            .collect()
    }
}

fn fit_category(texts: &[String], labels: &[u8]) -> Result<(CategoryModel, f64)> {
    if texts.is_empty() {
        anyhow::bail!("no training texts");
    }
    if texts.len() != labels.len() {
        anyhow::bail!(
            "text/label length mismatch: {} vs {}",
            texts.len(),
            labels.len()
        );
    }

    let vectorizer = TfidfVectorizer::fit(texts, DEFAULT_MAX_FEATURES)?;
    let features: Vec<Vec<(usize, f64)>> = texts.iter().map(|t| vectorizer.transform(t)).collect();
    let model = linear::fit(&features, labels, vectorizer.vocab_size())?;
    let accuracy = linear::accuracy(&model, &features, labels);

    Ok((CategoryModel { vectorizer, model }, accuracy))
}

/// Single-writer/multi-reader handle to the live engine.
///
/// Readers clone the inner Arc out of the lock and score without holding it,
/// so classification never blocks on a model swap. A swap publishes a fully
/// built replacement atomically — concurrent readers observe either the old
/// or the new engine, never a partial one.
pub struct ClassifierHandle {
    current: RwLock<Arc<Classifier>>,
}

impl ClassifierHandle {
    pub fn new(classifier: Classifier) -> Self {
        Self {
            current: RwLock::new(Arc::new(classifier)),
        }
    }

    /// Open a handle from the artifact path, untrained on load failure.
    pub fn open(path: &Path) -> Self {
        Self::new(Classifier::load_or_default(path))
    }

    /// The current engine snapshot.
    pub fn current(&self) -> Arc<Classifier> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the engine wholesale.
    pub fn swap(&self, classifier: Classifier) {
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(classifier);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn violence_corpus() -> (Vec<String>, Vec<u8>) {
        let texts = vec![
            "i will kill you tomorrow".to_string(),
            "they threatened to attack the office".to_string(),
            "he said he would hurt them badly".to_string(),
            "going to break your face".to_string(),
            "what a lovely sunny afternoon".to_string(),
            "the recipe needs two cups of flour".to_string(),
            "thanks for the helpful code review".to_string(),
            "see you at the park later".to_string(),
        ];
        let labels = vec![1, 1, 1, 1, 0, 0, 0, 0];
        (texts, labels)
    }

    #[test]
    fn test_untrained_classify_falls_back_everywhere() {
        let classifier = Classifier::new();
        let scores = classifier.classify("anything at all");
        assert_eq!(scores.len(), Category::ALL.len());
        for score in scores.values() {
            assert!(score.is_fallback());
            let v = score.value();
            assert!((0.1..0.9).contains(&v), "fallback score {v} out of range");
        }
    }

    #[test]
    fn test_trained_category_scores_real_output() {
        let mut classifier = Classifier::new();
        let (texts, labels) = violence_corpus();
        let accuracy = classifier.train(Category::Violence, &texts, &labels);
        assert!(accuracy > 0.9, "training accuracy was {accuracy}");

        let scores = classifier.classify("i will kill you tomorrow");
        let violence = &scores[&Category::Violence];
        assert!(!violence.is_fallback());
        assert!(violence.value() > 0.5, "violence score {}", violence.value());
        // Untrained categories still fall back
        assert!(scores[&Category::Profanity].is_fallback());
    }

    #[test]
    fn test_all_scores_in_unit_interval() {
        let mut classifier = Classifier::new();
        let (texts, labels) = violence_corpus();
        classifier.train(Category::Violence, &texts, &labels);
        for probe in ["kill kill kill", "flowers and sunshine", ""] {
            for score in classifier.classify(probe).values() {
                let v = score.value();
                assert!((0.0..=1.0).contains(&v), "score {v} out of [0,1] for {probe:?}");
            }
        }
    }

    #[test]
    fn test_train_failure_returns_zero() {
        let mut classifier = Classifier::new();
        let accuracy = classifier.train(Category::Profanity, &[], &[]);
        assert_eq!(accuracy, 0.0);
        assert!(!classifier.is_trained());
    }

    #[test]
    fn test_threshold_defaults() {
        let classifier = Classifier::new();
        assert!((classifier.threshold("hate_speech") - 0.65).abs() < f64::EPSILON);
        assert!((classifier.threshold("overall") - 0.6).abs() < f64::EPSILON);
        // Unknown labels default to 0.5
        assert!((classifier.threshold("hate_symbols") - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_save_load_reproduces_scores_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");

        let mut classifier = Classifier::new();
        let (texts, labels) = violence_corpus();
        classifier.train(Category::Violence, &texts, &labels);
        classifier.save(&path).unwrap();

        let reloaded = Classifier::load_or_default(&path);
        assert!(reloaded.is_trained());

        let probe = "he said he would attack and hurt them";
        let before = classifier.classify(probe)[&Category::Violence].value();
        let after = reloaded.classify(probe)[&Category::Violence].value();
        assert_eq!(before, after, "scores must round-trip bit-for-bit");
    }

    #[test]
    fn test_load_missing_artifact_starts_untrained() {
        let classifier = Classifier::load_or_default(Path::new("/nonexistent/model.json"));
        assert!(!classifier.is_trained());
    }

    #[test]
    fn test_category_parse_unsupported() {
        let err = Category::parse("astrology").unwrap_err();
        assert!(matches!(err, ModerationError::UnsupportedCategory(_)));
    }

    #[test]
    fn test_handle_swap_publishes_new_engine() {
        let handle = ClassifierHandle::new(Classifier::new());
        assert!(!handle.current().is_trained());

        let mut trained = Classifier::new();
        let (texts, labels) = violence_corpus();
        trained.train(Category::Violence, &texts, &labels);
        handle.swap(trained);

        assert!(handle.current().is_trained());
    }

    #[test]
    fn test_handle_reader_keeps_old_snapshot_across_swap() {
        let handle = ClassifierHandle::new(Classifier::new());
        let snapshot = handle.current();
        let mut trained = Classifier::new();
        let (texts, labels) = violence_corpus();
        trained.train(Category::Violence, &texts, &labels);
        handle.swap(trained);
        // The reader's snapshot is unaffected by the swap
        assert!(!snapshot.is_trained());
        assert!(handle.current().is_trained());
    }
}
