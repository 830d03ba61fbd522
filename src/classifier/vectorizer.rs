// Bag-of-ngrams TF-IDF vectorizer.
//
// Fits a bounded vocabulary (unigrams + bigrams) over a training corpus and
// turns any later text into a sparse, L2-normalized feature vector against
// that fixed vocabulary. The fitted state (terms + IDF table) is what the
// model artifact persists, so fit and transform must stay deterministic:
// same corpus in, same vocabulary out, bit-for-bit.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::OnceLock;

use anyhow::Result;
use stop_words::{get, LANGUAGE};

/// Vocabulary cap. Terms are ranked by corpus frequency before the cut.
pub const DEFAULT_MAX_FEATURES: usize = 5000;

fn stop_set() -> &'static HashSet<String> {
    static SET: OnceLock<HashSet<String>> = OnceLock::new();
    SET.get_or_init(|| get(LANGUAGE::English).into_iter().collect())
}

/// Split a text into unigram tokens: whitespace-separated words of at least
/// two characters that aren't stop words. Texts are expected to be
/// normalized already (see preprocess::normalize).
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .filter(|w| w.chars().count() >= 2 && !stop_set().contains(*w))
        .map(str::to_string)
        .collect()
}

/// Unigrams plus adjacent-pair bigrams ("kill you") over the token stream.
pub fn ngrams(text: &str) -> Vec<String> {
    let tokens = tokenize(text);
    let mut grams = tokens.clone();
    for pair in tokens.windows(2) {
        grams.push(format!("{} {}", pair[0], pair[1]));
    }
    grams
}

pub struct TfidfVectorizer {
    /// Vocabulary in index order (lexicographically sorted at fit time).
    terms: Vec<String>,
    /// Smoothed inverse document frequency per term.
    idf: Vec<f64>,
    /// term -> index, rebuilt from `terms` on construction.
    index: HashMap<String, usize>,
}

impl TfidfVectorizer {
    /// Fit a vocabulary and IDF table on a training corpus.
    pub fn fit(texts: &[String], max_features: usize) -> Result<Self> {
        if texts.is_empty() {
            anyhow::bail!("cannot fit a vectorizer on an empty corpus");
        }

        let mut doc_freq: HashMap<String, u64> = HashMap::new();
        let mut corpus_freq: HashMap<String, u64> = HashMap::new();

        for text in texts {
            let grams = ngrams(text);
            let mut seen: HashSet<&str> = HashSet::new();
            for gram in &grams {
                *corpus_freq.entry(gram.clone()).or_insert(0) += 1;
            }
            for gram in &grams {
                if seen.insert(gram.as_str()) {
                    *doc_freq.entry(gram.clone()).or_insert(0) += 1;
                }
            }
        }

        if corpus_freq.is_empty() {
            anyhow::bail!(
                "no usable terms in {} training texts — texts may be empty or all stop words",
                texts.len()
            );
        }

        // Keep the most frequent terms, ties broken lexicographically so the
        // cut is deterministic, then sort the survivors for stable indices.
        let mut ranked: Vec<(String, u64)> = corpus_freq.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(max_features);

        let mut terms: Vec<String> = ranked.into_iter().map(|(term, _)| term).collect();
        terms.sort();

        let n = texts.len() as f64;
        let idf: Vec<f64> = terms
            .iter()
            .map(|term| {
                let df = doc_freq.get(term).copied().unwrap_or(0) as f64;
                ((1.0 + n) / (1.0 + df)).ln() + 1.0
            })
            .collect();

        Ok(Self::assemble(terms, idf))
    }

    /// Rebuild a fitted vectorizer from persisted parts.
    pub fn from_parts(terms: Vec<String>, idf: Vec<f64>) -> Result<Self> {
        if terms.len() != idf.len() {
            anyhow::bail!(
                "vocabulary/idf length mismatch: {} terms vs {} idf entries",
                terms.len(),
                idf.len()
            );
        }
        Ok(Self::assemble(terms, idf))
    }

    fn assemble(terms: Vec<String>, idf: Vec<f64>) -> Self {
        let index = terms
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i))
            .collect();
        Self { terms, idf, index }
    }

    /// Transform a text into a sparse L2-normalized TF-IDF vector,
    /// sorted by feature index. Terms outside the vocabulary are dropped.
    pub fn transform(&self, text: &str) -> Vec<(usize, f64)> {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for gram in ngrams(text) {
            if let Some(&i) = self.index.get(&gram) {
                *counts.entry(i).or_insert(0.0) += 1.0;
            }
        }

        let mut features: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(i, tf)| (i, tf * self.idf[i]))
            .collect();

        let norm: f64 = features.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, v) in &mut features {
                *v /= norm;
            }
        }
        features
    }

    pub fn lookup(&self, term: &str) -> Option<usize> {
        self.index.get(term).copied()
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn idf(&self) -> &[f64] {
        &self.idf
    }

    pub fn vocab_size(&self) -> usize {
        self.terms.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<String> {
        vec![
            "the attacker will attack the building".to_string(),
            "please review this building permit".to_string(),
            "attack attack attack".to_string(),
        ]
    }

    #[test]
    fn test_fit_builds_vocabulary() {
        let v = TfidfVectorizer::fit(&corpus(), 100).unwrap();
        assert!(v.lookup("attack").is_some());
        assert!(v.lookup("building").is_some());
        // Stop words never enter the vocabulary
        assert!(v.lookup("the").is_none());
        // Bigrams are present
        assert!(v.lookup("attack attack").is_some());
    }

    #[test]
    fn test_fit_empty_corpus_fails() {
        assert!(TfidfVectorizer::fit(&[], 100).is_err());
    }

    #[test]
    fn test_max_features_caps_vocabulary() {
        let v = TfidfVectorizer::fit(&corpus(), 3).unwrap();
        assert_eq!(v.vocab_size(), 3);
    }

    #[test]
    fn test_transform_is_l2_normalized() {
        let v = TfidfVectorizer::fit(&corpus(), 100).unwrap();
        let features = v.transform("attack the building");
        assert!(!features.is_empty());
        let norm: f64 = features.iter().map(|(_, x)| x * x).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-9, "norm was {norm}");
    }

    #[test]
    fn test_transform_unknown_terms_empty() {
        let v = TfidfVectorizer::fit(&corpus(), 100).unwrap();
        assert!(v.transform("zebra quartet").is_empty());
    }

    #[test]
    fn test_fit_is_deterministic() {
        let a = TfidfVectorizer::fit(&corpus(), 100).unwrap();
        let b = TfidfVectorizer::fit(&corpus(), 100).unwrap();
        assert_eq!(a.terms(), b.terms());
        assert_eq!(a.idf(), b.idf());
    }

    #[test]
    fn test_from_parts_round_trip() {
        let a = TfidfVectorizer::fit(&corpus(), 100).unwrap();
        let b = TfidfVectorizer::from_parts(a.terms().to_vec(), a.idf().to_vec()).unwrap();
        assert_eq!(a.transform("attack the building"), b.transform("attack the building"));
    }

    #[test]
    fn test_from_parts_length_mismatch_fails() {
        assert!(TfidfVectorizer::from_parts(vec!["a".to_string()], vec![]).is_err());
    }
}
