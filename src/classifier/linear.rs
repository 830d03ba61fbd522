// Linear probabilistic classifier — logistic regression over sparse
// TF-IDF features.
//
// Fit runs full-batch gradient descent with balanced class weights, so a
// category with few violating examples still learns a usable boundary.
// The optimizer is deliberately deterministic (zero init, fixed schedule):
// saving and reloading an artifact must reproduce identical probabilities.

use anyhow::Result;

/// Fixed optimizer schedule. Training sets here are small (hundreds to a
/// few thousand rows), so full-batch descent converges well within this.
const EPOCHS: usize = 400;
const LEARNING_RATE: f64 = 0.5;
/// Inverse regularization strength, matching the usual C parameterization.
const C: f64 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct LogisticModel {
    pub weights: Vec<f64>,
    pub bias: f64,
}

impl LogisticModel {
    /// Probability of the positive (violating) class for one sparse feature
    /// vector.
    pub fn predict_proba(&self, features: &[(usize, f64)]) -> f64 {
        let z: f64 = self.bias
            + features
                .iter()
                .map(|&(i, v)| self.weights.get(i).copied().unwrap_or(0.0) * v)
                .sum::<f64>();
        sigmoid(z)
    }
}

/// Fit a logistic regression on sparse feature vectors and binary labels.
pub fn fit(features: &[Vec<(usize, f64)>], labels: &[u8], dim: usize) -> Result<LogisticModel> {
    if features.is_empty() {
        anyhow::bail!("cannot fit on an empty training set");
    }
    if features.len() != labels.len() {
        anyhow::bail!(
            "feature/label length mismatch: {} vs {}",
            features.len(),
            labels.len()
        );
    }

    let n = features.len() as f64;
    let n_pos = labels.iter().filter(|&&l| l == 1).count() as f64;
    let n_neg = n - n_pos;

    // Balanced class weights: n / (2 * class count). A class that never
    // occurs contributes nothing, so its weight is irrelevant.
    let weight_pos = if n_pos > 0.0 { n / (2.0 * n_pos) } else { 0.0 };
    let weight_neg = if n_neg > 0.0 { n / (2.0 * n_neg) } else { 0.0 };

    let mut weights = vec![0.0; dim];
    let mut bias = 0.0;

    let mut grad_w = vec![0.0; dim];
    for _ in 0..EPOCHS {
        grad_w.iter_mut().for_each(|g| *g = 0.0);
        let mut grad_b = 0.0;

        for (x, &y) in features.iter().zip(labels) {
            let p = predict_raw(&weights, bias, x);
            let class_weight = if y == 1 { weight_pos } else { weight_neg };
            let err = class_weight * (p - f64::from(y));
            for &(i, v) in x {
                grad_w[i] += err * v;
            }
            grad_b += err;
        }

        // L2 penalty gradient (w / C), scaled with the loss by 1/n.
        let step = LEARNING_RATE / n;
        for (w, g) in weights.iter_mut().zip(&grad_w) {
            *w -= step * (g + *w / C);
        }
        bias -= step * grad_b;
    }

    Ok(LogisticModel { weights, bias })
}

/// Fraction of samples whose thresholded prediction (at 0.5) matches the
/// label.
pub fn accuracy(model: &LogisticModel, features: &[Vec<(usize, f64)>], labels: &[u8]) -> f64 {
    if features.is_empty() {
        return 0.0;
    }
    let correct = features
        .iter()
        .zip(labels)
        .filter(|(x, &y)| {
            let pred = u8::from(model.predict_proba(x) >= 0.5);
            pred == y
        })
        .count();
    correct as f64 / features.len() as f64
}

fn predict_raw(weights: &[f64], bias: f64, features: &[(usize, f64)]) -> f64 {
    let z: f64 = bias + features.iter().map(|&(i, v)| weights[i] * v).sum::<f64>();
    sigmoid(z)
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two clearly separable clusters on one feature.
    fn separable() -> (Vec<Vec<(usize, f64)>>, Vec<u8>) {
        let features = vec![
            vec![(0, 1.0)],
            vec![(0, 0.9)],
            vec![(0, 0.8)],
            vec![(1, 1.0)],
            vec![(1, 0.9)],
            vec![(1, 0.8)],
        ];
        let labels = vec![1, 1, 1, 0, 0, 0];
        (features, labels)
    }

    #[test]
    fn test_fit_separates_clusters() {
        let (features, labels) = separable();
        let model = fit(&features, &labels, 2).unwrap();
        assert!(model.predict_proba(&[(0, 1.0)]) > 0.5);
        assert!(model.predict_proba(&[(1, 1.0)]) < 0.5);
        assert!((accuracy(&model, &features, &labels) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_probabilities_in_unit_interval() {
        let (features, labels) = separable();
        let model = fit(&features, &labels, 2).unwrap();
        for x in &features {
            let p = model.predict_proba(x);
            assert!((0.0..=1.0).contains(&p), "probability {p} out of range");
        }
    }

    #[test]
    fn test_fit_is_deterministic() {
        let (features, labels) = separable();
        let a = fit(&features, &labels, 2).unwrap();
        let b = fit(&features, &labels, 2).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_fit_single_class_does_not_error() {
        // All labels 0 — the fit must still converge to something sane.
        let features = vec![vec![(0, 1.0)], vec![(0, 0.5)]];
        let labels = vec![0, 0];
        let model = fit(&features, &labels, 1).unwrap();
        assert!(model.predict_proba(&[(0, 1.0)]) < 0.5);
    }

    #[test]
    fn test_fit_empty_fails() {
        assert!(fit(&[], &[], 0).is_err());
    }

    #[test]
    fn test_fit_length_mismatch_fails() {
        assert!(fit(&[vec![(0, 1.0)]], &[], 1).is_err());
    }

    #[test]
    fn test_predict_out_of_range_index_ignored() {
        let model = LogisticModel {
            weights: vec![1.0],
            bias: 0.0,
        };
        // Feature index beyond the weight vector contributes zero.
        let p = model.predict_proba(&[(5, 1.0)]);
        assert!((p - 0.5).abs() < f64::EPSILON);
    }
}
