//! Isolation forest.
//!
//! Each tree isolates a random subsample with random axis-aligned splits. Rows
//! that are isolated after few splits get a low score. The decision function is
//! shifted so that the `contamination` quantile of the training scores sits at
//! zero, which makes negative values outliers.

use ndarray::{ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::OutlierEstimator;
use crate::error::{Result, RiskError};

const EULER_GAMMA: f64 = 0.577_215_664_9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationForestParams {
    pub n_estimators: usize,
    pub max_samples: usize,
    /// Expected share of outliers in the training data, in `(0, 0.5]`.
    pub contamination: f64,
    pub seed: u64,
}

impl Default for IsolationForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_samples: 256,
            contamination: 0.1,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn path_length(&self, row: ArrayView1<'_, f64>, depth: usize) -> f64 {
        match self {
            Node::Leaf { size } => depth as f64 + average_path_length(*size),
            Node::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if row[*feature] < *threshold {
                    left.path_length(row, depth + 1)
                } else {
                    right.path_length(row, depth + 1)
                }
            }
        }
    }
}

/// Average path length of an unsuccessful search in a binary search tree of `n` nodes.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Percentile with linear interpolation between closest ranks.
fn percentile(values: &[f64], q: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (q / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

#[derive(Debug, Clone)]
pub struct IsolationForest {
    params: IsolationForestParams,
    trees: Vec<Node>,
    sample_size: usize,
    width: Option<usize>,
    offset: f64,
}

impl IsolationForest {
    pub fn new(params: IsolationForestParams) -> Self {
        Self {
            params,
            trees: Vec::new(),
            sample_size: 0,
            width: None,
            offset: 0.0,
        }
    }

    pub fn params(&self) -> &IsolationForestParams {
        &self.params
    }

    /// Threshold subtracted from raw scores by the decision function.
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Raw anomaly scores in `[-1, 0)`; lower is more anomalous.
    pub fn score_samples(&self, x: ArrayView2<'_, f64>) -> Result<Vec<f64>> {
        self.check_input(x)?;
        let normalizer = average_path_length(self.sample_size);
        let trees = self.trees.len() as f64;

        Ok(x.outer_iter()
            .map(|row| {
                let mean_depth: f64 = self
                    .trees
                    .iter()
                    .map(|tree| tree.path_length(row, 0))
                    .sum::<f64>()
                    / trees;
                let normalized = if normalizer > 0.0 {
                    mean_depth / normalizer
                } else {
                    0.0
                };
                -(2f64.powf(-normalized))
            })
            .collect())
    }

    fn check_input(&self, x: ArrayView2<'_, f64>) -> Result<()> {
        let width = self
            .width
            .ok_or_else(|| RiskError::estimator("isolation_forest", "model is not fitted"))?;
        if x.ncols() != width {
            return Err(RiskError::InvalidData(format!(
                "isolation forest fitted on {width} features, got {}",
                x.ncols()
            )));
        }
        Ok(())
    }

    fn build(
        x: ArrayView2<'_, f64>,
        indices: Vec<usize>,
        depth: usize,
        max_depth: usize,
        rng: &mut StdRng,
    ) -> Node {
        if depth >= max_depth || indices.len() <= 1 {
            return Node::Leaf {
                size: indices.len(),
            };
        }

        let splittable: Vec<(usize, f64, f64)> = (0..x.ncols())
            .filter_map(|feature| {
                let (min, max) = indices.iter().fold(
                    (f64::INFINITY, f64::NEG_INFINITY),
                    |(min, max), &row| {
                        let value = x[[row, feature]];
                        (min.min(value), max.max(value))
                    },
                );
                (max > min).then_some((feature, min, max))
            })
            .collect();

        if splittable.is_empty() {
            return Node::Leaf {
                size: indices.len(),
            };
        }

        let (feature, min, max) = splittable[rng.random_range(0..splittable.len())];
        let threshold = if (max - min).is_finite() {
            rng.random_range(min..max)
        } else {
            // span overflows; interpolate without forming max - min
            let t: f64 = rng.random();
            min * (1.0 - t) + max * t
        };
        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&row| x[[row, feature]] < threshold);

        Node::Split {
            feature,
            threshold,
            left: Box::new(Self::build(x, left, depth + 1, max_depth, rng)),
            right: Box::new(Self::build(x, right, depth + 1, max_depth, rng)),
        }
    }
}

impl Default for IsolationForest {
    fn default() -> Self {
        Self::new(IsolationForestParams::default())
    }
}

impl OutlierEstimator for IsolationForest {
    fn fit(&mut self, x: ArrayView2<'_, f64>) -> Result<()> {
        let rows = x.nrows();
        if rows == 0 {
            return Err(RiskError::no_data(
                "isolation forest needs at least one training row",
            ));
        }
        if x.ncols() == 0 {
            return Err(RiskError::InvalidData(
                "isolation forest needs at least one numeric feature".to_string(),
            ));
        }
        if self.params.n_estimators == 0 || self.params.max_samples == 0 {
            return Err(RiskError::configuration(
                "n_estimators and max_samples must be at least 1",
            ));
        }

        let sample_size = self.params.max_samples.min(rows);
        let max_depth = (sample_size as f64).log2().ceil().max(0.0) as usize;
        let mut rng = StdRng::seed_from_u64(self.params.seed);

        self.trees = (0..self.params.n_estimators)
            .map(|_| {
                let indices = rand::seq::index::sample(&mut rng, rows, sample_size).into_vec();
                Self::build(x, indices, 0, max_depth, &mut rng)
            })
            .collect();
        self.sample_size = sample_size;
        self.width = Some(x.ncols());
        self.offset = 0.0;

        let training_scores = self.score_samples(x)?;
        self.offset = percentile(&training_scores, 100.0 * self.params.contamination);

        debug!(
            rows,
            features = x.ncols(),
            trees = self.trees.len(),
            sample_size,
            offset = self.offset,
            "isolation forest fitted"
        );
        Ok(())
    }

    fn decision_function(&self, x: ArrayView2<'_, f64>) -> Result<Vec<f64>> {
        Ok(self
            .score_samples(x)?
            .into_iter()
            .map(|score| score - self.offset)
            .collect())
    }

    fn is_fitted(&self) -> bool {
        self.width.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn clustered_with_outlier() -> Array2<f64> {
        let mut rows = Vec::new();
        for i in 0..40 {
            let jitter = (i % 5) as f64 * 0.1;
            rows.push(1.0 + jitter);
            rows.push(2.0 - jitter);
        }
        rows.push(50.0);
        rows.push(-40.0);
        Array2::from_shape_vec((41, 2), rows).unwrap()
    }

    #[test]
    fn test_average_path_length() {
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        let c256 = average_path_length(256);
        assert!((c256 - 10.24).abs() < 0.05, "c(256) = {c256}");
    }

    #[test]
    fn test_percentile_interpolates() {
        let values = [4.0, 1.0, 3.0, 2.0];
        assert_eq!(percentile(&values, 0.0), 1.0);
        assert_eq!(percentile(&values, 100.0), 4.0);
        assert!((percentile(&values, 50.0) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_outlier_scores_lowest() {
        let data = clustered_with_outlier();
        let mut forest = IsolationForest::default();
        forest.fit(data.view()).unwrap();

        let scores = forest.decision_function(data.view()).unwrap();
        let outlier = scores[40];
        assert!(scores[..40].iter().all(|s| *s > outlier));
        assert!(forest.predict(data.view()).unwrap()[40]);
    }

    #[test]
    fn test_contamination_share_of_training_rows_flagged() {
        let data = clustered_with_outlier();
        let mut forest = IsolationForest::default();
        forest.fit(data.view()).unwrap();

        let flagged = forest
            .predict(data.view())
            .unwrap()
            .into_iter()
            .filter(|o| *o)
            .count();
        assert!(flagged >= 1 && flagged <= 5, "flagged {flagged}");
    }

    #[test]
    fn test_fit_is_deterministic() {
        let data = clustered_with_outlier();
        let mut a = IsolationForest::default();
        let mut b = IsolationForest::default();
        a.fit(data.view()).unwrap();
        b.fit(data.view()).unwrap();
        assert_eq!(
            a.decision_function(data.view()).unwrap(),
            b.decision_function(data.view()).unwrap()
        );
    }

    #[test]
    fn test_empty_input_is_no_data() {
        let mut forest = IsolationForest::default();
        let err = forest.fit(Array2::<f64>::zeros((0, 3)).view()).unwrap_err();
        assert!(matches!(err, RiskError::NoData { .. }));
    }

    #[test]
    fn test_unfitted_and_wrong_width() {
        let forest = IsolationForest::default();
        assert!(!forest.is_fitted());
        assert!(forest.decision_function(Array2::zeros((1, 2)).view()).is_err());

        let mut fitted = IsolationForest::default();
        fitted.fit(clustered_with_outlier().view()).unwrap();
        assert!(fitted.decision_function(Array2::zeros((1, 3)).view()).is_err());
    }

    #[test]
    fn test_single_row_fit() {
        let data = Array2::from_shape_vec((1, 2), vec![1.0, 2.0]).unwrap();
        let mut forest = IsolationForest::default();
        forest.fit(data.view()).unwrap();
        let scores = forest.decision_function(data.view()).unwrap();
        assert_eq!(scores.len(), 1);
        assert!(scores[0].is_finite());
    }

    #[test]
    fn test_extreme_magnitudes_split_without_overflow() {
        let mut values: Vec<f64> = (0..20).map(|i| i as f64).collect();
        values.push(f64::MAX);
        values.push(-f64::MAX);
        let data = Array2::from_shape_vec((22, 1), values).unwrap();

        let mut forest = IsolationForest::default();
        forest.fit(data.view()).unwrap();
        let scores = forest.decision_function(data.view()).unwrap();
        assert_eq!(scores.len(), 22);
        assert!(scores.iter().all(|s| s.is_finite()));
    }
}
