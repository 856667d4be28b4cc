//! Dense autoencoder with one tanh bottleneck layer.

use std::f64::consts::PI;

use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ReconstructionEstimator;
use crate::error::{Result, RiskError};

/// Per-row reconstruction error metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorMetric {
    /// Mean squared error.
    Squared,
    /// Mean absolute error.
    Absolute,
}

impl ErrorMetric {
    /// Short name used for labels and detail keys.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Squared => "mse",
            Self::Absolute => "mae",
        }
    }

    /// Mean error of each row of `reconstruction` against `input`.
    pub fn row_errors(&self, input: ArrayView2<'_, f64>, reconstruction: &Array2<f64>) -> Vec<f64> {
        let diff = reconstruction - &input;
        let per_cell = match self {
            Self::Squared => diff.mapv(|d| d * d),
            Self::Absolute => diff.mapv(f64::abs),
        };
        match per_cell.mean_axis(Axis(1)) {
            Some(means) => means.to_vec(),
            None => vec![0.0; input.nrows()],
        }
    }

    fn loss(&self, diff: &Array2<f64>) -> f64 {
        let cells = diff.len().max(1) as f64;
        match self {
            Self::Squared => diff.mapv(|d| d * d).sum() / cells,
            Self::Absolute => diff.mapv(f64::abs).sum() / cells,
        }
    }

    fn gradient(&self, diff: &Array2<f64>) -> Array2<f64> {
        let cells = diff.len().max(1) as f64;
        match self {
            Self::Squared => diff.mapv(|d| 2.0 * d / cells),
            Self::Absolute => diff.mapv(|d| d.signum() / cells),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoencoderParams {
    pub hidden_units: usize,
    pub epochs: usize,
    pub learning_rate: f64,
    pub metric: ErrorMetric,
    pub seed: u64,
}

impl Default for AutoencoderParams {
    fn default() -> Self {
        Self {
            hidden_units: 8,
            epochs: 50,
            learning_rate: 0.05,
            metric: ErrorMetric::Squared,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
struct Weights {
    w1: Array2<f64>,
    b1: Array1<f64>,
    w2: Array2<f64>,
    b2: Array1<f64>,
}

impl Weights {
    fn xavier(width: usize, hidden: usize, rng: &mut StdRng) -> Self {
        let limit = (6.0 / (width + hidden) as f64).sqrt();
        let w1 = Array2::from_shape_fn((width, hidden), |_| rng.random_range(-limit..limit));
        let w2 = Array2::from_shape_fn((hidden, width), |_| rng.random_range(-limit..limit));
        Self {
            w1,
            b1: Array1::zeros(hidden),
            w2,
            b2: Array1::zeros(width),
        }
    }

    /// Hidden activations and output.
    fn forward(&self, x: ArrayView2<'_, f64>) -> (Array2<f64>, Array2<f64>) {
        let hidden = (x.dot(&self.w1) + &self.b1).mapv(f64::tanh);
        let output = hidden.dot(&self.w2) + &self.b2;
        (hidden, output)
    }
}

/// Per-column mean and spread captured at fit time.
#[derive(Debug, Clone)]
struct Standardizer {
    mean: Array1<f64>,
    scale: Array1<f64>,
}

impl Standardizer {
    fn fit(x: ArrayView2<'_, f64>) -> Self {
        let width = x.ncols();
        let mean = x.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(width));
        // constant columns keep their offset only
        let scale = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s.is_finite() && s > f64::EPSILON { s } else { 1.0 });
        Self { mean, scale }
    }

    fn apply(&self, x: ArrayView2<'_, f64>) -> Array2<f64> {
        (&x - &self.mean) / &self.scale
    }

    fn invert(&self, z: &Array2<f64>) -> Array2<f64> {
        z * &self.scale + &self.mean
    }
}

/// Autoencoder trained with full-batch gradient descent on standardized
/// columns. Errors are measured in the standardized space so no single
/// column dominates by magnitude.
#[derive(Debug, Clone)]
pub struct DenseAutoencoder {
    params: AutoencoderParams,
    fitted: Option<(Standardizer, Weights)>,
}

impl DenseAutoencoder {
    pub fn new(params: AutoencoderParams) -> Self {
        Self {
            params,
            fitted: None,
        }
    }

    pub fn params(&self) -> &AutoencoderParams {
        &self.params
    }

    pub fn metric(&self) -> ErrorMetric {
        self.params.metric
    }

    /// Reconstruction error of every row of `x`.
    pub fn reconstruction_errors(&self, x: ArrayView2<'_, f64>) -> Result<Vec<f64>> {
        let (standardizer, weights) = self.fitted_for(x)?;
        let z = standardizer.apply(x);
        let output = weights.forward(z.view()).1;
        Ok(self.params.metric.row_errors(z.view(), &output))
    }

    fn fitted_for(&self, x: ArrayView2<'_, f64>) -> Result<&(Standardizer, Weights)> {
        let fitted = self
            .fitted
            .as_ref()
            .ok_or_else(|| RiskError::estimator("autoencoder", "model is not fitted"))?;
        let width = fitted.1.w1.nrows();
        if x.ncols() != width {
            return Err(RiskError::InvalidData(format!(
                "autoencoder fitted on {width} features, got {}",
                x.ncols()
            )));
        }
        Ok(fitted)
    }
}

impl ReconstructionEstimator for DenseAutoencoder {
    fn fit(&mut self, x: ArrayView2<'_, f64>) -> Result<f64> {
        let (rows, width) = x.dim();
        if rows == 0 {
            return Err(RiskError::no_data("autoencoder needs at least one training row"));
        }
        if width == 0 {
            return Err(RiskError::InvalidData(
                "autoencoder needs at least one numeric feature".to_string(),
            ));
        }
        if self.params.hidden_units == 0 {
            return Err(RiskError::configuration("hidden_units must be at least 1"));
        }

        let standardizer = Standardizer::fit(x);
        let z = standardizer.apply(x);
        let x = z.view();
        let mut rng = StdRng::seed_from_u64(self.params.seed);
        let mut weights = Weights::xavier(width, self.params.hidden_units, &mut rng);
        let metric = self.params.metric;
        let lr = self.params.learning_rate;
        let mut loss = f64::NAN;

        for _ in 0..self.params.epochs {
            let (hidden, output) = weights.forward(x);
            let diff = &output - &x;
            loss = metric.loss(&diff);

            let d_output = metric.gradient(&diff);
            let d_w2 = hidden.t().dot(&d_output);
            let d_b2 = d_output.sum_axis(Axis(0));
            let d_hidden = d_output.dot(&weights.w2.t()) * hidden.mapv(|h| 1.0 - h * h);
            let d_w1 = x.t().dot(&d_hidden);
            let d_b1 = d_hidden.sum_axis(Axis(0));

            weights.w2.scaled_add(-lr, &d_w2);
            weights.b2.scaled_add(-lr, &d_b2);
            weights.w1.scaled_add(-lr, &d_w1);
            weights.b1.scaled_add(-lr, &d_b1);
        }

        if loss.is_nan() {
            let (_, output) = weights.forward(x);
            loss = metric.loss(&(&output - &x));
        }

        debug!(rows, width, epochs = self.params.epochs, loss, metric = metric.name(), "autoencoder fitted");
        self.fitted = Some((standardizer, weights));
        Ok(loss)
    }

    fn reconstruct(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        let (standardizer, weights) = self.fitted_for(x)?;
        let output = weights.forward(standardizer.apply(x).view()).1;
        Ok(standardizer.invert(&output))
    }

    fn input_width(&self) -> Option<usize> {
        self.fitted.as_ref().map(|(_, w)| w.w1.nrows())
    }
}

/// `rows × width` standard normal samples (Box-Muller), seeded.
pub fn standard_normal_matrix(rows: usize, width: usize, seed: u64) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array2::from_shape_fn((rows, width), |_| {
        let u1: f64 = rng.random_range(f64::EPSILON..1.0);
        let u2: f64 = rng.random();
        (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
    })
}
