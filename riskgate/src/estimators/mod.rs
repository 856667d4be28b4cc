//! Algorithm boundary.
//!
//! Plugins only talk to estimators through the traits below. The reference
//! implementations in this module are small, seeded and deterministic: they
//! exist so every plugin can run end to end, and their accuracy is not part
//! of the lifecycle contract. Any other implementation of the traits can be
//! swapped in.

use std::fmt::Debug;

use ndarray::{Array2, ArrayView2};

use crate::error::Result;

pub mod autoencoder;
pub mod isolation_forest;
pub mod pagerank;

pub use autoencoder::{AutoencoderParams, DenseAutoencoder, ErrorMetric};
pub use isolation_forest::{IsolationForest, IsolationForestParams};
pub use pagerank::{pagerank, EdgeGraph, PageRankParams};

/// Estimators that separate outliers with a decision function.
///
/// Lower decision values are more anomalous; negative values are outliers.
pub trait OutlierEstimator: Send + Debug {
    /// Fits the estimator on `x` (rows × features).
    fn fit(&mut self, x: ArrayView2<'_, f64>) -> Result<()>;

    /// Signed distance to the decision boundary, one value per row.
    fn decision_function(&self, x: ArrayView2<'_, f64>) -> Result<Vec<f64>>;

    /// Outlier verdict per row.
    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Vec<bool>> {
        Ok(self
            .decision_function(x)?
            .into_iter()
            .map(|score| score < 0.0)
            .collect())
    }

    fn is_fitted(&self) -> bool;
}

/// Estimators that reconstruct their input.
pub trait ReconstructionEstimator: Send + Debug {
    /// Fits on `x` and returns the final training loss.
    fn fit(&mut self, x: ArrayView2<'_, f64>) -> Result<f64>;

    /// Reconstruction of `x`, same shape.
    fn reconstruct(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>>;

    /// Feature width the estimator was fitted on.
    fn input_width(&self) -> Option<usize>;
}
