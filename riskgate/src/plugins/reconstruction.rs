//! Autoencoder plugins (reconstruction-error family).
//!
//! Two variants share this implementation: the dense autoencoder scored by
//! mean squared error (`risk = mse * 50`) and the absolute-error autoencoder
//! scored by mean absolute error (`risk = mae * 100`).

use serde::{Deserialize, Serialize};

use super::score_rows;
use crate::core::{
    DimensionReconciler, ExecutionContext, FeatureMatrix, ModelFamily, ModelPlugin, ModelState,
    RiskFrame, TrainingResult,
};
use crate::error::{Result, RiskError};
use crate::estimators::autoencoder::standard_normal_matrix;
use crate::estimators::{
    AutoencoderParams, DenseAutoencoder, ErrorMetric, ReconstructionEstimator,
};
use crate::scoring::{FamilyProfile, RawSignal, RiskNormalizer};
use crate::security::InputValidator;

pub const DENSE_SLUG: &str = "dense-autoencoder";
pub const ABSOLUTE_SLUG: &str = "absolute-autoencoder";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoencoderConfig {
    /// Feature width assumed before any data has been seen.
    pub input_width: usize,
    /// Rows of the synthetic matrix used by `train` on an empty dataset.
    pub synthetic_rows: usize,
    pub network: AutoencoderParams,
}

impl Default for AutoencoderConfig {
    fn default() -> Self {
        Self {
            input_width: 10,
            synthetic_rows: 100,
            network: AutoencoderParams::default(),
        }
    }
}

impl AutoencoderConfig {
    /// Squared-error variant.
    pub fn dense() -> Self {
        Self::default()
    }

    /// Absolute-error variant.
    pub fn absolute() -> Self {
        let mut config = Self::default();
        config.network.metric = ErrorMetric::Absolute;
        config
    }

    pub fn with_input_width(mut self, width: usize) -> Self {
        self.input_width = width;
        self
    }

    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.network.epochs = epochs;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.network.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<()> {
        InputValidator::validate_positive(self.input_width, "input_width")?;
        InputValidator::validate_positive(self.synthetic_rows, "synthetic_rows")?;
        InputValidator::validate_positive(self.network.hidden_units, "hidden_units")?;
        InputValidator::validate_threshold(self.network.learning_rate, "learning_rate")
    }
}

/// Scores rows by how badly an autoencoder reconstructs them.
///
/// `train` on an empty dataset fits on a seeded standard-normal matrix of the
/// configured width and reports a warning. `infer` never invents data: an
/// empty dataset yields an empty frame.
#[derive(Debug)]
pub struct AutoencoderModel {
    slug: &'static str,
    config: AutoencoderConfig,
    model: DenseAutoencoder,
    normalizer: RiskNormalizer,
    state: ModelState,
}

impl AutoencoderModel {
    pub fn new(config: AutoencoderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_valid(config))
    }

    /// Squared-error autoencoder with default settings.
    pub fn dense() -> Self {
        Self::from_valid(AutoencoderConfig::dense())
    }

    /// Absolute-error autoencoder with default settings.
    pub fn absolute() -> Self {
        Self::from_valid(AutoencoderConfig::absolute())
    }

    fn from_valid(config: AutoencoderConfig) -> Self {
        let (slug, profile) = match config.network.metric {
            ErrorMetric::Squared => (DENSE_SLUG, FamilyProfile::mse()),
            ErrorMetric::Absolute => (ABSOLUTE_SLUG, FamilyProfile::mae()),
        };
        Self {
            slug,
            model: DenseAutoencoder::new(config.network.clone()),
            normalizer: RiskNormalizer::new(profile),
            state: ModelState::new(config.input_width),
            config,
        }
    }

    pub fn config(&self) -> &AutoencoderConfig {
        &self.config
    }

    pub fn metric(&self) -> ErrorMetric {
        self.model.metric()
    }

    fn fit(&mut self, matrix: &FeatureMatrix) -> Result<f64> {
        if matrix.width() == 0 {
            return Err(RiskError::no_data(
                "autoencoder requires at least one numeric column",
            ));
        }
        self.model.fit(matrix.view())
    }

    /// Width the fitted network accepts.
    fn fitted_width(&self) -> Result<usize> {
        self.model
            .input_width()
            .ok_or_else(|| RiskError::estimator(self.slug, "model is not fitted"))
    }
}

impl ModelPlugin for AutoencoderModel {
    fn name(&self) -> &str {
        self.slug
    }

    fn family(&self) -> ModelFamily {
        ModelFamily::ReconstructionError
    }

    fn train(&mut self, ctx: &ExecutionContext) -> Result<TrainingResult> {
        let (matrix, synthetic) = match ctx.non_empty_dataset() {
            Some(dataset) => (dataset.feature_matrix()?, false),
            None => {
                let width = self.state.expected_width();
                ctx.log().warn(&format!(
                    "no training data; fitting {} on a synthetic {}x{width} standard normal matrix",
                    self.slug, self.config.synthetic_rows
                ));
                let values = standard_normal_matrix(self.config.synthetic_rows, width, self.config.network.seed);
                (FeatureMatrix::new(values), true)
            }
        };

        let loss = self.fit(&matrix)?;
        self.state.mark_trained(self.fitted_width()?);

        let result = if synthetic {
            TrainingResult::warning(self.slug, "trained on synthetic data")
        } else {
            TrainingResult::success(self.slug)
        };
        Ok(result
            .with_metric("loss", loss)
            .with_metric("rows", matrix.rows())
            .with_metric("features", matrix.width())
            .with_metric("metric", self.metric().name()))
    }

    fn infer(&mut self, ctx: &ExecutionContext) -> Result<RiskFrame> {
        let Some(dataset) = ctx.non_empty_dataset() else {
            ctx.log()
                .warn(&format!("{} received an empty dataset; nothing to score", self.slug));
            return Ok(RiskFrame::empty());
        };
        let matrix = dataset.feature_matrix()?;

        if !self.state.is_fitted() {
            ctx.log().warn(&format!(
                "{} is not trained; fitting on the inference data",
                self.slug
            ));
            self.fit(&matrix)?;
            self.state.mark_lazily_trained(self.fitted_width()?);
        }

        let matrix = DimensionReconciler::new(self.state.expected_width())?.reconcile(matrix, ctx.log());
        let errors = self.model.reconstruction_errors(matrix.view())?;
        score_rows(ctx, &self.normalizer, errors.into_iter().map(RawSignal::new).collect())
    }

    fn state(&self) -> &ModelState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Dataset, LifecycleState, TrainingStatus};
    use serde_json::json;

    fn dataset(width: usize) -> Dataset {
        let rows: Vec<_> = (0..20)
            .map(|i| {
                let mut row = serde_json::Map::new();
                row.insert("entity_id".into(), json!(format!("e{i}")));
                for j in 0..width {
                    row.insert(format!("f{j}"), json!(((i + j) % 5) as f64 * 0.2));
                }
                serde_json::Value::Object(row)
            })
            .collect();
        Dataset::from_json_rows(&rows).unwrap()
    }

    #[test]
    fn test_variants_use_their_profiles() {
        let dense = AutoencoderModel::dense();
        let absolute = AutoencoderModel::absolute();
        assert_eq!(dense.name(), DENSE_SLUG);
        assert_eq!(absolute.name(), ABSOLUTE_SLUG);
        assert_eq!(dense.metric(), ErrorMetric::Squared);
        assert_eq!(absolute.metric(), ErrorMetric::Absolute);
        assert_eq!(dense.state().expected_width(), 10);
    }

    #[test]
    fn test_outlier_outranks_normal_logins() {
        let mut rows: Vec<_> = (0..40)
            .map(|i| json!({"user_id": format!("u{i}"), "logins": 5 + i % 4, "failures": i % 2}))
            .collect();
        rows.push(json!({"user_id": "intruder", "logins": 500, "failures": 90}));
        let ctx = ExecutionContext::lightweight(Dataset::from_json_rows(&rows).unwrap());

        for mut model in [AutoencoderModel::dense(), AutoencoderModel::absolute()] {
            model.train(&ctx).unwrap();
            let frame = model.infer(&ctx).unwrap();
            let (outlier, normal): (Vec<_>, Vec<_>) = frame
                .records()
                .iter()
                .partition(|r| r.entity_id == "intruder");
            let outlier_risk = outlier[0].risk_score();
            for record in normal {
                assert!(
                    record.risk_score() < outlier_risk,
                    "{}: {} scored {} vs outlier {outlier_risk}",
                    model.name(),
                    record.entity_id,
                    record.risk_score()
                );
            }
        }
    }

    #[test]
    fn test_train_then_infer() {
        let mut model = AutoencoderModel::dense();
        let ctx = ExecutionContext::lightweight(dataset(4));

        let result = model.train(&ctx).unwrap();
        assert_eq!(result.status, TrainingStatus::Success);
        assert_eq!(model.state().expected_width(), 4);

        let frame = model.infer(&ctx).unwrap();
        assert_eq!(frame.len(), 20);
        assert_eq!(frame.records()[3].entity_id, "e3");
        for record in frame.records() {
            assert!((0.0..=100.0).contains(&record.risk_score()));
            assert!(record.details.contains_key("mse"));
        }
    }

    #[test]
    fn test_synthetic_training_on_empty_dataset() {
        let mut model = AutoencoderModel::absolute();
        let (ctx, sink) = ExecutionContext::capturing(Dataset::empty());

        let result = model.train(&ctx).unwrap();
        assert_eq!(result.status, TrainingStatus::Warning);
        assert_eq!(model.state().expected_width(), 10);
        assert!(sink.contains(tracing::Level::WARN, "synthetic 100x10"));
    }

    #[test]
    fn test_empty_inference_returns_empty_frame() {
        let mut model = AutoencoderModel::dense();
        let (ctx, sink) = ExecutionContext::capturing(Dataset::empty());
        assert!(model.infer(&ctx).unwrap().is_empty());
        assert_eq!(model.lifecycle_state(), LifecycleState::Uninitialized);
        assert_eq!(sink.warnings().len(), 1);
    }

    #[test]
    fn test_narrow_input_is_padded() {
        let mut model = AutoencoderModel::dense();
        model.train(&ExecutionContext::lightweight(dataset(5))).unwrap();

        let (ctx, sink) = ExecutionContext::capturing(dataset(3));
        let frame = model.infer(&ctx).unwrap();
        assert_eq!(frame.len(), 20);
        assert!(sink.contains(tracing::Level::WARN, "padding with 2 zero columns"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(AutoencoderModel::new(AutoencoderConfig::dense().with_input_width(0)).is_err());
    }
}
