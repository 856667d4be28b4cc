//! Isolation-forest plugin (decision-boundary family).

use serde::{Deserialize, Serialize};

use super::score_rows;
use crate::core::{
    DimensionReconciler, ExecutionContext, FeatureMatrix, ModelFamily, ModelPlugin, ModelState,
    RiskFrame, TrainingResult,
};
use crate::error::{Result, RiskError};
use crate::estimators::{IsolationForest, IsolationForestParams, OutlierEstimator};
use crate::scoring::{FamilyProfile, RawSignal, RiskNormalizer};
use crate::security::InputValidator;

pub const SLUG: &str = "isolation-forest";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct IsolationForestConfig {
    pub forest: IsolationForestParams,
}

impl IsolationForestConfig {
    pub fn with_contamination(mut self, contamination: f64) -> Self {
        self.forest.contamination = contamination;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.forest.seed = seed;
        self
    }

    pub fn with_estimators(mut self, n_estimators: usize) -> Self {
        self.forest.n_estimators = n_estimators;
        self
    }

    /// Contamination must lie in `(0, 0.5]`; tree and sample counts must be positive.
    pub fn validate(&self) -> Result<()> {
        InputValidator::validate_fraction(self.forest.contamination, 0.0, 0.5, "contamination")?;
        if self.forest.contamination == 0.0 {
            return Err(RiskError::configuration(
                "Invalid contamination value: must be greater than 0",
            ));
        }
        InputValidator::validate_positive(self.forest.n_estimators, "n_estimators")?;
        InputValidator::validate_positive(self.forest.max_samples, "max_samples")
    }
}

/// Scores rows by how easily an isolation forest separates them.
///
/// Needs real data: both `train` and `infer` fail with
/// [`RiskError::NoData`] on an empty dataset. When `train` was skipped, the
/// first `infer` fits on the inference data and logs a warning.
#[derive(Debug)]
pub struct IsolationForestModel {
    config: IsolationForestConfig,
    forest: IsolationForest,
    normalizer: RiskNormalizer,
    state: ModelState,
}

impl IsolationForestModel {
    pub fn new(config: IsolationForestConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            forest: IsolationForest::new(config.forest.clone()),
            config,
            normalizer: RiskNormalizer::new(FamilyProfile::decision_boundary()),
            state: ModelState::new(1),
        })
    }

    pub fn config(&self) -> &IsolationForestConfig {
        &self.config
    }

    fn training_matrix(ctx: &ExecutionContext, phase: &str) -> Result<FeatureMatrix> {
        let dataset = ctx.non_empty_dataset().ok_or_else(|| {
            RiskError::no_data(format!("isolation forest requires numeric {phase} data"))
        })?;
        let matrix = dataset.feature_matrix()?;
        if matrix.width() == 0 {
            return Err(RiskError::no_data(format!(
                "isolation forest requires at least one numeric column in the {phase} data"
            )));
        }
        Ok(matrix)
    }
}

impl Default for IsolationForestModel {
    fn default() -> Self {
        Self {
            config: IsolationForestConfig::default(),
            forest: IsolationForest::default(),
            normalizer: RiskNormalizer::new(FamilyProfile::decision_boundary()),
            state: ModelState::new(1),
        }
    }
}

impl ModelPlugin for IsolationForestModel {
    fn name(&self) -> &str {
        SLUG
    }

    fn family(&self) -> ModelFamily {
        ModelFamily::DecisionBoundary
    }

    fn train(&mut self, ctx: &ExecutionContext) -> Result<TrainingResult> {
        let matrix = Self::training_matrix(ctx, "training")?;
        self.forest.fit(matrix.view())?;
        self.state.mark_trained(matrix.width());

        ctx.log().info(&format!(
            "isolation forest trained on {} rows x {} features",
            matrix.rows(),
            matrix.width()
        ));
        Ok(TrainingResult::success(SLUG)
            .with_metric("rows", matrix.rows())
            .with_metric("features", matrix.width())
            .with_metric("offset", self.forest.offset()))
    }

    fn infer(&mut self, ctx: &ExecutionContext) -> Result<RiskFrame> {
        let matrix = Self::training_matrix(ctx, "inference")?;

        if !self.state.is_fitted() {
            ctx.log()
                .warn("isolation forest is not trained; fitting on the inference data");
            self.forest.fit(matrix.view())?;
            self.state.mark_lazily_trained(matrix.width());
        }

        let matrix = DimensionReconciler::new(self.state.expected_width())?.reconcile(matrix, ctx.log());
        let scores = self.forest.decision_function(matrix.view())?;
        let verdicts = self.forest.predict(matrix.view())?;
        let signals = scores
            .into_iter()
            .zip(verdicts)
            .map(|(score, outlier)| RawSignal::new(score).with_verdict(outlier))
            .collect();
        score_rows(ctx, &self.normalizer, signals)
    }

    fn state(&self) -> &ModelState {
        &self.state
    }
}
