//! Corpus-volume check.

use serde::{Deserialize, Serialize};

use crate::core::parameters::THRESHOLD;
use crate::core::{
    ExecutionContext, ModelFamily, ModelPlugin, ModelState, RiskFrame, RiskRecord, TrainingResult,
};
use crate::error::Result;
use crate::scoring::{volume_risk, DEFAULT_VOLUME_THRESHOLD};

pub const SLUG: &str = "volume-check";

/// Configuration of the volume check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeCheckConfig {
    /// Row count above which the corpus is flagged.
    pub threshold: u64,
}

impl Default for VolumeCheckConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_VOLUME_THRESHOLD,
        }
    }
}

impl VolumeCheckConfig {
    pub fn with_threshold(mut self, threshold: u64) -> Self {
        self.threshold = threshold;
        self
    }
}

/// Flags a dataset whose row count exceeds a threshold.
///
/// Emits at most one record per call, for the corpus as a whole. The
/// `threshold` parameter overrides the configured value for one call.
#[derive(Debug, Clone)]
pub struct VolumeCheckModel {
    config: VolumeCheckConfig,
    state: ModelState,
}

impl VolumeCheckModel {
    pub fn new(config: VolumeCheckConfig) -> Self {
        Self {
            config,
            state: ModelState::new(1),
        }
    }

    pub fn config(&self) -> &VolumeCheckConfig {
        &self.config
    }
}

impl Default for VolumeCheckModel {
    fn default() -> Self {
        Self::new(VolumeCheckConfig::default())
    }
}

impl ModelPlugin for VolumeCheckModel {
    fn name(&self) -> &str {
        SLUG
    }

    fn family(&self) -> ModelFamily {
        ModelFamily::CorpusVolume
    }

    fn train(&mut self, _ctx: &ExecutionContext) -> Result<TrainingResult> {
        self.state.mark_trained(1);
        Ok(TrainingResult::no_training_required(SLUG))
    }

    fn infer(&mut self, ctx: &ExecutionContext) -> Result<RiskFrame> {
        let threshold = ctx
            .parameters()
            .get_u64(THRESHOLD)?
            .unwrap_or(self.config.threshold);
        let source = ctx.parameters().get_str("source")?;

        if !self.state.is_fitted() {
            self.state.mark_lazily_trained(1);
        }

        if ctx.is_empty() {
            ctx.log().warn("volume check received an empty dataset");
            return Ok(RiskFrame::empty());
        }

        let row_count = ctx.row_count() as u64;
        ctx.log()
            .info(&format!("volume check: {row_count} rows against threshold {threshold}"));

        let Some(risk) = volume_risk(row_count, threshold) else {
            return Ok(RiskFrame::empty());
        };

        let mut record = RiskRecord::new("system", risk.risk_score, risk.anomaly_type)
            .with_entity_type("data_volume")
            .with_timestamp(ctx.started_at());
        record.details = risk.details;
        if let Some(source) = source {
            record = record.with_detail("source", source);
        }
        Ok(RiskFrame::new(vec![record]))
    }

    fn state(&self) -> &ModelState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Dataset, LifecycleState, Parameters};
    use serde_json::json;

    fn rows(n: usize) -> Dataset {
        let rows: Vec<_> = (0..n).map(|i| json!({"bytes": i})).collect();
        Dataset::from_json_rows(&rows).unwrap()
    }

    #[test]
    fn test_threshold_parameter_overrides_config() {
        let mut model = VolumeCheckModel::default();
        let ctx = ExecutionContext::lightweight(rows(6))
            .with_parameters(Parameters::new().with(THRESHOLD, 5).with("source", "auth_logs"));

        let frame = model.infer(&ctx).unwrap();
        assert_eq!(frame.len(), 1);
        let record = &frame.records()[0];
        assert_eq!(record.entity_id, "system");
        assert_eq!(record.entity_type.as_deref(), Some("data_volume"));
        assert_eq!(record.risk_score(), 70.0);
        assert_eq!(record.anomaly_type(), "high_data_volume");
        assert_eq!(record.timestamp, Some(ctx.started_at()));
        assert_eq!(record.details["row_count"], json!(6));
        assert_eq!(record.details["threshold"], json!(5));
        assert_eq!(record.details["source"], json!("auth_logs"));
    }

    fn counter_rows(n: usize) -> Dataset {
        let values = arrow::array::Int64Array::from_iter_values(0..n as i64);
        let batch = arrow::array::RecordBatch::try_from_iter(vec![(
            "bytes",
            std::sync::Arc::new(values) as arrow::array::ArrayRef,
        )])
        .unwrap();
        Dataset::new(batch)
    }

    #[test]
    fn test_default_threshold_boundary() {
        let mut model = VolumeCheckModel::default();
        let params = Parameters::new().with("source", "auth_logs");

        let ctx = ExecutionContext::lightweight(counter_rows(10_001)).with_parameters(params.clone());
        let frame = model.infer(&ctx).unwrap();
        assert_eq!(frame.len(), 1);
        let record = &frame.records()[0];
        assert_eq!(record.entity_id, "system");
        assert_eq!(record.risk_score(), 70.0);
        assert_eq!(record.anomaly_type(), "high_data_volume");
        assert_eq!(record.timestamp, Some(ctx.started_at()));
        assert_eq!(record.details["row_count"], json!(10_001));
        assert_eq!(record.details["threshold"], json!(10_000));
        assert_eq!(record.details["source"], json!("auth_logs"));

        let ctx = ExecutionContext::lightweight(counter_rows(10_000)).with_parameters(params);
        assert!(model.infer(&ctx).unwrap().is_empty());
    }

    #[test]
    fn test_at_threshold_is_quiet() {
        let mut model = VolumeCheckModel::new(VolumeCheckConfig::default().with_threshold(6));
        let frame = model.infer(&ExecutionContext::lightweight(rows(6))).unwrap();
        assert!(frame.is_empty());
    }

    #[test]
    fn test_bad_threshold_fails_before_data() {
        let mut model = VolumeCheckModel::default();
        let ctx = ExecutionContext::empty().with_parameters(Parameters::new().with(THRESHOLD, "many"));
        assert!(model.infer(&ctx).unwrap_err().is_configuration());
    }

    #[test]
    fn test_empty_dataset_warns() {
        let mut model = VolumeCheckModel::default();
        let (ctx, sink) = ExecutionContext::capturing(Dataset::empty());
        assert!(model.infer(&ctx).unwrap().is_empty());
        assert_eq!(sink.warnings().len(), 1);
    }

    #[test]
    fn test_lifecycle_states() {
        let mut model = VolumeCheckModel::default();
        assert_eq!(model.lifecycle_state(), LifecycleState::Uninitialized);

        let result = model.train(&ExecutionContext::empty()).unwrap();
        assert!(result.is_success());
        assert_eq!(result.message.as_deref(), Some("no training required"));
        assert_eq!(model.lifecycle_state(), LifecycleState::Trained);
    }
}
