//! The two-phase plugin lifecycle.
//!
//! Every plugin moves through a small state machine:
//!
//! ```text
//! Uninitialized ──train──▶ Trained
//!       │
//!       └──first infer──▶ LazilyTrained
//! ```
//!
//! There is no terminal state. A plugin keeps its [`ModelState`] for its whole
//! lifetime and can be asked to `infer` any number of times; `train` may be
//! called again to refit.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::assembler::RiskFrame;
use super::context::ExecutionContext;
use crate::error::Result;

/// Where a plugin is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Constructed, never trained or used.
    Uninitialized,
    /// Fitted through an explicit `train` call.
    Trained,
    /// Fitted implicitly by the first `infer` call.
    LazilyTrained,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Trained => "trained",
            Self::LazilyTrained => "lazily_trained",
        };
        f.write_str(name)
    }
}

/// Fitted flag plus the feature width the model was fitted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelState {
    lifecycle: LifecycleState,
    expected_width: usize,
}

impl ModelState {
    /// A fresh, unfitted state with a provisional width. Widths below 1 are raised to 1.
    pub fn new(initial_width: usize) -> Self {
        Self {
            lifecycle: LifecycleState::Uninitialized,
            expected_width: initial_width.max(1),
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.lifecycle != LifecycleState::Uninitialized
    }

    pub fn lifecycle(&self) -> LifecycleState {
        self.lifecycle
    }

    pub fn expected_width(&self) -> usize {
        self.expected_width
    }

    /// Records an explicit fit on a matrix of `width` columns.
    pub fn mark_trained(&mut self, width: usize) {
        self.lifecycle = LifecycleState::Trained;
        self.expected_width = width.max(1);
    }

    /// Records an implicit fit performed by `infer`.
    pub fn mark_lazily_trained(&mut self, width: usize) {
        self.lifecycle = LifecycleState::LazilyTrained;
        self.expected_width = width.max(1);
    }
}

/// The algorithm families sharing the lifecycle contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    /// Row-count heuristic, no fitting.
    CorpusVolume,
    /// Outlier verdict plus decision score.
    DecisionBoundary,
    /// Reconstruction error of an autoencoder.
    ReconstructionError,
    /// Graph centrality.
    Centrality,
}

impl ModelFamily {
    /// Whether `infer` on an empty dataset is a hard error for this family.
    pub fn requires_data(&self) -> bool {
        matches!(self, Self::DecisionBoundary)
    }

    /// Whether `train` fits anything.
    pub fn is_trainable(&self) -> bool {
        !matches!(self, Self::CorpusVolume)
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CorpusVolume => "corpus_volume",
            Self::DecisionBoundary => "decision_boundary",
            Self::ReconstructionError => "reconstruction_error",
            Self::Centrality => "centrality",
        };
        f.write_str(name)
    }
}

/// Outcome status of a `train` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainingStatus {
    Success,
    Warning,
}

/// What a `train` call reports back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingResult {
    pub status: TrainingStatus,
    pub model_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub metrics: BTreeMap<String, Value>,
}

impl TrainingResult {
    pub fn success(model_type: impl Into<String>) -> Self {
        Self {
            status: TrainingStatus::Success,
            model_type: model_type.into(),
            message: None,
            metrics: BTreeMap::new(),
        }
    }

    pub fn warning(model_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: TrainingStatus::Warning,
            model_type: model_type.into(),
            message: Some(message.into()),
            metrics: BTreeMap::new(),
        }
    }

    /// The result of inference-only families.
    pub fn no_training_required(model_type: impl Into<String>) -> Self {
        Self::success(model_type).with_message("no training required")
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_metric(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metrics.insert(name.into(), value.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == TrainingStatus::Success
    }
}

/// The contract every plugin implements.
///
/// Calls are synchronous. Implementations own their state and are not shared
/// across concurrent callers; the runner serializes calls on one instance.
pub trait ModelPlugin: Send + fmt::Debug {
    /// Registry slug of the plugin.
    fn name(&self) -> &str;

    fn family(&self) -> ModelFamily;

    /// Fits the plugin on the numeric features of `ctx`.
    fn train(&mut self, ctx: &ExecutionContext) -> Result<TrainingResult>;

    /// Scores `ctx`, fitting lazily on its data when `train` was skipped.
    fn infer(&mut self, ctx: &ExecutionContext) -> Result<RiskFrame>;

    fn state(&self) -> &ModelState;

    fn lifecycle_state(&self) -> LifecycleState {
        self.state().lifecycle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_state_transitions() {
        let mut state = ModelState::new(10);
        assert!(!state.is_fitted());
        assert_eq!(state.lifecycle(), LifecycleState::Uninitialized);
        assert_eq!(state.expected_width(), 10);

        state.mark_lazily_trained(4);
        assert!(state.is_fitted());
        assert_eq!(state.lifecycle(), LifecycleState::LazilyTrained);
        assert_eq!(state.expected_width(), 4);

        state.mark_trained(6);
        assert_eq!(state.lifecycle(), LifecycleState::Trained);
        assert_eq!(state.expected_width(), 6);
    }

    #[test]
    fn test_width_never_below_one() {
        assert_eq!(ModelState::new(0).expected_width(), 1);
    }

    #[test]
    fn test_training_result_serialization() {
        let result = TrainingResult::no_training_required("volume-check");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["message"], "no training required");

        let warning = TrainingResult::warning("pagerank-centrality", "fewer than 2 columns");
        assert!(!warning.is_success());
    }

    #[test]
    fn test_family_requirements() {
        assert!(ModelFamily::DecisionBoundary.requires_data());
        assert!(!ModelFamily::CorpusVolume.requires_data());
        assert!(!ModelFamily::CorpusVolume.is_trainable());
        assert_eq!(ModelFamily::Centrality.to_string(), "centrality");
    }
}
