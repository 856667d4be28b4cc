//! Core types of the model lifecycle contract.
//!
//! ## Overview
//!
//! - **[`ExecutionContext`]**: dataset, parameters and log sink for one call
//! - **[`DimensionReconciler`]**: aligns feature matrices to a model's width
//! - **[`IdentityResolver`]**: one entity identifier per row
//! - **[`ModelPlugin`]**: the `train`/`infer` contract and its [`ModelState`]
//! - **[`CompatibilityShim`]**: the legacy single-call surface
//! - **[`ResultAssembler`]**: builds the uniform [`RiskFrame`] output
//!
//! ## Data flow
//!
//! ```text
//! Dataset ──▶ FeatureMatrix ──▶ DimensionReconciler ──▶ fitted model ──▶ RawSignal
//!    │                                                                      │
//!    └──▶ IdentityResolver ──▶ EntityId ──┐                        RiskNormalizer
//!                                         ▼                                 │
//!                                  ResultAssembler ◀────────────────────────┘
//!                                         │
//!                                         ▼
//!                                     RiskFrame
//! ```

pub mod assembler;
pub mod context;
pub mod dataset;
pub mod identity;
pub mod lifecycle;
pub mod log_sink;
pub mod matrix;
pub mod parameters;
pub mod record;
pub mod shim;

pub use assembler::{output_schema, ResultAssembler, RiskFrame};
pub use context::{ExecutionContext, ExecutionContextBuilder};
pub use dataset::Dataset;
pub use identity::{synthetic_id, IdentityResolver, IDENTITY_COLUMNS};
pub use lifecycle::{
    LifecycleState, ModelFamily, ModelPlugin, ModelState, TrainingResult, TrainingStatus,
};
pub use log_sink::{LogRecord, LogSink, MemorySink, TracingSink};
pub use matrix::{reconcile_width, DimensionReconciler, FeatureMatrix, WidthAdjustment};
pub use parameters::Parameters;
pub use record::{clamp_risk, RiskRecord, MAX_RISK, MIN_RISK, NORMAL};
pub use shim::{CompatibilityShim, LegacyResponse, LegacyStatus};
