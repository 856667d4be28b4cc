//! Prelude for commonly used types and traits in riskgate.

pub use crate::core::{
    CompatibilityShim, Dataset, ExecutionContext, LegacyResponse, LifecycleState, ModelFamily,
    ModelPlugin, Parameters, RiskFrame, RiskRecord, TrainingResult,
};
pub use crate::error::{ErrorContext, Result, RiskError};
pub use crate::formatters::{FormatterConfig, ResultFormatter};
pub use crate::logging::LogConfig;
pub use crate::plugins::ModelRegistry;
pub use crate::runner::ModelRunner;
pub use crate::sources::{DataSource, SourceDescriptor};
