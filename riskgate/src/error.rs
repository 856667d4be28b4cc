//! Error types for the riskgate plugin contract.
//!
//! All fallible operations in the crate return [`RiskError`] through the
//! [`Result`] alias. Variants map onto the error taxonomy of the lifecycle:
//! configuration problems fail fast, missing data is reported with the
//! requirement that was not met, and upstream failures keep their source.

use thiserror::Error;

/// The main error type for riskgate.
#[derive(Error, Debug)]
pub enum RiskError {
    /// A required parameter is missing or has the wrong type.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The plugin needs data it did not receive.
    #[error("No data available: {requirement}")]
    NoData {
        /// What the plugin needed (e.g. "numeric training data").
        requirement: String,
    },

    /// The data exists but cannot be used by the algorithm.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Error from a data source collaborator.
    #[error("Data source error ({source_type}): {message}")]
    DataSource {
        /// Kind of source (e.g. "table", "index", "local_csv")
        source_type: String,
        /// Detailed error message
        message: String,
        /// Optional underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Failure reported by an estimator at the algorithm boundary.
    #[error("Estimator '{estimator}' failed: {message}")]
    Estimator {
        /// Name of the estimator
        estimator: String,
        /// Detailed error message
        message: String,
    },

    /// Error from Arrow operations.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Error from DataFusion operations.
    #[error("DataFusion error: {0}")]
    DataFusion(#[from] datafusion::error::DataFusionError),

    /// Error from serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Error from I/O operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Input rejected by the security validators.
    #[error("Security error: {0}")]
    SecurityError(String),

    /// Generic internal error for unexpected conditions.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A type alias for `Result<T, RiskError>`.
pub type Result<T> = std::result::Result<T, RiskError>;

impl RiskError {
    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates a missing-data error naming the unmet requirement.
    pub fn no_data(requirement: impl Into<String>) -> Self {
        Self::NoData {
            requirement: requirement.into(),
        }
    }

    /// Creates a new data source error.
    pub fn data_source(source_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DataSource {
            source_type: source_type.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new data source error with a source error.
    pub fn data_source_with_source(
        source_type: impl Into<String>,
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::DataSource {
            source_type: source_type.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    /// Creates an estimator error.
    pub fn estimator(estimator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Estimator {
            estimator: estimator.into(),
            message: message.into(),
        }
    }

    /// Whether this error was raised before any data was touched.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::SecurityError(_))
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, msg: &str) -> Result<T>;

    /// Adds context with a lazy message.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<RiskError>,
{
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| match e.into() {
            RiskError::Internal(inner) => RiskError::Internal(format!("{msg}: {inner}")),
            other => RiskError::Internal(format!("{msg}: {other}")),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let msg = f();
            match e.into() {
                RiskError::Internal(inner) => RiskError::Internal(format!("{msg}: {inner}")),
                other => RiskError::Internal(format!("{msg}: {other}")),
            }
        })
    }
}
