//! The read-only view handed to every lifecycle call.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::dataset::Dataset;
use super::log_sink::{LogSink, MemorySink, TracingSink};
use super::parameters::Parameters;

/// Dataset, parameters and log sink for one plugin call.
///
/// The caller owns the context for the duration of the call; plugins only
/// ever see `&ExecutionContext`. An absent dataset and a dataset with zero
/// rows are both the *empty* case, which is not an error by itself.
///
/// # Examples
///
/// ```rust
/// use riskgate::core::{Dataset, ExecutionContext, Parameters};
/// use serde_json::json;
///
/// let dataset = Dataset::from_json_rows(&[json!({"entity_id": "a", "bytes": 10})]).unwrap();
/// let ctx = ExecutionContext::builder()
///     .dataset(dataset)
///     .parameters(Parameters::new().with("threshold", 5))
///     .build();
///
/// assert_eq!(ctx.row_count(), 1);
/// assert!(!ctx.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    dataset: Option<Dataset>,
    parameters: Parameters,
    log_sink: Arc<dyn LogSink>,
    started_at: DateTime<Utc>,
}

impl ExecutionContext {
    pub fn builder() -> ExecutionContextBuilder {
        ExecutionContextBuilder::default()
    }

    /// The shared lightweight context: `dataset`, no parameters, tracing sink.
    ///
    /// The compatibility shim and the test suite both build contexts through
    /// this constructor.
    pub fn lightweight(dataset: Dataset) -> Self {
        Self::builder().dataset(dataset).build()
    }

    /// A context with no dataset at all.
    pub fn empty() -> Self {
        Self::builder().build()
    }

    /// Like [`lightweight`](Self::lightweight), but logging into a returned
    /// [`MemorySink`].
    pub fn capturing(dataset: Dataset) -> (Self, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let ctx = Self::builder()
            .dataset(dataset)
            .log_sink(sink.clone())
            .build();
        (ctx, sink)
    }

    /// Returns a copy of this context with `parameters` replacing the current ones.
    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    /// The dataset, unless it is absent or has zero rows.
    pub fn non_empty_dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref().filter(|dataset| !dataset.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.non_empty_dataset().is_none()
    }

    pub fn row_count(&self) -> usize {
        self.dataset.as_ref().map_or(0, Dataset::num_rows)
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// The sink plugins log through.
    pub fn log(&self) -> &dyn LogSink {
        self.log_sink.as_ref()
    }

    pub fn log_sink(&self) -> Arc<dyn LogSink> {
        Arc::clone(&self.log_sink)
    }

    /// When the context was built. Corpus-level records use this as their timestamp.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

/// Builder for [`ExecutionContext`].
#[derive(Debug, Default)]
pub struct ExecutionContextBuilder {
    dataset: Option<Dataset>,
    parameters: Parameters,
    log_sink: Option<Arc<dyn LogSink>>,
    started_at: Option<DateTime<Utc>>,
}

impl ExecutionContextBuilder {
    pub fn dataset(mut self, dataset: Dataset) -> Self {
        self.dataset = Some(dataset);
        self
    }

    pub fn maybe_dataset(mut self, dataset: Option<Dataset>) -> Self {
        self.dataset = dataset;
        self
    }

    pub fn parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn parameter(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.parameters.insert(key, value);
        self
    }

    pub fn log_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.log_sink = Some(sink);
        self
    }

    pub fn started_at(mut self, started_at: DateTime<Utc>) -> Self {
        self.started_at = Some(started_at);
        self
    }

    /// Builds the context. Without an explicit sink, messages go to `tracing`.
    pub fn build(self) -> ExecutionContext {
        ExecutionContext {
            dataset: self.dataset,
            parameters: self.parameters,
            log_sink: self
                .log_sink
                .unwrap_or_else(|| Arc::new(TracingSink::default())),
            started_at: self.started_at.unwrap_or_else(Utc::now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_and_zero_row_datasets_are_empty() {
        assert!(ExecutionContext::empty().is_empty());
        assert!(ExecutionContext::lightweight(Dataset::empty()).is_empty());
        assert_eq!(ExecutionContext::empty().row_count(), 0);
    }

    #[test]
    fn test_capturing_context_records_messages() {
        let dataset = Dataset::from_json_rows(&[json!({"x": 1})]).unwrap();
        let (ctx, sink) = ExecutionContext::capturing(dataset);
        ctx.log().warn("width mismatch");
        assert_eq!(sink.warnings(), vec!["width mismatch".to_string()]);
        assert_eq!(ctx.row_count(), 1);
    }

    #[test]
    fn test_builder_parameters() {
        let ctx = ExecutionContext::builder()
            .parameter("threshold", 3)
            .build();
        assert_eq!(ctx.parameters().get_u64("threshold").unwrap(), Some(3));
        assert!(ctx.dataset().is_none());
    }
}
