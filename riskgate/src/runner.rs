//! Orchestration of data loading and plugin lifecycles.
//!
//! The runner owns the DataFusion session used by the data sources and the
//! registry used to instantiate plugins by slug. Loading is async; the
//! lifecycle calls themselves are synchronous.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use datafusion::prelude::SessionContext;
use serde_json::Value;
use tracing::{debug, error, info, instrument};

use crate::core::{
    Dataset, ExecutionContext, LegacyResponse, LifecycleState, LogSink, ModelPlugin, Parameters,
    RiskFrame, TracingSink, TrainingResult,
};
use crate::error::Result;
use crate::plugins::ModelRegistry;
use crate::sources::{DataSource, SourceDescriptor};

/// Outcome of one plugin run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub model: String,
    /// Present when the run included a `train` call.
    pub training: Option<TrainingResult>,
    pub frame: RiskFrame,
    pub lifecycle: LifecycleState,
}

impl RunReport {
    pub fn max_risk(&self) -> Option<f64> {
        self.frame.max_risk()
    }

    pub fn anomaly_count(&self) -> usize {
        self.frame.anomalies().count()
    }
}

/// One plugin's entry in a [`Comparison`].
#[derive(Debug, Clone)]
pub struct ComparisonEntry {
    pub model: String,
    pub outcome: std::result::Result<RunReport, String>,
}

/// Plugins ranked by their highest risk score.
///
/// Successful runs come first, highest risk first; a run with an empty frame
/// ranks below any run with records. Failed runs follow in request order.
#[derive(Debug, Clone, Default)]
pub struct Comparison {
    entries: Vec<ComparisonEntry>,
}

impl Comparison {
    fn new(mut entries: Vec<ComparisonEntry>) -> Self {
        // stable: ties keep request order
        entries.sort_by(|a, b| match (&a.outcome, &b.outcome) {
            (Ok(a), Ok(b)) => rank_key(b).partial_cmp(&rank_key(a)).unwrap_or(Ordering::Equal),
            (Ok(_), Err(_)) => Ordering::Less,
            (Err(_), Ok(_)) => Ordering::Greater,
            (Err(_), Err(_)) => Ordering::Equal,
        });
        Self { entries }
    }

    pub fn entries(&self) -> &[ComparisonEntry] {
        &self.entries
    }

    /// The highest ranked successful run.
    pub fn best(&self) -> Option<&RunReport> {
        self.entries.first().and_then(|entry| entry.outcome.as_ref().ok())
    }

    /// Successful runs in rank order.
    pub fn reports(&self) -> impl Iterator<Item = &RunReport> {
        self.entries.iter().filter_map(|entry| entry.outcome.as_ref().ok())
    }

    /// `(model, error)` for every failed run.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().filter_map(|entry| match &entry.outcome {
            Err(e) => Some((entry.model.as_str(), e.as_str())),
            Ok(_) => None,
        })
    }
}

fn rank_key(report: &RunReport) -> f64 {
    report.max_risk().unwrap_or(f64::NEG_INFINITY)
}

/// Loads data and drives plugins through their lifecycle.
///
/// # Examples
///
/// ```rust,no_run
/// use riskgate::prelude::*;
/// use serde_json::json;
///
/// # async fn example() -> riskgate::error::Result<()> {
/// let runner = ModelRunner::new();
/// let mut plugin = runner.registry().create("volume-check")?;
/// let response = runner
///     .execute_legacy(plugin.as_mut(), &json!({"data_source": "table", "table_name": "auth_events"}))
///     .await;
/// println!("{}", response.to_json());
/// # Ok(())
/// # }
/// ```
pub struct ModelRunner {
    session: SessionContext,
    registry: ModelRegistry,
    log_sink: Arc<dyn LogSink>,
}

impl fmt::Debug for ModelRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRunner")
            .field("session_id", &self.session.session_id())
            .field("registry", &self.registry)
            .field("log_sink", &self.log_sink)
            .finish()
    }
}

impl Default for ModelRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelRunner {
    /// A runner with a fresh session, the built-in registry and a tracing sink.
    pub fn new() -> Self {
        Self {
            session: SessionContext::new(),
            registry: ModelRegistry::builtin(),
            log_sink: Arc::new(TracingSink::default()),
        }
    }

    /// Uses `session`, e.g. one with tables already registered.
    pub fn with_session(mut self, session: SessionContext) -> Self {
        self.session = session;
        self
    }

    pub fn with_registry(mut self, registry: ModelRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Sink handed to every context the runner builds.
    pub fn with_log_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.log_sink = sink;
        self
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Materializes the dataset a descriptor points at.
    ///
    /// # Errors
    ///
    /// Source failures are propagated unchanged.
    #[instrument(skip(self, descriptor), fields(source = %descriptor.description()))]
    pub async fn load(&self, descriptor: &SourceDescriptor) -> Result<Dataset> {
        let dataset = descriptor.load(&self.session).await?;
        debug!(rows = dataset.num_rows(), columns = dataset.num_columns(), "source loaded");
        Ok(dataset)
    }

    /// Builds the context for one lifecycle call.
    pub fn context(&self, dataset: Option<Dataset>, parameters: Parameters) -> ExecutionContext {
        ExecutionContext::builder()
            .maybe_dataset(dataset)
            .parameters(parameters)
            .log_sink(Arc::clone(&self.log_sink))
            .build()
    }

    /// Runs `infer` on `dataset`, preceded by `train` on the same data when
    /// `train` is set.
    pub fn run(
        &self,
        plugin: &mut dyn ModelPlugin,
        dataset: Dataset,
        parameters: Parameters,
        train: bool,
    ) -> Result<RunReport> {
        let ctx = self.context(Some(dataset), parameters);
        let training = if train {
            let result = plugin.train(&ctx)?;
            debug!(model = plugin.name(), status = ?result.status, "trained");
            Some(result)
        } else {
            None
        };
        let frame = plugin.infer(&ctx)?;
        info!(
            model = plugin.name(),
            rows = ctx.row_count(),
            records = frame.len(),
            "inference finished"
        );
        Ok(RunReport {
            model: plugin.name().to_string(),
            training,
            frame,
            lifecycle: plugin.lifecycle_state(),
        })
    }

    /// Trains and runs each plugin named in `slugs` on `dataset`.
    ///
    /// Parameters configure each plugin and are passed to its calls. A plugin
    /// that cannot be created or fails is recorded, and the comparison goes on.
    #[instrument(skip(self, dataset, parameters), fields(models = slugs.len()))]
    pub fn compare(&self, slugs: &[&str], dataset: &Dataset, parameters: &Parameters) -> Comparison {
        let entries = slugs
            .iter()
            .map(|slug| {
                let outcome = self
                    .registry
                    .create_with(slug, parameters)
                    .and_then(|mut plugin| {
                        self.run(plugin.as_mut(), dataset.clone(), parameters.clone(), true)
                    })
                    .map_err(|e| {
                        error!(model = *slug, error = %e, "model failed during comparison");
                        e.to_string()
                    });
                ComparisonEntry {
                    model: slug.to_string(),
                    outcome,
                }
            })
            .collect();
        Comparison::new(entries)
    }

    /// The legacy `execute(input)` call: parse the source fields of `input`,
    /// load, infer, and wrap the anomalous records in the envelope.
    ///
    /// All fields of `input` are passed as call parameters. Failures at any
    /// step become the error envelope.
    pub async fn execute_legacy(&self, plugin: &mut dyn ModelPlugin, input: &Value) -> LegacyResponse {
        match self.try_execute_legacy(plugin, input).await {
            Ok(response) => response,
            Err(e) => {
                error!(model = plugin.name(), error = %e, "model execution failed");
                LegacyResponse::error(e.to_string())
            }
        }
    }

    async fn try_execute_legacy(&self, plugin: &mut dyn ModelPlugin, input: &Value) -> Result<LegacyResponse> {
        let descriptor = SourceDescriptor::from_legacy(input)?;
        let mut parameters = Parameters::from_json(input)?;
        if !parameters.contains("source") {
            parameters.insert("source", descriptor.description());
        }

        let dataset = self.load(&descriptor).await?;
        let rows = dataset.num_rows();
        let ctx = self.context(Some(dataset), parameters);
        let frame = plugin.infer(&ctx)?;

        let response = LegacyResponse::success(frame.anomalies(), rows);
        info!(
            model = plugin.name(),
            anomalies = response.anomalies.len(),
            "model execution completed"
        );
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{LegacyStatus, MemorySink};
    use serde_json::json;

    fn login_rows() -> Dataset {
        let mut rows: Vec<_> = (0..40)
            .map(|i| json!({"user_id": format!("u{i}"), "logins": 5 + i % 4, "failures": i % 2}))
            .collect();
        rows.push(json!({"user_id": "mallory", "logins": 500, "failures": 90}));
        Dataset::from_json_rows(&rows).unwrap()
    }

    #[test]
    fn test_run_with_training() {
        let runner = ModelRunner::new();
        let mut plugin = runner.registry().create("isolation-forest").unwrap();
        let report = runner
            .run(plugin.as_mut(), login_rows(), Parameters::new(), true)
            .unwrap();
        assert_eq!(report.model, "isolation-forest");
        assert!(report.training.is_some());
        assert_eq!(report.lifecycle, LifecycleState::Trained);
        assert_eq!(report.frame.len(), 41);
    }

    #[test]
    fn test_run_uses_runner_sink() {
        let sink = Arc::new(MemorySink::new());
        let runner = ModelRunner::new().with_log_sink(sink.clone());
        let mut plugin = runner.registry().create("isolation-forest").unwrap();
        runner
            .run(plugin.as_mut(), login_rows(), Parameters::new(), false)
            .unwrap();
        assert!(sink.contains(tracing::Level::WARN, "not trained"));
    }

    #[test]
    fn test_compare_records_failures() {
        let runner = ModelRunner::new();
        let comparison = runner.compare(
            &["volume-check", "no-such-model", "isolation-forest"],
            &login_rows(),
            &Parameters::new(),
        );

        assert_eq!(comparison.entries().len(), 3);
        assert_eq!(comparison.best().unwrap().model, "isolation-forest");
        let failures: Vec<_> = comparison.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "no-such-model");
        assert_eq!(comparison.entries()[2].model, "no-such-model");
    }

    #[tokio::test]
    async fn test_execute_legacy_from_registered_table() {
        let session = SessionContext::new();
        session.register_batch("auth_events", login_rows().batch().clone()).unwrap();
        let runner = ModelRunner::new().with_session(session);

        let mut plugin = runner.registry().create("volume-check").unwrap();
        let response = runner
            .execute_legacy(
                plugin.as_mut(),
                &json!({"data_source": "table", "table_name": "auth_events", "threshold": 10}),
            )
            .await;

        assert_eq!(response.status, LegacyStatus::Success);
        assert_eq!(response.data_rows_processed, Some(41));
        assert_eq!(response.anomaly_count, Some(1));
        assert_eq!(response.anomalies[0]["entity_id"], "system");
        assert_eq!(response.anomalies[0]["details"]["source"], "table 'auth_events'");
        assert_eq!(response.anomalies[0]["details"]["row_count"], 41);
    }

    #[tokio::test]
    async fn test_execute_legacy_error_envelope() {
        let runner = ModelRunner::new();
        let mut plugin = runner.registry().create("volume-check").unwrap();

        let response = runner.execute_legacy(plugin.as_mut(), &json!({"data_source": "table"})).await;
        assert_eq!(response.status, LegacyStatus::Error);
        assert!(response.anomalies.is_empty());
        assert!(response.error.unwrap().contains("table_name"));

        let response = runner
            .execute_legacy(plugin.as_mut(), &json!({"table_name": "not_registered"}))
            .await;
        assert_eq!(response.status, LegacyStatus::Error);
    }
}
