//! Single-call adapter for legacy callers.
//!
//! Old callers hand a plugin raw rows and expect plain records back. The shim
//! wraps the rows in the shared lightweight context and runs the regular
//! `infer` path, so both surfaces produce the same records for the same data
//! and model state.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::context::ExecutionContext;
use super::dataset::Dataset;
use super::lifecycle::ModelPlugin;
use super::parameters::Parameters;
use super::record::RiskRecord;
use crate::error::Result;

/// Status string of the legacy envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LegacyStatus {
    Success,
    Error,
}

/// The `{anomalies, status, ...}` envelope returned to legacy callers.
///
/// On success `anomaly_count` equals `anomalies.len()`. On failure the
/// anomaly list is empty and `error` carries the message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyResponse {
    pub anomalies: Vec<Map<String, Value>>,
    pub status: LegacyStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anomaly_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_rows_processed: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LegacyResponse {
    /// Builds a success envelope from the anomalous records of a run.
    pub fn success<'a>(anomalies: impl IntoIterator<Item = &'a RiskRecord>, rows_processed: usize) -> Self {
        let anomalies: Vec<_> = anomalies.into_iter().map(RiskRecord::to_flat).collect();
        Self {
            anomaly_count: Some(anomalies.len()),
            anomalies,
            status: LegacyStatus::Success,
            data_rows_processed: Some(rows_processed),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            anomalies: Vec::new(),
            status: LegacyStatus::Error,
            anomaly_count: None,
            data_rows_processed: None,
            error: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == LegacyStatus::Success
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            serde_json::json!({"anomalies": [], "status": "error", "error": e.to_string()})
        })
    }
}

/// The legacy `execute(data)` surface, available on every plugin.
pub trait CompatibilityShim {
    /// Scores `rows` (JSON objects) and returns every record flattened.
    fn execute(&mut self, rows: &[Value]) -> Result<Vec<Map<String, Value>>>;

    /// Like [`execute`](Self::execute), with call parameters.
    fn execute_with(&mut self, rows: &[Value], parameters: Parameters) -> Result<Vec<Map<String, Value>>>;

    /// Scores `rows` and wraps the anomalous records in the legacy envelope.
    /// Failures become the error envelope instead of propagating.
    fn execute_legacy(&mut self, rows: &[Value]) -> LegacyResponse;
}

impl<P: ModelPlugin + ?Sized> CompatibilityShim for P {
    fn execute(&mut self, rows: &[Value]) -> Result<Vec<Map<String, Value>>> {
        self.execute_with(rows, Parameters::new())
    }

    fn execute_with(&mut self, rows: &[Value], parameters: Parameters) -> Result<Vec<Map<String, Value>>> {
        let ctx = ExecutionContext::lightweight(Dataset::from_json_rows(rows)?).with_parameters(parameters);
        let frame = self.infer(&ctx)?;
        Ok(frame.to_flat_records())
    }

    fn execute_legacy(&mut self, rows: &[Value]) -> LegacyResponse {
        let outcome = Dataset::from_json_rows(rows).and_then(|dataset| {
            let ctx = ExecutionContext::lightweight(dataset);
            self.infer(&ctx)
        });
        match outcome {
            Ok(frame) => LegacyResponse::success(frame.anomalies(), rows.len()),
            Err(e) => {
                tracing::warn!(plugin = self.name(), error = %e, "legacy execute failed");
                LegacyResponse::error(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_envelope_shape() {
        let json = LegacyResponse::error("table_name is required").to_json();
        assert_eq!(json["status"], "error");
        assert_eq!(json["anomalies"], serde_json::json!([]));
        assert_eq!(json["error"], "table_name is required");
        assert!(json.get("anomaly_count").is_none());
    }

    #[test]
    fn test_success_envelope_counts_anomalies() {
        let records = [
            RiskRecord::new("a", 90.0, "statistical_outlier"),
            RiskRecord::new("b", 95.0, "statistical_outlier"),
        ];
        let response = LegacyResponse::success(records.iter(), 12);
        assert!(response.is_success());
        assert_eq!(response.anomaly_count, Some(2));
        assert_eq!(response.data_rows_processed, Some(12));
        assert_eq!(response.to_json()["status"], "success");
    }
}
