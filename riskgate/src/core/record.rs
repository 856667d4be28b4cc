//! The normalized output unit shared by every plugin.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Lowest risk score a record can carry.
pub const MIN_RISK: f64 = 0.0;
/// Highest risk score a record can carry.
pub const MAX_RISK: f64 = 100.0;
/// Label used for rows that did not cross their family's threshold.
pub const NORMAL: &str = "normal";

/// Clamps `score` into `[0, 100]`.
///
/// NaN maps to `0`, infinities to the nearest bound.
pub fn clamp_risk(score: f64) -> f64 {
    if score.is_nan() {
        MIN_RISK
    } else {
        score.clamp(MIN_RISK, MAX_RISK)
    }
}

/// One scored entity (or one corpus-level condition).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskRecord {
    pub entity_id: String,
    pub entity_type: Option<String>,
    risk_score: f64,
    anomaly_type: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub details: BTreeMap<String, Value>,
}

impl RiskRecord {
    /// Creates a record, clamping the score and defaulting an empty label to `"normal"`.
    pub fn new(entity_id: impl Into<String>, risk_score: f64, anomaly_type: impl Into<String>) -> Self {
        let anomaly_type = anomaly_type.into();
        Self {
            entity_id: entity_id.into(),
            entity_type: None,
            risk_score: clamp_risk(risk_score),
            anomaly_type: if anomaly_type.is_empty() {
                NORMAL.to_string()
            } else {
                anomaly_type
            },
            timestamp: None,
            details: BTreeMap::new(),
        }
    }

    pub fn with_entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn risk_score(&self) -> f64 {
        self.risk_score
    }

    pub fn anomaly_type(&self) -> &str {
        &self.anomaly_type
    }

    /// Whether the record carries a label other than `"normal"`.
    pub fn is_anomalous(&self) -> bool {
        self.anomaly_type != NORMAL
    }

    /// Flattens the record into a plain JSON mapping with the output column names.
    pub fn to_flat(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("entity_id".into(), Value::String(self.entity_id.clone()));
        map.insert(
            "entity_type".into(),
            self.entity_type
                .as_ref()
                .map_or(Value::Null, |t| Value::String(t.clone())),
        );
        map.insert("risk_score".into(), Value::from(self.risk_score));
        map.insert(
            "anomaly_type".into(),
            Value::String(self.anomaly_type.clone()),
        );
        map.insert(
            "timestamp".into(),
            self.timestamp
                .map_or(Value::Null, |ts| Value::String(ts.to_rfc3339())),
        );
        map.insert(
            "details".into(),
            Value::Object(
                self.details
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            ),
        );
        map
    }
}
