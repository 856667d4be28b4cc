//! Uniform tabular output for every plugin.
//!
//! The [`ResultAssembler`] pairs resolved identities with normalized risks and
//! produces a [`RiskFrame`]. Frames render into an Arrow batch whose schema is
//! fixed, so consumers can concatenate and rank results from any family.

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, RecordBatch, StringArray, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde_json::{Map, Value};

use super::record::RiskRecord;
use crate::error::{ErrorContext, Result, RiskError};
use crate::scoring::NormalizedRisk;

static OUTPUT_SCHEMA: Lazy<SchemaRef> = Lazy::new(|| {
    Arc::new(Schema::new(vec![
        Field::new("entity_id", DataType::Utf8, false),
        Field::new("entity_type", DataType::Utf8, true),
        Field::new("risk_score", DataType::Float64, false),
        Field::new("anomaly_type", DataType::Utf8, false),
        Field::new(
            "timestamp",
            DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
            true,
        ),
        Field::new("details", DataType::Utf8, false),
    ]))
});

/// The output schema shared by all plugins, in column order.
pub fn output_schema() -> SchemaRef {
    OUTPUT_SCHEMA.clone()
}

/// An ordered set of risk records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RiskFrame {
    records: Vec<RiskRecord>,
}

impl RiskFrame {
    /// A frame with no rows.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(records: Vec<RiskRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[RiskRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<RiskRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records whose label is not `"normal"`.
    pub fn anomalies(&self) -> impl Iterator<Item = &RiskRecord> {
        self.records.iter().filter(|record| record.is_anomalous())
    }

    /// Highest risk score in the frame, if any.
    pub fn max_risk(&self) -> Option<f64> {
        self.records
            .iter()
            .map(RiskRecord::risk_score)
            .fold(None, |acc, score| match acc {
                Some(max) if max >= score => Some(max),
                _ => Some(score),
            })
    }

    /// Flattens every record into a plain JSON mapping.
    pub fn to_flat_records(&self) -> Vec<Map<String, Value>> {
        self.records.iter().map(RiskRecord::to_flat).collect()
    }

    /// Renders the frame with [`output_schema`]. An empty frame yields zero rows
    /// and the same columns.
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let entity_ids = StringArray::from_iter_values(self.records.iter().map(|r| r.entity_id.as_str()));
        let entity_types: StringArray = self
            .records
            .iter()
            .map(|r| r.entity_type.as_deref())
            .collect();
        let scores = Float64Array::from_iter_values(self.records.iter().map(RiskRecord::risk_score));
        let labels = StringArray::from_iter_values(self.records.iter().map(RiskRecord::anomaly_type));
        let timestamps = TimestampMicrosecondArray::from(
            self.records
                .iter()
                .map(|r| r.timestamp.map(|ts| ts.timestamp_micros()))
                .collect::<Vec<_>>(),
        )
        .with_timezone("UTC");
        let details = self
            .records
            .iter()
            .map(|r| serde_json::to_string(&r.details))
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to serialize record details")?;
        let details = StringArray::from(details);

        let columns: Vec<ArrayRef> = vec![
            Arc::new(entity_ids),
            Arc::new(entity_types),
            Arc::new(scores),
            Arc::new(labels),
            Arc::new(timestamps),
            Arc::new(details),
        ];
        Ok(RecordBatch::try_new(output_schema(), columns)?)
    }
}

impl FromIterator<RiskRecord> for RiskFrame {
    fn from_iter<I: IntoIterator<Item = RiskRecord>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Collects per-row `(identity, normalized risk)` pairs into a [`RiskFrame`].
#[derive(Debug, Default)]
pub struct ResultAssembler {
    entity_type: Option<String>,
    timestamp: Option<DateTime<Utc>>,
    records: Vec<RiskRecord>,
}

impl ResultAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the `entity_type` stamped on every assembled row.
    pub fn entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    /// Sets the `timestamp` stamped on every assembled row.
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Appends one row.
    pub fn push(&mut self, entity_id: String, risk: NormalizedRisk) {
        let mut record = RiskRecord::new(entity_id, risk.risk_score, risk.anomaly_type);
        record.entity_type = self.entity_type.clone();
        record.timestamp = self.timestamp;
        record.details = risk.details;
        self.records.push(record);
    }

    /// Appends a fully built record as is.
    pub fn push_record(&mut self, record: RiskRecord) {
        self.records.push(record);
    }

    /// Appends one row per identity, pairing them with `risks` positionally.
    ///
    /// # Errors
    ///
    /// Returns [`RiskError::Internal`] when the two sequences differ in length.
    pub fn extend(&mut self, identities: Vec<String>, risks: Vec<NormalizedRisk>) -> Result<()> {
        if identities.len() != risks.len() {
            return Err(RiskError::Internal(format!(
                "{} identities for {} risk scores",
                identities.len(),
                risks.len()
            )));
        }
        for (entity_id, risk) in identities.into_iter().zip(risks) {
            self.push(entity_id, risk);
        }
        Ok(())
    }

    pub fn finish(self) -> RiskFrame {
        RiskFrame::new(self.records)
    }
}
