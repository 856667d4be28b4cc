//! Renderings of a [`RiskFrame`] for people and tools.
//!
//! Three formatters share one [`FormatterConfig`]: [`JsonFormatter`] for
//! programmatic consumers, [`HumanFormatter`] for terminals and logs, and
//! [`MarkdownFormatter`] for reports.
//!
//! # Examples
//!
//! ```rust
//! use riskgate::core::{RiskFrame, RiskRecord};
//! use riskgate::formatters::{HumanFormatter, FormatterConfig, ResultFormatter};
//!
//! let frame = RiskFrame::new(vec![RiskRecord::new("u1", 82.0, "statistical_outlier")]);
//! let output = HumanFormatter::with_config(FormatterConfig::minimal())
//!     .format(&frame)
//!     .unwrap();
//! assert!(output.contains("u1"));
//! ```

use std::fmt::{self, Write};

use serde_json::{json, Value};

use crate::core::{RiskFrame, RiskRecord};
use crate::error::{Result, RiskError};

/// Risk at or above which a record is rendered as critical.
const CRITICAL_RISK: f64 = 80.0;

/// Configuration options for rendering risk frames.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatterConfig {
    /// Include records labelled `normal`
    pub include_normal: bool,
    /// Include the per-record details map
    pub include_details: bool,
    /// Maximum number of records to display (`None` for all)
    pub max_records: Option<usize>,
    /// Whether to use colorized output (for human formatter)
    pub use_colors: bool,
    /// Whether to include timestamps in output
    pub include_timestamps: bool,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            include_normal: false,
            include_details: true,
            max_records: None,
            use_colors: true,
            include_timestamps: true,
        }
    }
}

impl FormatterConfig {
    /// Flagged records only, summary fields, no colors.
    pub fn minimal() -> Self {
        Self {
            include_normal: false,
            include_details: false,
            max_records: Some(10),
            use_colors: false,
            include_timestamps: false,
        }
    }

    /// Every record with all fields.
    pub fn detailed() -> Self {
        Self {
            include_normal: true,
            include_details: true,
            max_records: None,
            use_colors: true,
            include_timestamps: true,
        }
    }

    /// Suitable for CI logs: no colors, bounded output.
    pub fn ci() -> Self {
        Self {
            include_normal: false,
            include_details: true,
            max_records: Some(50),
            use_colors: false,
            include_timestamps: true,
        }
    }

    pub fn with_normal(mut self, include: bool) -> Self {
        self.include_normal = include;
        self
    }

    pub fn with_details(mut self, include: bool) -> Self {
        self.include_details = include;
        self
    }

    pub fn with_max_records(mut self, max: usize) -> Self {
        self.max_records = Some(max);
        self
    }

    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    /// Records to render, highest risk first, and how many were left out.
    fn select<'a>(&self, frame: &'a RiskFrame) -> (Vec<&'a RiskRecord>, usize) {
        let mut records: Vec<_> = frame
            .records()
            .iter()
            .filter(|r| self.include_normal || r.is_anomalous())
            .collect();
        records.sort_by(|a, b| b.risk_score().total_cmp(&a.risk_score()));
        let total = records.len();
        if let Some(max) = self.max_records {
            records.truncate(max);
        }
        let hidden = total - records.len();
        (records, hidden)
    }
}

/// Uniform interface for rendering a risk frame.
pub trait ResultFormatter {
    fn format(&self, frame: &RiskFrame) -> Result<String>;

    /// Renders with a one-off configuration.
    fn format_with_config(&self, frame: &RiskFrame, _config: &FormatterConfig) -> Result<String> {
        self.format(frame)
    }
}

fn render_error(e: fmt::Error) -> RiskError {
    RiskError::Internal(format!("failed to render risk frame: {e}"))
}

fn details_json(record: &RiskRecord) -> String {
    Value::Object(record.details.iter().map(|(k, v)| (k.clone(), v.clone())).collect()).to_string()
}

/// Structured JSON: a summary plus the selected records.
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    config: FormatterConfig,
    pretty: bool,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self::with_config(FormatterConfig::default())
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            pretty: true,
        }
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultFormatter for JsonFormatter {
    fn format(&self, frame: &RiskFrame) -> Result<String> {
        self.format_with_config(frame, &self.config)
    }

    fn format_with_config(&self, frame: &RiskFrame, config: &FormatterConfig) -> Result<String> {
        let (records, hidden) = config.select(frame);
        let records: Vec<Value> = records
            .into_iter()
            .map(|record| {
                let mut flat = record.to_flat();
                if !config.include_details {
                    flat.remove("details");
                }
                if !config.include_timestamps {
                    flat.remove("timestamp");
                }
                Value::Object(flat)
            })
            .collect();

        let document = json!({
            "summary": {
                "records": frame.len(),
                "anomalies": frame.anomalies().count(),
                "max_risk": frame.max_risk(),
                "omitted": hidden,
            },
            "records": records,
        });
        let rendered = if self.pretty {
            serde_json::to_string_pretty(&document)?
        } else {
            serde_json::to_string(&document)?
        };
        Ok(rendered)
    }
}

/// Console output with optional ANSI colors.
#[derive(Debug, Clone)]
pub struct HumanFormatter {
    config: FormatterConfig,
}

impl HumanFormatter {
    pub fn new() -> Self {
        Self::with_config(FormatterConfig::default())
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self { config }
    }

    fn paint(text: &str, risk: f64, config: &FormatterConfig) -> String {
        if !config.use_colors {
            return text.to_string();
        }
        let code = if risk >= CRITICAL_RISK {
            31
        } else if risk > 50.0 {
            33
        } else {
            32
        };
        format!("\x1b[{code}m{text}\x1b[0m")
    }

    fn render(&self, frame: &RiskFrame, config: &FormatterConfig, out: &mut String) -> fmt::Result {
        let anomalies = frame.anomalies().count();
        writeln!(out)?;
        if anomalies == 0 {
            writeln!(out, "✅ No anomalies in {} records", frame.len())?;
        } else {
            writeln!(out, "🚨 {anomalies} anomalies in {} records", frame.len())?;
        }
        if let Some(max) = frame.max_risk() {
            writeln!(out, "   Highest risk: {max:.1}")?;
        }

        let (records, hidden) = config.select(frame);
        if !records.is_empty() {
            writeln!(out)?;
        }
        for record in records {
            let score = format!("{:>5.1}", record.risk_score());
            write!(
                out,
                "   {} {} [{}]",
                Self::paint(&score, record.risk_score(), config),
                record.entity_id,
                record.anomaly_type()
            )?;
            if let Some(entity_type) = &record.entity_type {
                write!(out, " ({entity_type})")?;
            }
            writeln!(out)?;
            if config.include_timestamps {
                if let Some(ts) = record.timestamp {
                    writeln!(out, "         at {}", ts.to_rfc3339())?;
                }
            }
            if config.include_details && !record.details.is_empty() {
                writeln!(out, "         {}", details_json(record))?;
            }
        }
        if hidden > 0 {
            writeln!(out, "   ... and {hidden} more records")?;
        }
        writeln!(out)
    }
}

impl Default for HumanFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultFormatter for HumanFormatter {
    fn format(&self, frame: &RiskFrame) -> Result<String> {
        self.format_with_config(frame, &self.config)
    }

    fn format_with_config(&self, frame: &RiskFrame, config: &FormatterConfig) -> Result<String> {
        let mut output = String::new();
        self.render(frame, config, &mut output)
            .map_err(render_error)?;
        Ok(output)
    }
}

/// Markdown report with a summary and a record table.
#[derive(Debug, Clone)]
pub struct MarkdownFormatter {
    config: FormatterConfig,
    heading_level: u8,
}

impl MarkdownFormatter {
    pub fn new() -> Self {
        Self::with_config(FormatterConfig::default())
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            heading_level: 2,
        }
    }

    /// Sets the base heading level for the output.
    pub fn with_heading_level(mut self, level: u8) -> Self {
        self.heading_level = level.clamp(1, 6);
        self
    }

    fn render(&self, frame: &RiskFrame, config: &FormatterConfig, out: &mut String) -> fmt::Result {
        let h = "#".repeat(self.heading_level as usize);
        let anomalies = frame.anomalies().count();

        writeln!(out, "{h} Risk Report")?;
        writeln!(out)?;
        writeln!(out, "| Metric | Value |")?;
        writeln!(out, "|--------|-------|")?;
        writeln!(out, "| Records | {} |", frame.len())?;
        writeln!(out, "| Anomalies | {anomalies} |")?;
        match frame.max_risk() {
            Some(max) => writeln!(out, "| Highest risk | {max:.1} |")?,
            None => writeln!(out, "| Highest risk | - |")?,
        }

        let (records, hidden) = config.select(frame);
        if records.is_empty() {
            return Ok(());
        }

        writeln!(out)?;
        writeln!(out, "{h}# Records")?;
        writeln!(out)?;
        let mut header = String::from("| Entity | Type | Risk | Label |");
        let mut rule = String::from("|--------|------|------|-------|");
        if config.include_timestamps {
            header.push_str(" Timestamp |");
            rule.push_str("-----------|");
        }
        if config.include_details {
            header.push_str(" Details |");
            rule.push_str("---------|");
        }
        writeln!(out, "{header}")?;
        writeln!(out, "{rule}")?;

        for record in records {
            write!(
                out,
                "| {} | {} | {:.1} | {} |",
                escape_cell(&record.entity_id),
                record.entity_type.as_deref().unwrap_or("-"),
                record.risk_score(),
                record.anomaly_type()
            )?;
            if config.include_timestamps {
                let ts = record.timestamp.map(|ts| ts.to_rfc3339());
                write!(out, " {} |", ts.as_deref().unwrap_or("-"))?;
            }
            if config.include_details {
                write!(out, " `{}` |", escape_cell(&details_json(record)))?;
            }
            writeln!(out)?;
        }
        if hidden > 0 {
            writeln!(out)?;
            writeln!(out, "_{hidden} more records not shown._")?;
        }
        Ok(())
    }
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

impl Default for MarkdownFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultFormatter for MarkdownFormatter {
    fn format(&self, frame: &RiskFrame) -> Result<String> {
        self.format_with_config(frame, &self.config)
    }

    fn format_with_config(&self, frame: &RiskFrame, config: &FormatterConfig) -> Result<String> {
        let mut output = String::new();
        self.render(frame, config, &mut output)
            .map_err(render_error)?;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> RiskFrame {
        RiskFrame::new(vec![
            RiskRecord::new("u1", 12.0, "normal"),
            RiskRecord::new("u2", 91.5, "statistical_outlier").with_detail("raw_score", -0.41),
            RiskRecord::new("u3", 64.0, "statistical_outlier").with_entity_type("user"),
        ])
    }

    #[test]
    fn test_json_summary_and_order() {
        let output = JsonFormatter::new().format(&frame()).unwrap();
        let value: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["summary"]["records"], 3);
        assert_eq!(value["summary"]["anomalies"], 2);
        assert_eq!(value["summary"]["max_risk"], 91.5);
        let records = value["records"].as_array().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["entity_id"], "u2");
        assert_eq!(records[0]["details"]["raw_score"], -0.41);
    }

    #[test]
    fn test_json_minimal_drops_details() {
        let output = JsonFormatter::with_config(FormatterConfig::minimal().with_max_records(1))
            .with_pretty(false)
            .format(&frame())
            .unwrap();
        let value: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["summary"]["omitted"], 1);
        assert!(value["records"][0].get("details").is_none());
        assert!(!output.contains('\n'));
    }

    #[test]
    fn test_human_without_colors() {
        let output = HumanFormatter::with_config(FormatterConfig::ci()).format(&frame()).unwrap();
        assert!(output.contains("2 anomalies in 3 records"));
        assert!(output.contains("u3 [statistical_outlier] (user)"));
        assert!(!output.contains("u1"));
        assert!(!output.contains("\x1b["));
    }

    #[test]
    fn test_human_empty_frame() {
        let output = HumanFormatter::new().format(&RiskFrame::empty()).unwrap();
        assert!(output.contains("No anomalies in 0 records"));
    }

    #[test]
    fn test_markdown_table() {
        let output = MarkdownFormatter::with_config(FormatterConfig::detailed().with_details(false))
            .with_heading_level(3)
            .format(&frame())
            .unwrap();
        assert!(output.starts_with("### Risk Report"));
        assert!(output.contains("| Anomalies | 2 |"));
        assert!(output.contains("| u1 | - | 12.0 | normal | - |"));
        assert!(!output.contains("Details"));
    }
}
