//! Leveled log sinks handed to plugins through the execution context.

use std::fmt::Debug;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use tracing::Level;

use crate::logging::{truncate_field, LogConfig};

/// Capability to record leveled messages.
///
/// Calls are fire-and-forget and must preserve call order. Implementations
/// must not fail; a sink that cannot deliver a message drops it.
pub trait LogSink: Send + Sync + Debug {
    /// Records one message at the given level.
    fn log(&self, level: Level, message: &str);

    fn debug(&self, message: &str) {
        self.log(Level::DEBUG, message);
    }

    fn info(&self, message: &str) {
        self.log(Level::INFO, message);
    }

    fn warn(&self, message: &str) {
        self.log(Level::WARN, message);
    }

    fn error(&self, message: &str) {
        self.log(Level::ERROR, message);
    }
}

/// Sink that forwards every message to `tracing`.
#[derive(Debug, Clone)]
pub struct TracingSink {
    /// Label attached to every event as the `sink` field.
    label: String,
    config: LogConfig,
}

impl TracingSink {
    /// Creates a sink with the default [`LogConfig`].
    pub fn new(label: impl Into<String>) -> Self {
        Self::with_config(label, LogConfig::default())
    }

    /// Creates a sink with a custom configuration.
    pub fn with_config(label: impl Into<String>, config: LogConfig) -> Self {
        Self {
            label: label.into(),
            config,
        }
    }
}

impl Default for TracingSink {
    fn default() -> Self {
        Self::new("riskgate")
    }
}

impl LogSink for TracingSink {
    fn log(&self, level: Level, message: &str) {
        if !self.config.enabled(level) {
            return;
        }
        let message = truncate_field(message, self.config.max_field_length);
        let sink = self.label.as_str();
        match level {
            Level::ERROR => tracing::error!(sink, "{message}"),
            Level::WARN => tracing::warn!(sink, "{message}"),
            Level::INFO => tracing::info!(sink, "{message}"),
            Level::DEBUG => tracing::debug!(sink, "{message}"),
            _ => tracing::trace!(sink, "{message}"),
        }
    }
}

/// One message captured by a [`MemorySink`].
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub level: Level,
    pub message: String,
    pub recorded_at: DateTime<Utc>,
}

/// Sink that keeps messages in memory, in call order.
///
/// Used by tests to assert that warnings (width mismatches, lazy fits, empty
/// inputs) were reported.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<LogRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every captured record.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    /// Returns the messages captured at exactly `level`.
    pub fn messages_at(&self, level: Level) -> Vec<String> {
        self.records()
            .into_iter()
            .filter(|record| record.level == level)
            .map(|record| record.message)
            .collect()
    }

    /// Returns the captured warnings.
    pub fn warnings(&self) -> Vec<String> {
        self.messages_at(Level::WARN)
    }

    /// Whether any captured message at `level` contains `needle`.
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.messages_at(level)
            .iter()
            .any(|message| message.contains(needle))
    }
}

impl LogSink for MemorySink {
    fn log(&self, level: Level, message: &str) {
        if let Ok(mut records) = self.records.lock() {
            records.push(LogRecord {
                level,
                message: message.to_string(),
                recorded_at: Utc::now(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_preserves_order() {
        let sink = MemorySink::new();
        sink.info("first");
        sink.warn("second");
        sink.info("third");

        let messages: Vec<_> = sink.records().into_iter().map(|r| r.message).collect();
        assert_eq!(messages, vec!["first", "second", "third"]);
        assert_eq!(sink.warnings(), vec!["second".to_string()]);
    }

    #[test]
    fn test_memory_sink_contains() {
        let sink = MemorySink::new();
        sink.warn("feature width mismatch: expected 4, got 6");
        assert!(sink.contains(Level::WARN, "expected 4"));
        assert!(!sink.contains(Level::INFO, "expected 4"));
    }

    #[test]
    fn test_tracing_sink_accepts_all_levels() {
        let sink = TracingSink::with_config("test", LogConfig::verbose());
        sink.debug("debug");
        sink.info("info");
        sink.warn("warn");
        sink.error("error");
        sink.log(Level::TRACE, "trace");
    }
}
