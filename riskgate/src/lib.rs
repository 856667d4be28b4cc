//! # riskgate - Anomaly-Detection Plugins with a Shared Risk Pipeline
//!
//! riskgate defines a host-neutral lifecycle contract for anomaly-detection
//! plugins and the shared pipeline every plugin goes through: feature
//! extraction, width reconciliation, identity resolution, risk normalization
//! and result assembly. Plugins differ only in the raw signal they compute.
//!
//! ## Overview
//!
//! A plugin is constructed with its configuration, optionally trained, and
//! then asked to infer. Both calls receive a read-only [`ExecutionContext`]
//! holding the dataset, the call parameters and a log sink. Inference returns
//! a [`RiskFrame`]: one [`RiskRecord`] per entity with a risk score in
//! `[0, 100]` and an anomaly label (`"normal"` when nothing was flagged).
//!
//! ## Quick Start
//!
//! ```rust
//! use riskgate::prelude::*;
//! use serde_json::json;
//!
//! # fn main() -> riskgate::error::Result<()> {
//! let mut rows: Vec<_> = (0..30)
//!     .map(|i| json!({"user_id": format!("u{i}"), "logins": 10 + i % 3}))
//!     .collect();
//! rows.push(json!({"user_id": "intruder", "logins": 900}));
//!
//! let mut plugin = ModelRegistry::builtin().create("isolation-forest")?;
//! let ctx = ExecutionContext::lightweight(Dataset::from_json_rows(&rows)?);
//! plugin.train(&ctx)?;
//!
//! let frame = plugin.infer(&ctx)?;
//! for record in frame.anomalies() {
//!     println!("{} {:.1} {}", record.entity_id, record.risk_score(), record.anomaly_type());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Built-in Plugins
//!
//! | slug                   | family               | risk                                   |
//! |------------------------|----------------------|----------------------------------------|
//! | `volume-check`         | corpus volume        | 70 when `rows > threshold`             |
//! | `isolation-forest`     | decision boundary    | `abs(score) * 100 + 50` for outliers   |
//! | `dense-autoencoder`    | reconstruction error | `mse * 50`                             |
//! | `absolute-autoencoder` | reconstruction error | `mae * 100`                            |
//! | `pagerank-centrality`  | centrality           | `pagerank * nodes * 20`                |
//!
//! ## Legacy Callers
//!
//! Every plugin also answers the single-call `execute(rows)` surface through
//! [`CompatibilityShim`], and [`ModelRunner::execute_legacy`] serves the
//! `{anomalies, status, anomaly_count, data_rows_processed}` envelope from a
//! data-source descriptor.
//!
//! ## Architecture
//!
//! - **`core`**: lifecycle contract, execution context, dataset, pipeline stages
//! - **`scoring`**: family profiles and the shared risk normalizer
//! - **`estimators`**: isolation forest, dense autoencoder, PageRank
//! - **`plugins`**: the built-in plugins and the slug registry
//! - **`sources`**: async loaders for registered tables, indexes and local files
//! - **`runner`**: loading, running, comparing, and the legacy envelope
//! - **`formatters`**: JSON, human readable and Markdown renderings
//! - **`logging`**: tracing configuration
//!
//! [`ExecutionContext`]: crate::core::ExecutionContext
//! [`RiskFrame`]: crate::core::RiskFrame
//! [`RiskRecord`]: crate::core::RiskRecord
//! [`CompatibilityShim`]: crate::core::CompatibilityShim
//! [`ModelRunner::execute_legacy`]: crate::runner::ModelRunner::execute_legacy

pub mod core;
pub mod error;
pub mod estimators;
pub mod formatters;
pub mod logging;
pub mod plugins;
pub mod prelude;
pub mod runner;
pub mod scoring;
pub mod security;
pub mod sources;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_fixtures;
