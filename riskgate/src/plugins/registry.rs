//! Catalog of available plugins.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{
    centrality, isolation, reconstruction, volume, AutoencoderConfig, AutoencoderModel,
    IsolationForestConfig, IsolationForestModel, PageRankConfig, PageRankModel, VolumeCheckConfig,
    VolumeCheckModel,
};
use crate::core::{ModelFamily, ModelPlugin, Parameters};
use crate::error::{Result, RiskError};

/// Builds a plugin from construction parameters.
pub type PluginFactory =
    Arc<dyn Fn(&Parameters) -> Result<Box<dyn ModelPlugin>> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    Integer,
    Float,
    String,
}

/// One tunable parameter of a plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    pub kind: ParameterKind,
    pub default: Value,
    pub description: String,
}

impl ParameterSpec {
    pub fn new(name: &str, kind: ParameterKind, default: Value, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            default,
            description: description.to_string(),
        }
    }
}

/// Catalog entry describing a plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelManifest {
    pub slug: String,
    pub name: String,
    pub version: String,
    pub family: ModelFamily,
    pub description: String,
    pub parameters: Vec<ParameterSpec>,
}

struct Entry {
    manifest: ModelManifest,
    factory: PluginFactory,
}

/// Slug-keyed registry of plugin manifests and factories.
///
/// # Examples
///
/// ```rust
/// use riskgate::plugins::ModelRegistry;
///
/// let registry = ModelRegistry::builtin();
/// let plugin = registry.create("isolation-forest").unwrap();
/// assert_eq!(plugin.name(), "isolation-forest");
/// assert!(registry.create("does-not-exist").is_err());
/// ```
#[derive(Default)]
pub struct ModelRegistry {
    entries: BTreeMap<String, Entry>,
}

impl fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("slugs", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ModelRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in plugins.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(volume_manifest(), Arc::new(|params: &Parameters| {
            let mut config = VolumeCheckConfig::default();
            if let Some(threshold) = params.get_u64("threshold")? {
                config = config.with_threshold(threshold);
            }
            Ok(Box::new(VolumeCheckModel::new(config)) as Box<dyn ModelPlugin>)
        }));
        registry.register(isolation_manifest(), Arc::new(|params: &Parameters| {
            let mut config = IsolationForestConfig::default();
            if let Some(contamination) = params.get_f64("contamination")? {
                config = config.with_contamination(contamination);
            }
            if let Some(n) = params.get_u64("n_estimators")? {
                config = config.with_estimators(n as usize);
            }
            if let Some(seed) = params.get_u64("seed")? {
                config = config.with_seed(seed);
            }
            Ok(Box::new(IsolationForestModel::new(config)?) as Box<dyn ModelPlugin>)
        }));
        registry.register(
            autoencoder_manifest(reconstruction::DENSE_SLUG, "Dense Autoencoder", "mean squared"),
            Arc::new(|params: &Parameters| autoencoder(AutoencoderConfig::dense(), params)),
        );
        registry.register(
            autoencoder_manifest(
                reconstruction::ABSOLUTE_SLUG,
                "Absolute-Error Autoencoder",
                "mean absolute",
            ),
            Arc::new(|params: &Parameters| autoencoder(AutoencoderConfig::absolute(), params)),
        );
        registry.register(pagerank_manifest(), Arc::new(|params: &Parameters| {
            let mut config = PageRankConfig::default();
            if let (Some(source), Some(target)) =
                (params.get_str("source_column")?, params.get_str("target_column")?)
            {
                config = config.with_columns(source, target);
            }
            if let Some(damping) = params.get_f64("damping")? {
                config.pagerank.damping = damping;
            }
            Ok(Box::new(PageRankModel::new(config)?) as Box<dyn ModelPlugin>)
        }));
        registry
    }

    /// Adds or replaces the plugin registered under `manifest.slug`.
    pub fn register(&mut self, manifest: ModelManifest, factory: PluginFactory) {
        self.entries
            .insert(manifest.slug.clone(), Entry { manifest, factory });
    }

    pub fn contains(&self, slug: &str) -> bool {
        self.entries.contains_key(slug)
    }

    pub fn slugs(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn manifest(&self, slug: &str) -> Option<&ModelManifest> {
        self.entries.get(slug).map(|entry| &entry.manifest)
    }

    pub fn manifests(&self) -> impl Iterator<Item = &ModelManifest> {
        self.entries.values().map(|entry| &entry.manifest)
    }

    /// Instantiates the plugin registered under `slug` with default settings.
    pub fn create(&self, slug: &str) -> Result<Box<dyn ModelPlugin>> {
        self.create_with(slug, &Parameters::new())
    }

    /// Instantiates the plugin registered under `slug`, configured from `parameters`.
    ///
    /// # Errors
    ///
    /// Unknown slugs and invalid parameter values are configuration errors.
    pub fn create_with(&self, slug: &str, parameters: &Parameters) -> Result<Box<dyn ModelPlugin>> {
        let entry = self.entries.get(slug).ok_or_else(|| {
            RiskError::configuration(format!(
                "unknown model '{slug}'; available: {}",
                self.slugs().join(", ")
            ))
        })?;
        (entry.factory)(parameters)
    }
}

fn autoencoder(mut config: AutoencoderConfig, params: &Parameters) -> Result<Box<dyn ModelPlugin>> {
    if let Some(width) = params.get_u64("input_width")? {
        config = config.with_input_width(width as usize);
    }
    if let Some(epochs) = params.get_u64("epochs")? {
        config = config.with_epochs(epochs as usize);
    }
    if let Some(hidden) = params.get_u64("hidden_units")? {
        config.network.hidden_units = hidden as usize;
    }
    Ok(Box::new(AutoencoderModel::new(config)?))
}

fn volume_manifest() -> ModelManifest {
    ModelManifest {
        slug: volume::SLUG.to_string(),
        name: "Volume Check".to_string(),
        version: "1.0.0".to_string(),
        family: ModelFamily::CorpusVolume,
        description: "Flags a dataset whose row count exceeds a threshold".to_string(),
        parameters: vec![
            ParameterSpec::new(
                "threshold",
                ParameterKind::Integer,
                json!(10_000),
                "Row count above which the corpus is flagged",
            ),
            ParameterSpec::new(
                "source",
                ParameterKind::String,
                Value::Null,
                "Name of the source, echoed into the record details",
            ),
        ],
    }
}

fn isolation_manifest() -> ModelManifest {
    ModelManifest {
        slug: isolation::SLUG.to_string(),
        name: "Isolation Forest".to_string(),
        version: "1.0.0".to_string(),
        family: ModelFamily::DecisionBoundary,
        description: "Scores rows by how quickly random splits isolate them".to_string(),
        parameters: vec![
            ParameterSpec::new(
                "contamination",
                ParameterKind::Float,
                json!(0.1),
                "Expected share of outliers",
            ),
            ParameterSpec::new(
                "n_estimators",
                ParameterKind::Integer,
                json!(100),
                "Number of isolation trees",
            ),
            ParameterSpec::new("seed", ParameterKind::Integer, json!(42), "Random seed"),
        ],
    }
}

fn autoencoder_manifest(slug: &str, name: &str, error: &str) -> ModelManifest {
    ModelManifest {
        slug: slug.to_string(),
        name: name.to_string(),
        version: "1.0.0".to_string(),
        family: ModelFamily::ReconstructionError,
        description: format!("Scores rows by the {error} error of an autoencoder reconstruction"),
        parameters: vec![
            ParameterSpec::new(
                "input_width",
                ParameterKind::Integer,
                json!(10),
                "Feature width used before any data is seen",
            ),
            ParameterSpec::new(
                "epochs",
                ParameterKind::Integer,
                json!(50),
                "Training epochs",
            ),
            ParameterSpec::new(
                "hidden_units",
                ParameterKind::Integer,
                json!(8),
                "Width of the bottleneck layer",
            ),
        ],
    }
}

fn pagerank_manifest() -> ModelManifest {
    ModelManifest {
        slug: centrality::SLUG.to_string(),
        name: "PageRank Centrality".to_string(),
        version: "1.0.0".to_string(),
        family: ModelFamily::Centrality,
        description: "Scores graph nodes by PageRank, de-biased by graph size".to_string(),
        parameters: vec![
            ParameterSpec::new(
                "source_column",
                ParameterKind::String,
                json!("source"),
                "Column holding edge sources (first column when absent)",
            ),
            ParameterSpec::new(
                "target_column",
                ParameterKind::String,
                json!("target"),
                "Column holding edge targets (second column when absent)",
            ),
            ParameterSpec::new("damping", ParameterKind::Float, json!(0.85), "Damping factor"),
        ],
    }
}
