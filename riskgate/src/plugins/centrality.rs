//! PageRank centrality plugin (graph family).
//!
//! The dataset is read as an edge list: every row joins the value of the
//! source column with the value of the target column. Each node becomes one
//! record, identified by its value, with risk `pagerank * node_count * 20`.

use serde::{Deserialize, Serialize};

use crate::core::parameters::{SOURCE_COLUMN, TARGET_COLUMN};
use crate::core::{
    Dataset, ExecutionContext, ModelFamily, ModelPlugin, ModelState, ResultAssembler, RiskFrame,
    TrainingResult,
};
use crate::error::Result;
use crate::estimators::{pagerank, EdgeGraph, PageRankParams};
use crate::scoring::{FamilyProfile, RawSignal, RiskNormalizer};
use crate::security::InputValidator;

pub const SLUG: &str = "pagerank-centrality";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRankConfig {
    pub source_column: String,
    pub target_column: String,
    pub pagerank: PageRankParams,
    /// Size of the synthetic graph used by `train` on an empty dataset.
    pub synthetic_nodes: usize,
    pub synthetic_edges: usize,
    pub seed: u64,
}

impl Default for PageRankConfig {
    fn default() -> Self {
        Self {
            source_column: "source".to_string(),
            target_column: "target".to_string(),
            pagerank: PageRankParams::default(),
            synthetic_nodes: 20,
            synthetic_edges: 50,
            seed: 42,
        }
    }
}

impl PageRankConfig {
    pub fn with_columns(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.source_column = source.into();
        self.target_column = target.into();
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.pagerank.max_iterations = max_iterations;
        self
    }

    pub fn validate(&self) -> Result<()> {
        InputValidator::validate_fraction(self.pagerank.damping, 0.0, 1.0, "damping")?;
        InputValidator::validate_positive(self.pagerank.max_iterations, "max_iterations")?;
        InputValidator::validate_threshold(self.pagerank.tolerance, "tolerance")
    }
}

/// Outcome of reading an edge list out of a dataset.
enum EdgeList {
    Graph(EdgeGraph),
    /// Fewer than two columns.
    TooFewColumns(usize),
}

#[derive(Debug)]
pub struct PageRankModel {
    config: PageRankConfig,
    graph: Option<EdgeGraph>,
    normalizer: RiskNormalizer,
    state: ModelState,
}

impl PageRankModel {
    pub fn new(config: PageRankConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            graph: None,
            normalizer: RiskNormalizer::new(FamilyProfile::centrality()),
            state: ModelState::new(2),
        })
    }

    pub fn config(&self) -> &PageRankConfig {
        &self.config
    }

    pub fn graph(&self) -> Option<&EdgeGraph> {
        self.graph.as_ref()
    }

    fn edge_list(&self, dataset: &Dataset, ctx: &ExecutionContext) -> Result<EdgeList> {
        let columns = dataset.num_columns();
        if columns < 2 {
            return Ok(EdgeList::TooFewColumns(columns));
        }

        let source = ctx
            .parameters()
            .get_str(SOURCE_COLUMN)?
            .unwrap_or(self.config.source_column.as_str());
        let target = ctx
            .parameters()
            .get_str(TARGET_COLUMN)?
            .unwrap_or(self.config.target_column.as_str());

        let (sources, targets) = match (dataset.column_as_strings(source)?, dataset.column_as_strings(target)?) {
            (Some(sources), Some(targets)) => (sources, targets),
            _ => {
                ctx.log().debug(&format!(
                    "edge columns '{source}'/'{target}' not found; using the first two columns"
                ));
                (dataset.column_at_as_strings(0)?, dataset.column_at_as_strings(1)?)
            }
        };

        let mut graph = EdgeGraph::new();
        for (a, b) in sources.iter().zip(&targets) {
            if let (Some(a), Some(b)) = (a, b) {
                graph.add_edge(a, b);
            }
        }
        Ok(EdgeList::Graph(graph))
    }
}

impl Default for PageRankModel {
    fn default() -> Self {
        Self {
            config: PageRankConfig::default(),
            graph: None,
            normalizer: RiskNormalizer::new(FamilyProfile::centrality()),
            state: ModelState::new(2),
        }
    }
}

impl ModelPlugin for PageRankModel {
    fn name(&self) -> &str {
        SLUG
    }

    fn family(&self) -> ModelFamily {
        ModelFamily::Centrality
    }

    fn train(&mut self, ctx: &ExecutionContext) -> Result<TrainingResult> {
        let graph = match ctx.non_empty_dataset() {
            Some(dataset) => match self.edge_list(dataset, ctx)? {
                EdgeList::Graph(graph) => graph,
                EdgeList::TooFewColumns(found) => {
                    let message = format!("need at least 2 columns for source/target edges, found {found}");
                    ctx.log().warn(&message);
                    self.graph = Some(EdgeGraph::new());
                    self.state.mark_trained(2);
                    return Ok(TrainingResult::warning(SLUG, message));
                }
            },
            None => {
                ctx.log().warn(&format!(
                    "no training data; building a random graph with {} nodes and {} edges",
                    self.config.synthetic_nodes, self.config.synthetic_edges
                ));
                EdgeGraph::random(
                    self.config.synthetic_nodes,
                    self.config.synthetic_edges,
                    self.config.seed,
                )
            }
        };

        let result = TrainingResult::success(SLUG)
            .with_metric("nodes", graph.node_count())
            .with_metric("edges", graph.edge_count());
        self.graph = Some(graph);
        self.state.mark_trained(2);
        Ok(result)
    }

    fn infer(&mut self, ctx: &ExecutionContext) -> Result<RiskFrame> {
        let Some(dataset) = ctx.non_empty_dataset() else {
            ctx.log().warn("centrality received an empty dataset; nothing to score");
            return Ok(RiskFrame::empty());
        };

        if self.graph.is_none() {
            ctx.log()
                .warn("graph is not built; building it from the inference data");
            match self.edge_list(dataset, ctx)? {
                EdgeList::Graph(graph) => self.graph = Some(graph),
                EdgeList::TooFewColumns(found) => {
                    ctx.log().warn(&format!(
                        "need at least 2 columns for source/target edges, found {found}"
                    ));
                    return Ok(RiskFrame::empty());
                }
            }
            self.state.mark_lazily_trained(2);
        }

        let Some(graph) = self.graph.as_ref().filter(|graph| !graph.is_empty()) else {
            return Ok(RiskFrame::empty());
        };

        let ranks = match pagerank(graph, &self.config.pagerank) {
            Ok(ranks) => ranks,
            Err(e) => {
                ctx.log().error(&format!("pagerank failed: {e}; returning an empty result"));
                return Ok(RiskFrame::empty());
            }
        };

        let node_count = graph.node_count() as f64;
        let mut assembler = ResultAssembler::new().entity_type("node");
        for (node, rank) in ranks {
            let risk = self
                .normalizer
                .normalize(RawSignal::new(rank).weighted(node_count));
            assembler.push(node, risk);
        }
        let frame = assembler.finish();
        ctx.log().info(&format!(
            "scored {} nodes; {} flagged",
            frame.len(),
            frame.anomalies().count()
        ));
        Ok(frame)
    }

    fn state(&self) -> &ModelState {
        &self.state
    }
}
