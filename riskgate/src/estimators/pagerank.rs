//! PageRank over an undirected edge graph by power iteration.

use std::collections::{HashMap, HashSet};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, RiskError};

/// Undirected graph with nodes kept in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct EdgeGraph {
    index: HashMap<String, usize>,
    nodes: Vec<String>,
    adjacency: Vec<Vec<usize>>,
    edges: HashSet<(usize, usize)>,
}

impl EdgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `name` if unseen and returns its index.
    pub fn add_node(&mut self, name: &str) -> usize {
        if let Some(&index) = self.index.get(name) {
            return index;
        }
        let index = self.nodes.len();
        self.index.insert(name.to_string(), index);
        self.nodes.push(name.to_string());
        self.adjacency.push(Vec::new());
        index
    }

    /// Adds the undirected edge `a - b`. Repeated edges are ignored.
    pub fn add_edge(&mut self, a: &str, b: &str) {
        let u = self.add_node(a);
        let v = self.add_node(b);
        let key = (u.min(v), u.max(v));
        if !self.edges.insert(key) {
            return;
        }
        self.adjacency[u].push(v);
        if u != v {
            self.adjacency[v].push(u);
        }
    }

    /// `nodes` nodes named `0..nodes` joined by `edges` distinct random edges.
    ///
    /// The edge count is capped at the number of possible edges without self-loops.
    pub fn random(nodes: usize, edges: usize, seed: u64) -> Self {
        let mut graph = Self::new();
        for node in 0..nodes {
            graph.add_node(&node.to_string());
        }
        let possible = nodes * nodes.saturating_sub(1) / 2;
        let target = edges.min(possible);
        let mut rng = StdRng::seed_from_u64(seed);
        while graph.edge_count() < target {
            let u = rng.random_range(0..nodes);
            let v = rng.random_range(0..nodes);
            if u != v {
                graph.add_edge(&u.to_string(), &v.to_string());
            }
        }
        graph
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    pub fn degree(&self, node: &str) -> Option<usize> {
        self.index.get(node).map(|&i| self.adjacency[i].len())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRankParams {
    pub damping: f64,
    pub max_iterations: usize,
    /// Convergence tolerance per node.
    pub tolerance: f64,
}

impl Default for PageRankParams {
    fn default() -> Self {
        Self {
            damping: 0.85,
            max_iterations: 100,
            tolerance: 1e-6,
        }
    }
}

/// PageRank of every node, in node order. Scores sum to 1.
///
/// Mass of nodes without neighbours is spread uniformly. An empty graph has no
/// scores.
///
/// # Errors
///
/// [`RiskError::Estimator`] when the iteration does not converge within
/// `max_iterations`.
pub fn pagerank(graph: &EdgeGraph, params: &PageRankParams) -> Result<Vec<(String, f64)>> {
    let n = graph.node_count();
    if n == 0 {
        return Ok(Vec::new());
    }

    let nf = n as f64;
    let alpha = params.damping;
    let mut ranks = vec![1.0 / nf; n];

    for iteration in 0..params.max_iterations {
        let previous = std::mem::replace(&mut ranks, vec![0.0; n]);

        let mut dangling = 0.0;
        for (u, neighbours) in graph.adjacency.iter().enumerate() {
            if neighbours.is_empty() {
                dangling += previous[u];
                continue;
            }
            let share = alpha * previous[u] / neighbours.len() as f64;
            for &v in neighbours {
                ranks[v] += share;
            }
        }

        let base = (alpha * dangling + (1.0 - alpha)) / nf;
        for rank in ranks.iter_mut() {
            *rank += base;
        }

        let delta: f64 = ranks
            .iter()
            .zip(&previous)
            .map(|(a, b)| (a - b).abs())
            .sum();
        if delta < nf * params.tolerance {
            debug!(nodes = n, iterations = iteration + 1, "pagerank converged");
            return Ok(graph.nodes.iter().cloned().zip(ranks).collect());
        }
    }

    Err(RiskError::estimator(
        "pagerank",
        format!(
            "power iteration failed to converge in {} iterations",
            params.max_iterations
        ),
    ))
}
