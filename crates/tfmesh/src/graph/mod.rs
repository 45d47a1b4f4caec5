//! Module dependency graph.
//!
//! ## Graph Representation
//!
//! A petgraph `DiGraph` with one node per module ID and edges directed from
//! **dependent to dependency** (source -> target means source depends on
//! target). A side map resolves module IDs to node indices.
//!
//! ## Operations
//!
//! | Operation | Module | Algorithm |
//! |-----------|--------|-----------|
//! | Topological order | `order` | Kahn, lexical tie-break |
//! | Execution levels | `order` | Longest path over the topological order |
//! | Cycle detection | `cycles` | Iterative DFS with an explicit path |
//! | Impact analysis | `impact` | DFS closure in either direction |
//! | Visualization | `export` | DOT |
//!
//! ## Validity
//!
//! A graph starts out unchecked. The first successful ordering caches the
//! order and marks the graph acyclic-confirmed; any mutation drops the cache.
//! Mutation needs `&mut self`, so once construction is over the graph can be
//! shared for concurrent read-only queries.

mod cycles;
mod export;
mod impact;
mod order;

pub use cycles::Cycle;

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::sync::OnceLock;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::Serialize;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::module::ModuleIndex;
use crate::paths;
use crate::types::{DependencyKind, ExtractionReport};

/// A node and its degree counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphNode {
    /// Module ID.
    pub id: String,
    /// Number of modules this one depends on (out-degree).
    pub dependencies: usize,
    /// Number of modules depending on this one (in-degree).
    pub dependents: usize,
}

impl fmt::Display for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// One edge, by module ID.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct GraphEdge {
    /// Dependent module.
    pub from: String,
    /// Dependency module.
    pub to: String,
    /// How the dependency was declared.
    pub kind: DependencyKind,
}

/// Summary counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    /// Number of modules.
    pub nodes: usize,
    /// Number of dependency edges.
    pub edges: usize,
    /// Modules with no dependencies (they can run first).
    pub roots: usize,
    /// Modules nothing depends on.
    pub leaves: usize,
    /// Modules with neither dependencies nor dependents.
    pub isolated: usize,
}

/// Directed dependency graph over module IDs.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Edge direction: source (dependent) -> target (dependency).
    graph: DiGraph<GraphNode, DependencyKind>,

    /// Every node in `graph` has exactly one entry here.
    node_map: HashMap<String, NodeIndex>,

    /// Recorded library usages per module, for library-aware impact.
    libraries: BTreeMap<String, Vec<PathBuf>>,

    /// Topological order, set once the graph is confirmed acyclic.
    order: OnceLock<Vec<String>>,
}

impl DependencyGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph for an index from an extraction report.
    ///
    /// Every indexed module becomes a node; every resolved dependency becomes
    /// an edge; library usages are recorded for impact queries.
    #[must_use]
    pub fn build(index: &ModuleIndex, report: &ExtractionReport) -> Self {
        let mut graph = Self::new();
        for module in index.iter() {
            graph.add_node(module.id());
        }

        for deps in report.results.values() {
            for dependency in &deps.dependencies {
                if let Some(to) = &dependency.to {
                    graph.add_edge(&dependency.from, to, dependency.kind);
                }
            }
            for library in &deps.library_dependencies {
                graph.record_library(&deps.module, library.path.clone());
            }
        }

        debug!(
            nodes = graph.len(),
            edges = graph.edge_count(),
            "Built dependency graph"
        );
        graph
    }

    /// Add a node. Returns `false` if the ID was already present.
    pub fn add_node(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        if self.node_map.contains_key(&id) {
            return false;
        }
        let node = self.graph.add_node(GraphNode {
            id: id.clone(),
            dependencies: 0,
            dependents: 0,
        });
        self.node_map.insert(id, node);
        self.order.take();
        true
    }

    /// Add a `from -> to` dependency edge.
    ///
    /// A no-op (returning `false`) unless both nodes exist. Duplicate edges
    /// and self-edges are ignored; the first recorded kind wins.
    pub fn add_edge(&mut self, from: &str, to: &str, kind: DependencyKind) -> bool {
        let (Some(&source), Some(&target)) = (self.node_map.get(from), self.node_map.get(to))
        else {
            trace!(from, to, "Edge endpoint is not a node, ignoring");
            return false;
        };
        if source == target || self.graph.find_edge(source, target).is_some() {
            return false;
        }

        self.graph.add_edge(source, target, kind);
        self.graph[source].dependencies += 1;
        self.graph[target].dependents += 1;
        self.order.take();
        true
    }

    /// Record that `id` includes the library at `path`.
    ///
    /// Returns `false` if `id` is not a node or the usage was already known.
    pub fn record_library(&mut self, id: &str, path: PathBuf) -> bool {
        if !self.node_map.contains_key(id) {
            return false;
        }
        let path = paths::normalize(&path);
        let usages = self.libraries.entry(id.to_string()).or_default();
        if usages.contains(&path) {
            return false;
        }
        usages.push(path);
        true
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// `true` when the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// `true` if the module is a node.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.node_map.contains_key(id)
    }

    /// Node and degree counters for a module.
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.node_map.get(id).map(|&n| &self.graph[n])
    }

    /// All module IDs, sorted.
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.node_map.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// All edges, sorted by `(from, to)`.
    #[must_use]
    pub fn edges(&self) -> Vec<GraphEdge> {
        let mut edges: Vec<GraphEdge> = self
            .graph
            .edge_references()
            .map(|e| GraphEdge {
                from: self.graph[e.source()].id.clone(),
                to: self.graph[e.target()].id.clone(),
                kind: *e.weight(),
            })
            .collect();
        edges.sort();
        edges
    }

    /// Direct dependencies of a module, sorted.
    pub fn dependencies(&self, id: &str) -> Result<Vec<&str>> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// Direct dependents of a module, sorted.
    pub fn dependents(&self, id: &str) -> Result<Vec<&str>> {
        self.neighbors(id, Direction::Incoming)
    }

    /// Library paths recorded for a module.
    #[must_use]
    pub fn libraries(&self, id: &str) -> &[PathBuf] {
        self.libraries.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Graph restricted to `ids`.
    ///
    /// Only edges with both endpoints in `ids` survive. Unknown IDs are
    /// skipped.
    #[must_use]
    pub fn subgraph<S: AsRef<str>>(&self, ids: &[S]) -> Self {
        let mut sub = Self::new();
        for id in ids.iter().map(AsRef::as_ref) {
            if self.contains(id) {
                sub.add_node(id);
            }
        }

        for edge in self.graph.edge_references() {
            let from = &self.graph[edge.source()].id;
            let to = &self.graph[edge.target()].id;
            sub.add_edge(from, to, *edge.weight());
        }
        for (id, usages) in &self.libraries {
            for path in usages {
                sub.record_library(id, path.clone());
            }
        }
        sub
    }

    /// Summary counts.
    #[must_use]
    pub fn stats(&self) -> GraphStats {
        let mut stats = GraphStats {
            nodes: self.len(),
            edges: self.edge_count(),
            ..GraphStats::default()
        };
        for node in self.graph.node_weights() {
            let root = node.dependencies == 0;
            let leaf = node.dependents == 0;
            stats.roots += usize::from(root);
            stats.leaves += usize::from(leaf);
            stats.isolated += usize::from(root && leaf);
        }
        stats
    }

    /// `true` once a topological sort has succeeded since the last mutation.
    #[must_use]
    pub fn is_acyclic_confirmed(&self) -> bool {
        self.order.get().is_some()
    }

    fn index_of(&self, id: &str) -> Result<NodeIndex> {
        self.node_map
            .get(id)
            .copied()
            .ok_or_else(|| Error::ModuleNotFound(id.to_string()))
    }

    fn id_of(&self, node: NodeIndex) -> &str {
        &self.graph[node].id
    }

    fn neighbors(&self, id: &str, direction: Direction) -> Result<Vec<&str>> {
        let node = self.index_of(id)?;
        let mut ids: Vec<&str> = self
            .graph
            .neighbors_directed(node, direction)
            .map(|n| self.id_of(n))
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    /// Neighbors of `node` in `direction`, sorted by ID.
    fn sorted_neighbors(&self, node: NodeIndex, direction: Direction) -> Vec<NodeIndex> {
        let mut nodes: Vec<NodeIndex> = self.graph.neighbors_directed(node, direction).collect();
        nodes.sort_by(|a, b| self.id_of(*a).cmp(self.id_of(*b)));
        nodes
    }
}
