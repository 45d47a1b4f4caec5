//! DOT export for visualization.

use petgraph::dot::Dot;
use petgraph::graph::DiGraph;

use super::DependencyGraph;
use crate::types::DependencyKind;

impl DependencyGraph {
    /// Render the graph in Graphviz DOT format.
    ///
    /// Nodes are labelled with module IDs and edges with their kind. Nodes
    /// and edges are emitted in sorted order, so equal graphs render to
    /// identical text whatever order they were built in.
    #[must_use]
    pub fn to_dot(&self) -> String {
        let mut canonical: DiGraph<&str, DependencyKind> = DiGraph::with_capacity(
            self.graph.node_count(),
            self.graph.edge_count(),
        );
        let ids = self.ids();
        let nodes: Vec<_> = ids.iter().map(|id| canonical.add_node(*id)).collect();

        for edge in self.edges() {
            let (Ok(from), Ok(to)) = (
                ids.binary_search(&edge.from.as_str()),
                ids.binary_search(&edge.to.as_str()),
            ) else {
                continue;
            };
            canonical.add_edge(nodes[from], nodes[to], edge.kind);
        }

        format!("{}", Dot::new(&canonical))
    }
}
