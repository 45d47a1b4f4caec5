//! Cycle detection.
//!
//! Works on any graph, valid or not; it is how an ordering failure gets
//! explained.

use std::fmt;

use petgraph::graph::NodeIndex;
use petgraph::Direction;
use serde::Serialize;

use super::DependencyGraph;

/// A dependency loop, in edge order.
///
/// `a -> b -> c` means `a` depends on `b`, `b` on `c`, and `c` back on `a`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cycle {
    modules: Vec<String>,
}

impl Cycle {
    /// Create a cycle from the module IDs along the loop.
    #[must_use]
    pub fn new(modules: Vec<String>) -> Self {
        Self { modules }
    }

    /// Module IDs along the loop, first module not repeated.
    #[must_use]
    pub fn modules(&self) -> &[String] {
        &self.modules
    }

    /// Number of modules in the loop.
    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// `true` for a cycle with no modules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// `true` if the module is part of the loop.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.modules.iter().any(|m| m == id)
    }
}

impl fmt::Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(first) = self.modules.first() else {
            return f.write_str("(empty cycle)");
        };
        for module in &self.modules {
            write!(f, "{module} -> ")?;
        }
        f.write_str(first)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnPath,
    Done,
}

struct Frame {
    node: NodeIndex,
    neighbors: Vec<NodeIndex>,
    next: usize,
}

impl DependencyGraph {
    /// Find dependency cycles.
    ///
    /// Depth-first search from every node in lexical order, following
    /// dependencies in lexical order. Reaching a node that is still on the
    /// current path closes a cycle: the slice of the path from that node to
    /// the present point. Disjoint cycles are all reported; an acyclic graph
    /// yields an empty list.
    #[must_use]
    pub fn detect_cycles(&self) -> Vec<Cycle> {
        let mut marks = vec![Mark::Unvisited; self.graph.node_count()];
        let mut cycles = Vec::new();

        let mut starts: Vec<NodeIndex> = self.graph.node_indices().collect();
        starts.sort_by(|a, b| self.id_of(*a).cmp(self.id_of(*b)));

        for start in starts {
            if marks[start.index()] != Mark::Unvisited {
                continue;
            }

            marks[start.index()] = Mark::OnPath;
            let mut stack = vec![self.frame(start)];

            while let Some(frame) = stack.last_mut() {
                let Some(&neighbor) = frame.neighbors.get(frame.next) else {
                    marks[frame.node.index()] = Mark::Done;
                    stack.pop();
                    continue;
                };
                frame.next += 1;

                match marks[neighbor.index()] {
                    Mark::Unvisited => {
                        marks[neighbor.index()] = Mark::OnPath;
                        stack.push(self.frame(neighbor));
                    }
                    Mark::OnPath => {
                        let from = stack
                            .iter()
                            .position(|f| f.node == neighbor)
                            .unwrap_or_default();
                        let modules = stack[from..]
                            .iter()
                            .map(|f| self.id_of(f.node).to_string())
                            .collect();
                        cycles.push(Cycle::new(modules));
                    }
                    Mark::Done => {}
                }
            }
        }

        cycles
    }

    fn frame(&self, node: NodeIndex) -> Frame {
        Frame {
            node,
            neighbors: self.sorted_neighbors(node, Direction::Outgoing),
            next: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::graph::tests::graph;

    use super::*;

    /// Rotate a cycle so its lexically smallest member comes first.
    fn canonical(cycle: &Cycle) -> Vec<&str> {
        let modules: Vec<&str> = cycle.modules().iter().map(String::as_str).collect();
        let start = modules
            .iter()
            .enumerate()
            .min_by_key(|(_, m)| **m)
            .map_or(0, |(i, _)| i);
        modules[start..]
            .iter()
            .chain(&modules[..start])
            .copied()
            .collect()
    }

    #[test]
    fn three_node_loop_is_reported_in_edge_order() {
        let graph = graph(&["a", "b", "c"], &[("a", "b"), ("b", "c"), ("c", "a")]);

        let cycles = graph.detect_cycles();

        assert_eq!(cycles.len(), 1);
        assert_eq!(canonical(&cycles[0]), ["a", "b", "c"]);
        assert_eq!(cycles[0].to_string(), "a -> b -> c -> a");
    }

    #[test]
    fn acyclic_graph_has_no_cycles() {
        let graph = graph(
            &["a", "b", "c", "d"],
            &[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")],
        );

        assert!(graph.detect_cycles().is_empty());
    }

    #[test]
    fn disjoint_cycles_are_all_reported() {
        let graph = graph(
            &["a", "b", "x", "y", "z", "free"],
            &[("a", "b"), ("b", "a"), ("x", "y"), ("y", "z"), ("z", "x"), ("free", "a")],
        );

        let cycles = graph.detect_cycles();
        let mut found: Vec<Vec<&str>> = cycles.iter().map(canonical).collect();
        found.sort();

        assert_eq!(found, [vec!["a", "b"], vec!["x", "y", "z"]]);
    }

    #[test]
    fn cycle_reachable_from_a_prefix_path_excludes_the_prefix() {
        let graph = graph(
            &["entry", "a", "b"],
            &[("entry", "a"), ("a", "b"), ("b", "a")],
        );

        let cycles = graph.detect_cycles();

        assert_eq!(cycles.len(), 1);
        assert!(!cycles[0].contains("entry"));
        assert_eq!(canonical(&cycles[0]), ["a", "b"]);
    }

    #[test]
    fn detection_still_works_after_failed_ordering() {
        let graph = graph(&["a", "b"], &[("a", "b"), ("b", "a")]);

        assert!(graph.topological_sort().is_err());
        assert_eq!(graph.detect_cycles().len(), 1);
    }
}
