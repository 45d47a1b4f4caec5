//! Deployment ordering.

use std::collections::BTreeSet;

use petgraph::graph::NodeIndex;
use petgraph::Direction;
use tracing::{debug, warn};

use super::DependencyGraph;
use crate::error::{Error, Result};

impl DependencyGraph {
    /// Order modules so that every module comes after all of its dependencies.
    ///
    /// Kahn's algorithm; among modules that are ready at the same time the
    /// lexically smallest ID goes first, so the order is stable across runs.
    /// A successful sort marks the graph acyclic-confirmed and is cached
    /// until the next mutation.
    ///
    /// # Errors
    ///
    /// [`Error::CycleDetected`] with every cycle found when not all modules
    /// can be ordered.
    pub fn topological_sort(&self) -> Result<Vec<String>> {
        if let Some(order) = self.order.get() {
            return Ok(order.clone());
        }

        let order = self.kahn()?;
        Ok(self.order.get_or_init(|| order).clone())
    }

    /// Group modules into levels that can be processed in parallel.
    ///
    /// A module with no dependencies is on level 0; any other module is one
    /// level above its deepest dependency. Each level is sorted.
    ///
    /// # Errors
    ///
    /// The same [`Error::CycleDetected`] as [`Self::topological_sort`].
    pub fn execution_levels(&self) -> Result<Vec<Vec<String>>> {
        let order = self.topological_sort()?;

        let mut level_of = vec![0usize; self.graph.node_count()];
        let mut levels: Vec<Vec<String>> = Vec::new();
        for id in order {
            let node = self.index_of(&id)?;
            let level = self
                .graph
                .neighbors_directed(node, Direction::Outgoing)
                .map(|dep| level_of[dep.index()])
                .max()
                .map_or(0, |deepest| deepest + 1);
            level_of[node.index()] = level;

            if levels.len() <= level {
                levels.resize_with(level + 1, Vec::new);
            }
            levels[level].push(id);
        }

        for level in &mut levels {
            level.sort_unstable();
        }
        Ok(levels)
    }

    fn kahn(&self) -> Result<Vec<String>> {
        let mut outstanding: Vec<usize> = self
            .graph
            .node_indices()
            .map(|n| self.graph[n].dependencies)
            .collect();

        let mut ready: BTreeSet<(&str, NodeIndex)> = self
            .graph
            .node_indices()
            .filter(|n| outstanding[n.index()] == 0)
            .map(|n| (self.id_of(n), n))
            .collect();

        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some((id, node)) = ready.pop_first() {
            order.push(id.to_string());
            for dependent in self.graph.neighbors_directed(node, Direction::Incoming) {
                let remaining = &mut outstanding[dependent.index()];
                *remaining -= 1;
                if *remaining == 0 {
                    ready.insert((self.id_of(dependent), dependent));
                }
            }
        }

        if order.len() < self.graph.node_count() {
            let cycles = self.detect_cycles();
            warn!(
                ordered = order.len(),
                total = self.graph.node_count(),
                cycles = cycles.len(),
                "Dependency graph is cyclic, no valid order"
            );
            return Err(Error::CycleDetected { cycles });
        }

        debug!(modules = order.len(), "Graph confirmed acyclic");
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use crate::graph::tests::graph;

    use super::*;

    #[test]
    fn dependencies_come_first() {
        let graph = graph(
            &["app", "db", "vpc"],
            &[("app", "db"), ("db", "vpc"), ("app", "vpc")],
        );

        assert_eq!(graph.topological_sort().unwrap(), ["vpc", "db", "app"]);
    }

    #[test]
    fn ties_break_lexically() {
        let graph = graph(
            &["z", "y", "x", "base"],
            &[("z", "base"), ("y", "base"), ("x", "base")],
        );

        assert_eq!(graph.topological_sort().unwrap(), ["base", "x", "y", "z"]);
    }

    #[test]
    fn newly_ready_nodes_are_merged_into_lexical_order() {
        // "b" becomes ready only after "a"; it must still precede "c".
        let graph = graph(&["a", "b", "c"], &[("b", "a")]);

        assert_eq!(graph.topological_sort().unwrap(), ["a", "b", "c"]);
    }

    #[test]
    fn cyclic_graph_fails_with_cycle_path() {
        let graph = graph(&["a", "b", "c"], &[("a", "b"), ("b", "c"), ("c", "a")]);

        let err = graph.topological_sort().unwrap_err();

        match err {
            Error::CycleDetected { cycles } => {
                assert_eq!(cycles.len(), 1);
                assert_eq!(cycles[0].len(), 3);
            }
            other => panic!("expected CycleDetected, got {other:?}"),
        }
        assert!(!graph.is_acyclic_confirmed());
    }

    #[test]
    fn levels_group_independent_modules() {
        let graph = graph(
            &["vpc", "dns", "eks", "rds", "app"],
            &[("eks", "vpc"), ("rds", "vpc"), ("app", "eks"), ("app", "rds"), ("app", "dns")],
        );

        let levels = graph.execution_levels().unwrap();

        assert_eq!(
            levels,
            [vec!["dns", "vpc"], vec!["eks", "rds"], vec!["app"]]
        );
    }

    #[test]
    fn level_is_one_above_deepest_dependency() {
        // "top" depends on a level-0 and a level-2 module.
        let graph = graph(
            &["a", "b", "c", "top"],
            &[("b", "a"), ("c", "b"), ("top", "a"), ("top", "c")],
        );

        let levels = graph.execution_levels().unwrap();

        assert_eq!(levels.len(), 4);
        assert_eq!(levels[3], ["top"]);
    }

    #[test]
    fn levels_surface_the_cycle_error() {
        let graph = graph(&["a", "b", "ok"], &[("a", "b"), ("b", "a")]);

        assert!(matches!(
            graph.execution_levels(),
            Err(Error::CycleDetected { .. })
        ));
    }

    #[test]
    fn empty_graph_orders_trivially() {
        let graph = graph(&[], &[]);

        assert!(graph.topological_sort().unwrap().is_empty());
        assert!(graph.execution_levels().unwrap().is_empty());
    }

    #[test]
    fn repeated_calls_are_identical() {
        let graph = graph(
            &["c", "b", "a", "d"],
            &[("d", "a"), ("c", "a"), ("b", "d")],
        );

        let first = graph.execution_levels().unwrap();
        assert!(graph.is_acyclic_confirmed());
        assert_eq!(graph.execution_levels().unwrap(), first);
        assert_eq!(graph.topological_sort().unwrap(), graph.topological_sort().unwrap());
    }
}
