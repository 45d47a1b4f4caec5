//! Impact analysis: what has to be reconsidered when modules or libraries change.

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use petgraph::graph::NodeIndex;
use petgraph::Direction;
use tracing::{debug, warn};

use super::DependencyGraph;
use crate::error::Result;
use crate::paths;

impl DependencyGraph {
    /// Every module `id` depends on, directly or transitively. Sorted.
    ///
    /// # Errors
    ///
    /// [`crate::Error::ModuleNotFound`] if `id` is not a node.
    pub fn get_all_dependencies(&self, id: &str) -> Result<Vec<String>> {
        let start = self.index_of(id)?;
        Ok(self.ids_sorted(self.reachable(&[start], Direction::Outgoing)))
    }

    /// Every module depending on `id`, directly or transitively. Sorted.
    ///
    /// # Errors
    ///
    /// [`crate::Error::ModuleNotFound`] if `id` is not a node.
    pub fn get_all_dependents(&self, id: &str) -> Result<Vec<String>> {
        let start = self.index_of(id)?;
        Ok(self.ids_sorted(self.reachable(&[start], Direction::Incoming)))
    }

    /// The changed modules plus all their transitive dependents and
    /// transitive dependencies. Sorted.
    ///
    /// IDs that are not nodes are logged and skipped.
    #[must_use]
    pub fn get_affected_modules<S: AsRef<str>>(&self, changed: &[S]) -> Vec<String> {
        let starts: Vec<NodeIndex> = changed
            .iter()
            .map(AsRef::as_ref)
            .filter_map(|id| {
                let node = self.node_map.get(id).copied();
                if node.is_none() {
                    warn!(module = %id, "Changed module is not in the graph, ignoring");
                }
                node
            })
            .collect();

        let mut affected: HashSet<NodeIndex> = starts.iter().copied().collect();
        affected.extend(self.reachable(&starts, Direction::Incoming));
        affected.extend(self.reachable(&starts, Direction::Outgoing));

        debug!(
            changed = starts.len(),
            affected = affected.len(),
            "Computed affected modules"
        );
        self.ids_sorted(affected)
    }

    /// Modules whose recorded library usage equals or lies under one of the
    /// changed library paths. Sorted.
    ///
    /// Paths are compared after lexical normalization.
    #[must_use]
    pub fn get_affected_by_library_changes<P: AsRef<Path>>(&self, changed: &[P]) -> Vec<String> {
        let changed: Vec<PathBuf> = changed
            .iter()
            .map(|p| paths::normalize(p.as_ref()))
            .collect();

        self.libraries
            .iter()
            .filter(|(_, usages)| {
                usages
                    .iter()
                    .any(|usage| changed.iter().any(|c| usage.starts_with(c)))
            })
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Affected set for a change touching both modules and libraries.
    ///
    /// Modules using a changed library count as changed themselves, so their
    /// dependents and dependencies are included too.
    #[must_use]
    pub fn get_affected_modules_with_libraries<S, P>(
        &self,
        changed_modules: &[S],
        changed_libraries: &[P],
    ) -> Vec<String>
    where
        S: AsRef<str>,
        P: AsRef<Path>,
    {
        let mut seeds: BTreeSet<String> = changed_modules
            .iter()
            .map(|id| id.as_ref().to_string())
            .collect();
        seeds.extend(self.get_affected_by_library_changes(changed_libraries));

        let seeds: Vec<String> = seeds.into_iter().collect();
        self.get_affected_modules(&seeds)
    }

    /// Nodes reachable from `starts` in `direction`, excluding the starts
    /// themselves unless they are reachable through an edge.
    fn reachable(&self, starts: &[NodeIndex], direction: Direction) -> HashSet<NodeIndex> {
        let mut visited = HashSet::new();
        let mut stack: Vec<NodeIndex> = starts
            .iter()
            .flat_map(|&s| self.graph.neighbors_directed(s, direction))
            .collect();

        while let Some(node) = stack.pop() {
            if visited.insert(node) {
                stack.extend(self.graph.neighbors_directed(node, direction));
            }
        }
        visited
    }

    fn ids_sorted(&self, nodes: impl IntoIterator<Item = NodeIndex>) -> Vec<String> {
        let mut ids: Vec<String> = nodes
            .into_iter()
            .map(|n| self.id_of(n).to_string())
            .collect();
        ids.sort_unstable();
        ids
    }
}
