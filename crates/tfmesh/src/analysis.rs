//! End-to-end pipeline: discover, extract, build the graph.

use std::path::{Path, PathBuf};

use tracing::{debug, info_span};

use crate::changes::ChangeSet;
use crate::config::Config;
use crate::discovery::{discover, DiscoveryOptions};
use crate::error::{Error, Result};
use crate::extract::{Extractor, ReferenceSource};
use crate::graph::DependencyGraph;
use crate::module::ModuleIndex;
use crate::types::ExtractionReport;

/// Result of analysing one repository.
///
/// Everything is computed up front; afterward the analysis is read-only and
/// can be queried from several threads.
#[derive(Debug, Clone)]
pub struct Analysis {
    /// Canonical discovery root.
    pub root: PathBuf,
    /// Absolute library roots.
    pub library_roots: Vec<PathBuf>,
    /// Discovered modules.
    pub index: ModuleIndex,
    /// Per-module dependencies and collected diagnostics.
    pub report: ExtractionReport,
    /// Dependency graph built from the report.
    pub graph: DependencyGraph,
}

impl Analysis {
    /// Discover modules under `root`, extract their dependencies from
    /// `source`, and build the graph.
    ///
    /// # Errors
    ///
    /// Fails on invalid configuration or when the tree cannot be read.
    /// Extraction problems are not errors; they are collected in
    /// [`ExtractionReport::diagnostics`].
    pub fn run<S>(root: &Path, config: &Config, source: &S) -> Result<Self>
    where
        S: ReferenceSource + ?Sized,
    {
        let _span = info_span!("analysis", root = %root.display()).entered();

        let options = DiscoveryOptions::from_config(config)?;
        let root = root.canonicalize().map_err(|source| Error::Discovery {
            path: root.to_path_buf(),
            source,
        })?;
        let index = discover(&root, &options)?;
        let library_roots = config.resolved_library_roots(&root);

        let report = Extractor::new(&index, &library_roots)
            .extract_all(source, config.extraction.workers)?;
        let graph = DependencyGraph::build(&index, &report);

        debug!(
            modules = index.len(),
            edges = graph.edge_count(),
            diagnostics = report.diagnostics.len(),
            "Analysis complete"
        );

        Ok(Self {
            root,
            library_roots,
            index,
            report,
            graph,
        })
    }

    /// Modules affected by a list of changed files.
    ///
    /// Files are attributed to modules and library directories first; the
    /// library-aware affected set is computed from the result.
    #[must_use]
    pub fn affected_by_files<P: AsRef<Path>>(&self, changed_files: &[P]) -> Vec<String> {
        let changes = self.classify(changed_files);
        self.graph
            .get_affected_modules_with_libraries(&changes.modules, &changes.library_paths)
    }

    /// Attribute changed files to modules and library directories.
    #[must_use]
    pub fn classify<P: AsRef<Path>>(&self, changed_files: &[P]) -> ChangeSet {
        ChangeSet::classify(&self.index, &self.root, &self.library_roots, changed_files)
    }
}
