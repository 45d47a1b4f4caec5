//! # tfmesh: Module Discovery and Dependency Graphs for IaC Monorepos
//!
//! tfmesh finds the infrastructure modules in a monorepo laid out by a
//! structure pattern (`{service}/{environment}/{region}/{module}`), resolves
//! the remote-state references and local module calls between them, and
//! answers ordering and impact questions over the resulting graph.
//!
//! ## Design Philosophy
//!
//! - **Facts, not parsing** - configuration files are parsed elsewhere; tfmesh consumes structured references
//! - **Best effort extraction** - unresolvable references become diagnostics, never aborts
//! - **Deterministic output** - orders, levels and sets are sorted, whatever the worker count
//! - **Library first** - the `tfmesh` binary is a thin layer over [`Analysis`]
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use tfmesh::{Analysis, Config, StaticReferences};
//!
//! let config = Config::load(Path::new("tfmesh.yaml"))?;
//! let references = StaticReferences::load(Path::new("references.json"))?;
//!
//! let analysis = Analysis::run(Path::new("/path/to/repo"), &config, &references)?;
//! for (level, modules) in analysis.graph.execution_levels()?.iter().enumerate() {
//!     println!("level {level}: {}", modules.join(", "));
//! }
//!
//! let affected = analysis.graph.get_affected_modules(&["platform/prod/eu-west-1/vpc"]);
//! println!("{} modules affected", affected.len());
//! # Ok::<(), tfmesh::Error>(())
//! ```

mod analysis;
mod changes;
mod config;
mod discovery;
mod error;
mod extract;
mod graph;
mod module;
mod paths;
mod types;

pub use analysis::Analysis;
pub use changes::ChangeSet;
pub use config::{
    Config, ExtractionConfig, StructureConfig, StructurePattern, DEFAULT_PATTERN, DEFAULT_WORKERS,
};
pub use discovery::{discover, DiscoveryOptions};
pub use error::{DiagnosticKind, Error, ExtractionDiagnostic, Result};
pub use extract::{
    expand, match_path, ExprError, Extractor, MatchContext, MatchStrategy, ReferenceSource,
    StaticReferences,
};
pub use graph::{Cycle, DependencyGraph, GraphEdge, GraphNode, GraphStats};
pub use module::{Module, ModuleIndex, SUBMODULE_FIELD};
pub use paths::{is_within, normalize};
pub use types::{
    Dependency, DependencyKind, ExtractionReport, ForEach, LibraryDependency, LocalValue,
    ModuleCall, ModuleDependencies, ParsedModule, RemoteStateRef,
};
