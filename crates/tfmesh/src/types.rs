//! Core types for tfmesh.
//!
//! This module defines the data structures exchanged with callers:
//! - **Reference input**: `ParsedModule`, `RemoteStateRef`, `ModuleCall`, `ForEach`, `LocalValue`
//!   (produced by an external configuration parser)
//! - **Extraction output**: `Dependency`, `LibraryDependency`, `ModuleDependencies`, `ExtractionReport`
//!
//! ## Design Decisions
//!
//! | Decision | Choice | Rationale |
//! |----------|--------|-----------|
//! | Result maps | `BTreeMap` | Deterministic iteration regardless of worker scheduling |
//! | `Dependency::to` | `Option` | An unmatched candidate becomes a diagnostic, not an edge |
//! | Library usages | Separate list | Tracked for impact only, never graph edges |

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ExtractionDiagnostic;

// ============================================================================
// Reference input
// ============================================================================

/// Structured reference data for one module, as produced by a config parser.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsedModule {
    /// Remote-state reference blocks.
    pub remote_states: Vec<RemoteStateRef>,
    /// Module-call blocks.
    pub module_calls: Vec<ModuleCall>,
    /// Statically known local values, by name.
    pub locals: BTreeMap<String, LocalValue>,
}

/// A declared read-only link to another module's persisted state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteStateRef {
    /// Block label.
    pub name: String,
    /// State backend type (`s3`, `gcs`, `local`, ...).
    #[serde(default)]
    pub backend: String,
    /// Raw path expression (state key or local path), possibly interpolated.
    pub path: String,
    /// Present when the block is iterated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub for_each: Option<ForEach>,
}

impl RemoteStateRef {
    /// Non-iterated reference with a static or interpolated path.
    #[must_use]
    pub fn new(name: impl Into<String>, backend: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            backend: backend.into(),
            path: path.into(),
            for_each: None,
        }
    }

    /// Attach a for-each source.
    #[must_use]
    pub fn with_for_each(mut self, for_each: ForEach) -> Self {
        self.for_each = Some(for_each);
        self
    }
}

/// Source of iteration for a `for_each` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForEach {
    /// Literal set or list; `each.key` and `each.value` are both the element.
    List(Vec<String>),
    /// Literal map; `each.key` is the key, `each.value` the value.
    Map(BTreeMap<String, String>),
    /// Expression naming the collection, e.g. `local.regions` or `var.envs`.
    Reference(String),
}

/// A `module` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleCall {
    /// Block label.
    pub name: String,
    /// Raw `source` string.
    pub source: String,
    /// `true` when the parser classified the source as a local filesystem path.
    #[serde(default)]
    pub is_local: bool,
}

impl ModuleCall {
    /// Module call with a local filesystem source.
    #[must_use]
    pub fn local(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            is_local: true,
        }
    }
}

/// Value of a local, as far as it can be known statically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocalValue {
    /// String, number or bool rendered as text.
    Scalar(String),
    /// List or set of scalars.
    List(Vec<String>),
    /// Map of scalars.
    Map(BTreeMap<String, String>),
}

// ============================================================================
// Extraction output
// ============================================================================

/// How a dependency was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DependencyKind {
    /// Reads another module's remote state.
    RemoteState,
    /// Includes another module's directory by local module call.
    Library,
}

impl DependencyKind {
    /// Stable string form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RemoteState => "remote-state",
            Self::Library => "library",
        }
    }
}

impl std::fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Edge candidate produced during extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    /// Referencing module.
    pub from: String,
    /// Referenced module, `None` when no matcher succeeded.
    pub to: Option<String>,
    /// Declaration kind.
    pub kind: DependencyKind,
    /// Label of the declaring block.
    pub reference_name: String,
}

/// Inclusion of a reusable library fragment by path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LibraryDependency {
    /// Label of the module call.
    pub module_call: String,
    /// Normalized absolute path of the library directory.
    pub path: PathBuf,
}

/// Everything extracted for one module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModuleDependencies {
    /// Module the bundle belongs to.
    pub module: String,
    /// Resolved dependencies, in declaration order.
    pub dependencies: Vec<Dependency>,
    /// Library usages, in declaration order.
    pub library_dependencies: Vec<LibraryDependency>,
    /// Deduplicated IDs this module depends on, in first-seen order.
    pub depends_on: Vec<String>,
    /// Problems found while extracting this module.
    #[serde(skip)]
    pub errors: Vec<ExtractionDiagnostic>,
}

impl ModuleDependencies {
    /// Empty bundle for a module.
    #[must_use]
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            ..Self::default()
        }
    }

    /// Record a resolved dependency.
    ///
    /// Unresolved candidates and self-references are ignored; duplicates of an
    /// already-recorded `(to, kind, reference_name)` are dropped.
    pub fn push_dependency(&mut self, dependency: Dependency) {
        let Some(to) = dependency.to.as_deref() else {
            return;
        };
        if to == self.module {
            return;
        }
        if !self.depends_on.iter().any(|d| d == to) {
            self.depends_on.push(to.to_string());
        }
        if !self.dependencies.contains(&dependency) {
            self.dependencies.push(dependency);
        }
    }

    /// Record a library usage, ignoring exact duplicates.
    pub fn push_library(&mut self, library: LibraryDependency) {
        if !self.library_dependencies.contains(&library) {
            self.library_dependencies.push(library);
        }
    }

    /// `true` when extraction produced no diagnostics.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Aggregate output of extracting every module in an index.
#[derive(Debug, Clone, Default)]
pub struct ExtractionReport {
    /// Per-module results keyed by module ID.
    pub results: BTreeMap<String, ModuleDependencies>,
    /// Every diagnostic from every module, sorted by module then kind.
    pub diagnostics: Vec<ExtractionDiagnostic>,
}

impl ExtractionReport {
    /// Total number of resolved dependencies across all modules.
    #[must_use]
    pub fn dependency_count(&self) -> usize {
        self.results.values().map(|r| r.dependencies.len()).sum()
    }
}
