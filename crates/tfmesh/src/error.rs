//! Error types for tfmesh operations.
//!
//! Errors are split into two families:
//!
//! - **`Error`**: Top-level errors that halt an operation (unreadable tree,
//!   invalid configuration, a cycle blocking an ordering query)
//! - **`ExtractionDiagnostic`**: Per-module problems that are collected while
//!   extracting dependencies but never stop the run
//!
//! ## Error Philosophy
//!
//! Extraction is "best effort":
//! - One unresolvable reference shouldn't hide the references that did resolve
//! - One module failing to parse shouldn't stop its siblings
//! - Only discovery I/O failures, bad configuration, and cycles surface as `Error`
//!
//! ## Diagnostic Categorization
//!
//! `DiagnosticKind` uses an HTTP-style 4xx/5xx split:
//! - Input problems (the configuration under analysis is at fault)
//! - Internal problems (a worker itself failed)

use std::path::PathBuf;
use thiserror::Error;

use crate::graph::Cycle;

/// Result type for tfmesh operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for tfmesh operations.
#[derive(Debug, Error)]
pub enum Error {
    /// File system operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Walking the module tree failed; no partial module list is produced
    #[error("discovery failed at {}: {source}", .path.display())]
    Discovery {
        /// Directory that could not be read
        path: PathBuf,
        /// Underlying I/O failure
        source: std::io::Error,
    },

    /// Invalid configuration or arguments
    #[error("configuration error: {0}")]
    Config(String),

    /// The graph contains at least one cycle, so no valid order exists
    #[error("dependency cycle detected: {}", format_cycles(.cycles))]
    CycleDetected {
        /// Every cycle found when the ordering failed
        cycles: Vec<Cycle>,
    },

    /// A module ID was not present in the index or graph
    #[error("module not found: {0}")]
    ModuleNotFound(String),

    /// Reference data for a module could not be produced
    #[error("failed to parse module {module}: {message}")]
    Parse {
        /// Module whose sources failed to parse
        module: String,
        /// Parser-supplied description
        message: String,
    },

    /// JSON (de)serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML (de)serialization failed
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Internal invariant violated (e.g., worker pool could not start)
    #[error("internal error: {0}")]
    Internal(String),
}

fn format_cycles(cycles: &[Cycle]) -> String {
    if cycles.is_empty() {
        return "(cycle path unavailable)".to_string();
    }
    cycles
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Problem encountered while extracting dependencies of a single module.
///
/// Diagnostics are collected during extraction but don't halt it. The
/// extractor continues with the remaining references and modules and
/// reports every diagnostic at the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionDiagnostic {
    /// ID of the module that declared the reference
    pub module: String,
    /// Category of the problem
    pub kind: DiagnosticKind,
    /// Name of the offending reference block, if any
    pub reference: Option<String>,
    /// Human-readable description, including the unresolved path when known
    pub message: String,
}

impl std::fmt::Display for ExtractionDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.reference {
            Some(reference) => write!(
                f,
                "{} ({}): {} ({})",
                self.module, reference, self.message, self.kind
            ),
            None => write!(f, "{}: {} ({})", self.module, self.message, self.kind),
        }
    }
}

impl std::error::Error for ExtractionDiagnostic {}

/// Categorization of extraction diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiagnosticKind {
    // === Input Problems (analogous to HTTP 4xx) ===
    /// Path expression still contains runtime-only constructs after substitution
    UnresolvedExpression,

    /// A for-each source could not be turned into a concrete collection
    UnresolvedIterable,

    /// A concrete path matched no module in the index
    UnmatchedReference,

    /// The external parser could not produce reference data for the module
    ParseFailed,

    // === Internal Problems (analogous to HTTP 5xx) ===
    /// The worker processing this module failed unexpectedly
    WorkerFailed,
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnresolvedExpression => write!(f, "unresolved expression"),
            Self::UnresolvedIterable => write!(f, "unresolved iterable"),
            Self::UnmatchedReference => write!(f, "unmatched reference"),
            Self::ParseFailed => write!(f, "parse failed"),
            Self::WorkerFailed => write!(f, "worker failed"),
        }
    }
}

impl DiagnosticKind {
    /// Returns `true` if this is an input problem (4xx-style).
    #[must_use]
    pub fn is_input_error(self) -> bool {
        !self.is_internal_error()
    }

    /// Returns `true` if this is an internal problem (5xx-style).
    #[must_use]
    pub fn is_internal_error(self) -> bool {
        matches!(self, Self::WorkerFailed)
    }
}

impl ExtractionDiagnostic {
    /// Create a new diagnostic.
    #[must_use]
    pub fn new(
        module: impl Into<String>,
        kind: DiagnosticKind,
        reference: Option<&str>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            module: module.into(),
            kind,
            reference: reference.map(str::to_string),
            message: message.into(),
        }
    }

    /// A reference path that no matcher strategy could resolve.
    #[must_use]
    pub fn unmatched(module: &str, reference: &str, path: &str) -> Self {
        Self::new(
            module,
            DiagnosticKind::UnmatchedReference,
            Some(reference),
            format!("no module matches path '{path}'"),
        )
    }

    /// A path expression left with runtime-only constructs.
    #[must_use]
    pub fn unresolved_expression(module: &str, reference: &str, expr: &str) -> Self {
        Self::new(
            module,
            DiagnosticKind::UnresolvedExpression,
            Some(reference),
            format!("path expression cannot be resolved statically: '{expr}'"),
        )
    }

    /// A for-each source that doesn't resolve to a collection.
    #[must_use]
    pub fn unresolved_iterable(module: &str, reference: &str, source: &str) -> Self {
        Self::new(
            module,
            DiagnosticKind::UnresolvedIterable,
            Some(reference),
            format!("for_each source cannot be resolved: '{source}'"),
        )
    }

    /// The parse step for a module failed.
    #[must_use]
    pub fn parse_failed(module: &str, message: impl Into<String>) -> Self {
        Self::new(module, DiagnosticKind::ParseFailed, None, message)
    }
}
