//! Parallel extraction across an entire module index.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        extract_all                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Bounded rayon pool (default 20 threads)                    │
//! │    per module: source.references() ─► Extractor::extract    │
//! │    panics and parse failures become diagnostics             │
//! │  Collector (Mutex<BTreeMap>, Mutex<Vec>) ─► ExtractionReport│
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Workers never wait on each other and never cancel each other. The
//! collected maps are ordered, so the report is identical whatever the pool
//! size or scheduling.

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, PoisonError};

use rayon::prelude::*;
use tracing::{debug, error};

use super::{Extractor, ReferenceSource};
use crate::error::{DiagnosticKind, Error, ExtractionDiagnostic, Result};
use crate::module::Module;
use crate::types::{ExtractionReport, ModuleDependencies};

/// Append-only sink shared by all workers.
#[derive(Debug, Default)]
struct Collector {
    results: Mutex<BTreeMap<String, ModuleDependencies>>,
    diagnostics: Mutex<Vec<ExtractionDiagnostic>>,
}

impl Collector {
    fn record(&self, deps: ModuleDependencies) {
        if !deps.errors.is_empty() {
            self.diagnostics
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .extend(deps.errors.iter().cloned());
        }
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(deps.module.clone(), deps);
    }

    fn finish(self) -> ExtractionReport {
        let results = self
            .results
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        let mut diagnostics = self
            .diagnostics
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        diagnostics.sort_by(|a, b| {
            (&a.module, a.kind, &a.reference, &a.message)
                .cmp(&(&b.module, b.kind, &b.reference, &b.message))
        });
        ExtractionReport {
            results,
            diagnostics,
        }
    }
}

impl Extractor<'_> {
    /// Extract every module in the index using at most `workers` threads.
    ///
    /// Every module gets an entry in the report, even when its parse step
    /// failed or its worker panicked; those cases are reported as
    /// diagnostics on an empty bundle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Internal`] only if the worker pool cannot be started.
    pub fn extract_all<S>(&self, source: &S, workers: usize) -> Result<ExtractionReport>
    where
        S: ReferenceSource + ?Sized,
    {
        let workers = workers.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("tfmesh-extract-{i}"))
            .build()
            .map_err(|e| Error::Internal(format!("failed to start extraction pool: {e}")))?;

        let collector = Collector::default();
        pool.install(|| {
            self.index().modules().par_iter().for_each(|module| {
                collector.record(self.extract_guarded(source, module));
            });
        });

        let report = collector.finish();
        debug!(
            modules = report.results.len(),
            dependencies = report.dependency_count(),
            diagnostics = report.diagnostics.len(),
            workers,
            "Extraction finished"
        );
        Ok(report)
    }

    /// Parse and extract one module, converting every failure into a diagnostic.
    fn extract_guarded<S>(&self, source: &S, module: &Module) -> ModuleDependencies
    where
        S: ReferenceSource + ?Sized,
    {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            match source.references(module) {
                Ok(parsed) => self.extract(module, &parsed),
                Err(e) => {
                    let mut deps = ModuleDependencies::new(module.id());
                    deps.errors
                        .push(ExtractionDiagnostic::parse_failed(module.id(), e.to_string()));
                    deps
                }
            }
        }));

        outcome.unwrap_or_else(|payload| {
            let msg = if let Some(s) = payload.downcast_ref::<&str>() {
                format!("worker panicked: {s}")
            } else if let Some(s) = payload.downcast_ref::<String>() {
                format!("worker panicked: {s}")
            } else {
                "worker panicked with unknown payload".to_string()
            };
            error!(module = %module.id(), panic_msg = %msg, "Extraction worker panicked");
            let mut deps = ModuleDependencies::new(module.id());
            deps.errors.push(ExtractionDiagnostic::new(
                module.id(),
                DiagnosticKind::WorkerFailed,
                None,
                msg,
            ));
            deps
        })
    }
}
