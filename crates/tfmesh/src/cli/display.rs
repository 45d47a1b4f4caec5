//! Common display utilities for CLI commands.

use colored::Colorize;
use serde::Serialize;
use tfmesh::ExtractionDiagnostic;

const MAX_DISPLAY_ITEMS: usize = 10;

/// Print a bulleted list of module IDs, or `empty_message` if there are none.
pub fn print_ids<S: AsRef<str>>(ids: &[S], empty_message: &str) {
    if ids.is_empty() {
        println!("    {}", empty_message.dimmed());
        return;
    }
    for id in ids {
        println!("    {} {}", "•".dimmed(), id.as_ref());
    }
}

/// Print a value as pretty JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), tfmesh::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Summarize extraction diagnostics on stderr.
///
/// Shows up to `MAX_DISPLAY_ITEMS` diagnostics, then "... and N more".
pub fn print_diagnostics(diagnostics: &[ExtractionDiagnostic]) {
    if diagnostics.is_empty() {
        return;
    }

    eprintln!(
        "{}: {} references could not be resolved",
        "warning".yellow().bold(),
        diagnostics.len()
    );
    for diag in diagnostics.iter().take(MAX_DISPLAY_ITEMS) {
        eprintln!("    {} {}", "•".dimmed(), diag);
    }
    if diagnostics.len() > MAX_DISPLAY_ITEMS {
        eprintln!(
            "    {} ... and {} more",
            "•".dimmed(),
            diagnostics.len() - MAX_DISPLAY_ITEMS
        );
    }
}
