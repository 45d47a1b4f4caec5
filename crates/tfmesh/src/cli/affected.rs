//! `tfmesh affected` command implementation.

use std::collections::BTreeSet;
use std::path::PathBuf;

use colored::Colorize;

use super::display::{print_ids, print_json};
use super::Context;

/// Run the affected command.
///
/// Changed files are classified into modules and library directories and
/// merged with the explicitly named modules and libraries.
pub fn run(
    ctx: &Context,
    modules: &[String],
    files: &[PathBuf],
    libraries: &[PathBuf],
    json: bool,
) -> Result<(), tfmesh::Error> {
    if modules.is_empty() && files.is_empty() && libraries.is_empty() {
        return Err(tfmesh::Error::Config(
            "nothing changed: pass --module, --file or --library".to_string(),
        ));
    }

    let analysis = ctx.analyze()?;
    let changes = analysis.classify(files);

    for id in modules {
        if !analysis.graph.contains(id) {
            tracing::warn!(module = %id, "Unknown module, ignoring");
        }
    }

    let changed_modules: BTreeSet<&str> = modules
        .iter()
        .map(String::as_str)
        .chain(changes.modules.iter().map(String::as_str))
        .collect();
    let changed_libraries: BTreeSet<PathBuf> = libraries
        .iter()
        .map(|lib| tfmesh::normalize(&analysis.root.join(lib)))
        .chain(changes.library_paths.iter().cloned())
        .collect();

    let changed_modules: Vec<&str> = changed_modules.into_iter().collect();
    let changed_libraries: Vec<PathBuf> = changed_libraries.into_iter().collect();
    let affected = analysis
        .graph
        .get_affected_modules_with_libraries(&changed_modules, &changed_libraries);

    if json {
        return print_json(&affected);
    }

    println!("{}", "Changed modules:".white().bold());
    print_ids(&changed_modules, "(none)");
    if !changed_libraries.is_empty() {
        println!("{}", "Changed libraries:".white().bold());
        for lib in &changed_libraries {
            println!("    {} {}", "•".dimmed(), lib.display());
        }
    }
    println!();
    println!(
        "{} {}",
        affected.len().to_string().green().bold(),
        "affected modules:".white().bold()
    );
    print_ids(&affected, "(none)");

    Ok(())
}
