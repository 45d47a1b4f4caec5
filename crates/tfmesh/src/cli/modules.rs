//! `tfmesh modules` command implementation.

use colored::Colorize;
use serde::Serialize;

use super::display::{print_diagnostics, print_json};
use super::Context;

#[derive(Serialize)]
struct ModuleRow<'a> {
    id: &'a str,
    path: String,
    depends_on: &'a [String],
    dependents: Vec<&'a str>,
}

/// Run the modules command.
pub fn run(ctx: &Context, filters: &[String], json: bool) -> Result<(), tfmesh::Error> {
    let criteria = filters
        .iter()
        .map(|f| {
            f.split_once('=').ok_or_else(|| {
                tfmesh::Error::Config(format!("filter must look like FIELD=VALUE, got {f:?}"))
            })
        })
        .collect::<Result<Vec<(&str, &str)>, _>>()?;

    let analysis = ctx.analyze()?;
    let modules = analysis.index.find(&criteria);

    let mut rows = Vec::with_capacity(modules.len());
    for module in &modules {
        rows.push(ModuleRow {
            id: module.id(),
            path: module.relative_path().display().to_string(),
            depends_on: analysis
                .report
                .results
                .get(module.id())
                .map(|deps| deps.depends_on.as_slice())
                .unwrap_or_default(),
            dependents: analysis.graph.dependents(module.id())?,
        });
    }

    if json {
        return print_json(&rows);
    }

    println!(
        "{} {}",
        rows.len().to_string().green().bold(),
        "modules".white().bold()
    );
    for row in &rows {
        println!("  {}", row.id.cyan());
        if !row.depends_on.is_empty() {
            println!("    {} {}", "depends on".dimmed(), row.depends_on.join(", "));
        }
        if !row.dependents.is_empty() {
            println!("    {} {}", "used by".dimmed(), row.dependents.join(", "));
        }
    }

    print_diagnostics(&analysis.report.diagnostics);
    Ok(())
}
