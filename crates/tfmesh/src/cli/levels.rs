//! `tfmesh levels` command implementation.

use colored::Colorize;

use super::display::{print_diagnostics, print_ids, print_json};
use super::Context;

/// Run the levels command.
pub fn run(ctx: &Context, json: bool) -> Result<(), tfmesh::Error> {
    let analysis = ctx.analyze()?;
    let levels = analysis.graph.execution_levels()?;

    if json {
        return print_json(&levels);
    }

    println!(
        "{} modules in {} levels",
        analysis.graph.len().to_string().green().bold(),
        levels.len().to_string().green().bold()
    );
    for (i, level) in levels.iter().enumerate() {
        println!();
        println!("  {} {} ({} modules):", "Level".yellow().bold(), i, level.len());
        print_ids(level, "(empty)");
    }

    print_diagnostics(&analysis.report.diagnostics);
    Ok(())
}
