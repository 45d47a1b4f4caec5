//! `tfmesh order` command implementation.

use colored::Colorize;

use super::display::{print_diagnostics, print_json};
use super::Context;

/// Run the order command.
pub fn run(ctx: &Context, json: bool) -> Result<(), tfmesh::Error> {
    let analysis = ctx.analyze()?;
    let order = analysis.graph.topological_sort()?;

    if json {
        return print_json(&order);
    }

    println!("{}", "Deployment order".cyan().bold());
    for (i, id) in order.iter().enumerate() {
        println!("  {:>4}. {id}", i + 1);
    }

    print_diagnostics(&analysis.report.diagnostics);
    Ok(())
}
