//! `tfmesh cycles` command implementation.

use colored::Colorize;

use super::Context;

/// Run the cycles command.
pub fn run(ctx: &Context) -> Result<(), tfmesh::Error> {
    let analysis = ctx.analyze()?;

    let cycles = analysis.graph.detect_cycles();

    if cycles.is_empty() {
        println!("{}", "No circular dependencies detected.".green());
        return Ok(());
    }

    println!(
        "Found {} circular dependencies:",
        cycles.len().to_string().red().bold()
    );
    println!();

    for (i, cycle) in cycles.iter().enumerate() {
        println!("  {} {}:", "Cycle".yellow().bold(), i + 1);
        println!("    {}", cycle.to_string().dimmed());
    }

    Ok(())
}
