//! `tfmesh stats` command implementation.

use colored::Colorize;

use super::display::print_diagnostics;
use super::Context;

/// Run the stats command.
pub fn run(ctx: &Context) -> Result<(), tfmesh::Error> {
    let analysis = ctx.analyze()?;
    let stats = analysis.graph.stats();

    println!("{}", "tfmesh Graph Statistics".cyan().bold());
    println!();
    println!("  {}: {}", "Root".white().bold(), analysis.root.display());
    println!(
        "  {}: {}",
        "Modules".white().bold(),
        stats.nodes.to_string().green()
    );
    println!(
        "  {}: {}",
        "Dependencies".white().bold(),
        stats.edges.to_string().green()
    );
    println!("  {}: {}", "Without dependencies".white().bold(), stats.roots);
    println!("  {}: {}", "Without dependents".white().bold(), stats.leaves);
    println!("  {}: {}", "Isolated".white().bold(), stats.isolated);

    let cycles = analysis.graph.detect_cycles().len();
    let cycle_str = if cycles == 0 {
        "none".green()
    } else {
        cycles.to_string().red().bold()
    };
    println!("  {}: {}", "Cycles".white().bold(), cycle_str);

    let diagnostics = &analysis.report.diagnostics;
    let internal = diagnostics
        .iter()
        .filter(|d| d.kind.is_internal_error())
        .count();
    println!(
        "  {}: {} ({} internal)",
        "Diagnostics".white().bold(),
        diagnostics.len(),
        internal
    );
    println!();

    print_diagnostics(diagnostics);
    Ok(())
}
