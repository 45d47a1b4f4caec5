//! `tfmesh dot` command implementation.

use std::path::Path;

use super::Context;

/// Run the dot command.
pub fn run(ctx: &Context, modules: &[String], output: Option<&Path>) -> Result<(), tfmesh::Error> {
    let analysis = ctx.analyze()?;

    let dot = if modules.is_empty() {
        analysis.graph.to_dot()
    } else {
        analysis.graph.subgraph(modules).to_dot()
    };

    match output {
        Some(path) => {
            std::fs::write(path, &dot)?;
            tracing::info!(path = %path.display(), "Wrote DOT graph");
        }
        None => print!("{dot}"),
    }
    Ok(())
}
