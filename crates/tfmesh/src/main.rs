//! tfmesh CLI - Module ordering and impact analysis from the command line.
//!
//! tfmesh discovers the modules of an infrastructure monorepo, resolves the
//! references between them, and reports deployment order, parallel levels,
//! cycles and the modules affected by a change.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

mod cli;

/// tfmesh: Dependency graph for infrastructure-as-code monorepos.
#[derive(Parser)]
#[command(name = "tfmesh")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Repository root (defaults to current directory)
    #[arg(short, long, global = true)]
    root: Option<PathBuf>,

    /// YAML configuration file (defaults to `tfmesh.yaml` in the root, if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// JSON file mapping module IDs to parsed references
    #[arg(short = 'R', long, global = true)]
    references: Option<PathBuf>,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List discovered modules
    Modules {
        /// Only modules whose placeholder matches (e.g. `environment=prod`); repeatable
        #[arg(short, long, value_name = "FIELD=VALUE")]
        filter: Vec<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print modules in dependency order
    Order {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print modules grouped into parallel execution levels
    Levels {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Detect circular dependencies
    Cycles,

    /// Show the modules affected by a change
    Affected {
        /// Changed module ID; repeatable
        #[arg(short, long = "module")]
        modules: Vec<String>,

        /// Changed file (relative to the root or absolute); repeatable
        #[arg(short, long = "file")]
        files: Vec<PathBuf>,

        /// Changed library directory; repeatable
        #[arg(short, long = "library")]
        libraries: Vec<PathBuf>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Export the graph in Graphviz DOT format
    Dot {
        /// Restrict the export to these module IDs; repeatable
        #[arg(short, long = "module")]
        modules: Vec<String>,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show graph statistics and extraction diagnostics
    Stats,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = match cli.root {
        Some(r) => r,
        None => match std::env::current_dir() {
            Ok(dir) => dir,
            Err(e) => {
                eprintln!(
                    "{}: failed to get current directory: {e}",
                    "error".red().bold()
                );
                return ExitCode::FAILURE;
            }
        },
    };
    let ctx = cli::Context {
        root,
        config: cli.config,
        references: cli.references,
    };

    let result = match cli.command {
        Commands::Modules { filter, json } => cli::modules::run(&ctx, &filter, json),
        Commands::Order { json } => cli::order::run(&ctx, json),
        Commands::Levels { json } => cli::levels::run(&ctx, json),
        Commands::Cycles => cli::cycles::run(&ctx),
        Commands::Affected {
            modules,
            files,
            libraries,
            json,
        } => cli::affected::run(&ctx, &modules, &files, &libraries, json),
        Commands::Dot { modules, output } => cli::dot::run(&ctx, &modules, output.as_deref()),
        Commands::Stats => cli::stats::run(&ctx),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {e}", "error".red().bold());
            // Show cause chain for nested errors
            let mut source = std::error::Error::source(&e);
            while let Some(cause) = source {
                eprintln!("  {}: {cause}", "caused by".dimmed());
                source = std::error::Error::source(cause);
            }
            ExitCode::FAILURE
        }
    }
}
