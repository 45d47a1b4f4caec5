//! CLI command implementations.

mod display;

pub mod affected;
pub mod cycles;
pub mod dot;
pub mod levels;
pub mod modules;
pub mod order;
pub mod stats;

use std::path::PathBuf;

use tfmesh::{Analysis, Config, StaticReferences};

/// Configuration file picked up from the root when `--config` is absent.
const DEFAULT_CONFIG_FILE: &str = "tfmesh.yaml";

/// Global options shared by every command.
pub struct Context {
    /// Repository root as given on the command line.
    pub root: PathBuf,
    /// Explicit configuration file.
    pub config: Option<PathBuf>,
    /// Parsed reference data.
    pub references: Option<PathBuf>,
}

impl Context {
    /// Load the configuration: explicit file, root default file, or built-in defaults.
    pub fn config(&self) -> Result<Config, tfmesh::Error> {
        if let Some(path) = &self.config {
            return Config::load(path);
        }
        let default = self.root.join(DEFAULT_CONFIG_FILE);
        if default.is_file() {
            tracing::debug!(path = %default.display(), "Using configuration from root");
            return Config::load(&default);
        }
        Ok(Config::default())
    }

    /// Run the full analysis for this invocation.
    pub fn analyze(&self) -> Result<Analysis, tfmesh::Error> {
        let config = self.config()?;
        let references = match &self.references {
            Some(path) => StaticReferences::load(path)?,
            None => {
                tracing::warn!("No --references file given, modules will have no dependencies");
                StaticReferences::new()
            }
        };
        Analysis::run(&self.root, &config, &references)
    }
}
