//! Sources of structured reference data.
//!
//! Parsing configuration files is somebody else's job. Extraction consumes
//! the parser's output through [`ReferenceSource`]; [`StaticReferences`] is
//! the in-memory form, loadable from the JSON the CLI accepts.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::module::Module;
use crate::types::ParsedModule;

/// Supplies structured reference data for a module.
///
/// Implementations must be safe to call from several worker threads at once;
/// any timeout or cancellation policy belongs inside the implementation.
pub trait ReferenceSource: Send + Sync {
    /// Produce the reference data declared by `module`.
    fn references(&self, module: &Module) -> Result<ParsedModule>;
}

impl<F> ReferenceSource for F
where
    F: Fn(&Module) -> Result<ParsedModule> + Send + Sync,
{
    fn references(&self, module: &Module) -> Result<ParsedModule> {
        self(module)
    }
}

/// Pre-parsed reference data keyed by module ID.
///
/// Modules without an entry declare no references.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticReferences {
    modules: BTreeMap<String, ParsedModule>,
}

impl StaticReferences {
    /// Empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the reference data of one module.
    pub fn insert(&mut self, id: impl Into<String>, parsed: ParsedModule) {
        self.modules.insert(id.into(), parsed);
    }

    /// Parse a JSON object mapping module ID to reference data.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON reference file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read references {}: {e}", path.display()))
        })?;
        Self::from_json_str(&content)
    }

    /// Number of modules with reference data.
    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// `true` when no module has reference data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl ReferenceSource for StaticReferences {
    fn references(&self, module: &Module) -> Result<ParsedModule> {
        Ok(self.modules.get(module.id()).cloned().unwrap_or_default())
    }
}
