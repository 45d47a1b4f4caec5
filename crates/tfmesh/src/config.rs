//! Configuration for discovery and extraction.
//!
//! Configuration is read from YAML. Every field has a default so an empty
//! document is a valid configuration:
//!
//! ```yaml
//! structure:
//!   pattern: "{service}/{environment}/{region}/{module}"
//!   min_depth: 4
//!   max_depth: 5
//!   allow_submodules: true
//! exclude:
//!   - _modules
//! library_roots:
//!   - _modules
//! extraction:
//!   workers: 20
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default cap on concurrent extraction workers.
pub const DEFAULT_WORKERS: usize = 20;

/// Default directory layout of a module.
pub const DEFAULT_PATTERN: &str = "{service}/{environment}/{region}/{module}";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How module directories are laid out.
    pub structure: StructureConfig,
    /// Directory names never descended into during discovery.
    pub exclude: Vec<String>,
    /// Roots of reusable library modules. Relative entries are resolved
    /// against the discovery root.
    pub library_roots: Vec<PathBuf>,
    /// Dependency extraction settings.
    pub extraction: ExtractionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            structure: StructureConfig::default(),
            exclude: vec!["_modules".to_string()],
            library_roots: vec![PathBuf::from("_modules")],
            extraction: ExtractionConfig::default(),
        }
    }
}

/// Directory structure settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructureConfig {
    /// Slash-separated list of `{placeholder}` segments.
    pub pattern: String,
    /// Shallowest directory depth (relative to the root) that can be a module.
    pub min_depth: usize,
    /// Deepest directory depth that can be a module.
    pub max_depth: usize,
    /// Whether directories nested below a module may be modules themselves.
    pub allow_submodules: bool,
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_PATTERN.to_string(),
            min_depth: 4,
            max_depth: 5,
            allow_submodules: true,
        }
    }
}

/// Extraction settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Maximum number of modules processed concurrently.
    pub workers: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
        }
    }
}

impl Config {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Check that the settings describe a usable layout.
    pub fn validate(&self) -> Result<()> {
        let pattern = self.structure_pattern()?;
        let structure = &self.structure;

        if structure.min_depth == 0 {
            return Err(Error::Config("min_depth must be at least 1".to_string()));
        }
        if structure.max_depth < structure.min_depth {
            return Err(Error::Config(format!(
                "max_depth ({}) is less than min_depth ({})",
                structure.max_depth, structure.min_depth
            )));
        }
        if pattern.len() > structure.min_depth {
            return Err(Error::Config(format!(
                "pattern has {} segments but min_depth is {}",
                pattern.len(),
                structure.min_depth
            )));
        }
        if self.extraction.workers == 0 {
            return Err(Error::Config("extraction.workers must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Parse the configured structure pattern.
    pub fn structure_pattern(&self) -> Result<StructurePattern> {
        StructurePattern::parse(&self.structure.pattern)
    }

    /// Library roots as absolute paths under `root`.
    #[must_use]
    pub fn resolved_library_roots(&self, root: &Path) -> Vec<PathBuf> {
        self.library_roots
            .iter()
            .map(|lib| {
                if lib.is_absolute() {
                    crate::paths::normalize(lib)
                } else {
                    crate::paths::normalize(&root.join(lib))
                }
            })
            .collect()
    }
}

/// Ordered list of named placeholders bound positionally to path segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructurePattern {
    names: Vec<String>,
}

impl StructurePattern {
    /// Parse a pattern such as `{service}/{environment}/{region}/{module}`.
    pub fn parse(pattern: &str) -> Result<Self> {
        let mut names = Vec::new();
        for segment in pattern.split('/').filter(|s| !s.is_empty()) {
            let name = segment
                .strip_prefix('{')
                .and_then(|s| s.strip_suffix('}'))
                .filter(|s| !s.is_empty() && !s.contains(['{', '}']))
                .ok_or_else(|| {
                    Error::Config(format!(
                        "pattern segment '{segment}' is not a {{placeholder}}"
                    ))
                })?;
            if names.iter().any(|n| n == name) {
                return Err(Error::Config(format!("placeholder '{name}' appears twice")));
            }
            names.push(name.to_string());
        }

        if names.is_empty() {
            return Err(Error::Config("structure pattern is empty".to_string()));
        }
        Ok(Self { names })
    }

    /// Placeholder names in order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of placeholders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always `false`; an empty pattern fails to parse.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Position of a placeholder.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

impl Default for StructurePattern {
    fn default() -> Self {
        Self {
            names: ["service", "environment", "region", "module"]
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn empty_document_yields_defaults() {
        let config = Config::from_yaml_str("{}").expect("empty config should be valid");

        assert_eq!(config, Config::default());
        assert_eq!(config.extraction.workers, DEFAULT_WORKERS);
        assert_eq!(
            config.structure_pattern().unwrap(),
            StructurePattern::default()
        );
    }

    #[test]
    fn partial_document_keeps_other_defaults() {
        let config = Config::from_yaml_str(
            "structure:\n  pattern: \"{team}/{stage}/{module}\"\n  min_depth: 3\n  max_depth: 4\n",
        )
        .expect("config should be valid");

        assert_eq!(config.structure.min_depth, 3);
        assert!(config.structure.allow_submodules);
        assert_eq!(config.structure_pattern().unwrap().names(), ["team", "stage", "module"]);
    }

    #[rstest]
    #[case::zero_min("structure:\n  min_depth: 0\n  max_depth: 0\n  pattern: \"{a}\"\n")]
    #[case::inverted_depths("structure:\n  min_depth: 4\n  max_depth: 3\n")]
    #[case::pattern_too_long("structure:\n  min_depth: 2\n  max_depth: 3\n")]
    #[case::zero_workers("extraction:\n  workers: 0\n")]
    #[case::literal_segment("structure:\n  pattern: \"{service}/live/{module}\"\n")]
    #[case::duplicate_placeholder("structure:\n  pattern: \"{a}/{a}\"\n")]
    fn invalid_documents_are_rejected(#[case] yaml: &str) {
        let result = Config::from_yaml_str(yaml);

        assert!(
            matches!(result, Err(Error::Config(_))),
            "expected config error, got {result:?}"
        );
    }

    #[test]
    fn relative_library_roots_resolve_under_root() {
        let config = Config::default();

        let roots = config.resolved_library_roots(Path::new("/repo"));

        assert_eq!(roots, vec![PathBuf::from("/repo/_modules")]);
    }

    #[test]
    fn pattern_position_lookup() {
        let pattern = StructurePattern::default();

        assert_eq!(pattern.position("region"), Some(2));
        assert_eq!(pattern.position("submodule"), None);
        assert_eq!(pattern.len(), 4);
    }
}
