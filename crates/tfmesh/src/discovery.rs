//! Module discovery.
//!
//! Walks a directory tree and turns every directory that sits inside the
//! configured depth range and holds at least one configuration file into a
//! [`Module`]. Placeholders of the structure pattern bind to path segments
//! positionally, so a module's identity is purely its location.
//!
//! Hidden directories, excluded directory names and directories without
//! configuration files are skipped silently. Any I/O failure while walking
//! aborts the whole scan: callers never see a partial module list.

use std::fs;
use std::path::Path;

use tracing::{debug, trace, warn};

use crate::config::{Config, StructurePattern};
use crate::error::{Error, Result};
use crate::module::{Module, ModuleIndex};

/// File suffixes recognized as module configuration sources.
const SOURCE_SUFFIXES: &[&str] = &[".tf", ".tf.json"];

/// `true` if a file name is a module configuration source.
pub(crate) fn is_source_file(name: &str) -> bool {
    SOURCE_SUFFIXES.iter().any(|s| name.ends_with(s))
}

/// Settings controlling which directories become modules.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Placeholder names bound to path segments.
    pub pattern: StructurePattern,
    /// Shallowest candidate depth (root is depth 0).
    pub min_depth: usize,
    /// Deepest candidate depth.
    pub max_depth: usize,
    /// Whether a module may contain other modules.
    pub allow_submodules: bool,
    /// Directory names never descended into.
    pub exclude: Vec<String>,
}

impl DiscoveryOptions {
    /// Derive options from a validated configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            pattern: config.structure_pattern()?,
            min_depth: config.structure.min_depth,
            max_depth: config.structure.max_depth,
            allow_submodules: config.structure.allow_submodules,
            exclude: config.exclude.clone(),
        })
    }

    fn is_excluded(&self, name: &str) -> bool {
        name.starts_with('.') || self.exclude.iter().any(|e| e == name)
    }
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        // Default config is always valid.
        let config = Config::default();
        Self {
            pattern: StructurePattern::default(),
            min_depth: config.structure.min_depth,
            max_depth: config.structure.max_depth,
            allow_submodules: config.structure.allow_submodules,
            exclude: config.exclude,
        }
    }
}

/// Discover every module below `root`.
///
/// # Errors
///
/// Returns [`Error::Discovery`] if the root or any directory below it cannot
/// be read, and [`Error::Config`] if the depth bounds are unusable.
pub fn discover(root: &Path, options: &DiscoveryOptions) -> Result<ModuleIndex> {
    if options.min_depth == 0 || options.max_depth < options.min_depth {
        return Err(Error::Config(format!(
            "invalid depth range [{}, {}]",
            options.min_depth, options.max_depth
        )));
    }

    let root = root.canonicalize().map_err(|source| Error::Discovery {
        path: root.to_path_buf(),
        source,
    })?;

    let mut walker = Walker {
        root: &root,
        options,
        modules: Vec::new(),
    };
    walker.walk(&root, &mut Vec::new(), false)?;

    debug!(
        root = %root.display(),
        module_count = walker.modules.len(),
        "Discovered modules"
    );

    ModuleIndex::new(options.pattern.clone(), walker.modules)
}

struct Walker<'a> {
    root: &'a Path,
    options: &'a DiscoveryOptions,
    modules: Vec<Module>,
}

impl Walker<'_> {
    /// Recursively walk `dir`, whose segments below the root are `segments`.
    fn walk(&mut self, dir: &Path, segments: &mut Vec<String>, inside_module: bool) -> Result<()> {
        let depth = segments.len();
        let entries = fs::read_dir(dir).map_err(|source| Error::Discovery {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut has_source = false;
        let mut subdirs = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|source| Error::Discovery {
                path: dir.to_path_buf(),
                source,
            })?;
            let file_type = entry.file_type().map_err(|source| Error::Discovery {
                path: entry.path(),
                source,
            })?;

            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                warn!(
                    directory = %dir.display(),
                    entry = ?entry.file_name(),
                    "Entry name is not valid UTF-8, skipping"
                );
                continue;
            };

            if file_type.is_file() {
                if is_source_file(name) {
                    has_source = true;
                }
            } else if file_type.is_dir() && !self.options.is_excluded(name) {
                subdirs.push(name.to_string());
            }
        }

        let in_range = (self.options.min_depth..=self.options.max_depth).contains(&depth);
        let is_module =
            in_range && has_source && (!inside_module || self.options.allow_submodules);

        if is_module {
            let module = Module::new(&self.options.pattern, self.root, segments.clone());
            trace!(module = %module.id(), "Found module");
            self.modules.push(module);
        } else if in_range && !has_source {
            trace!(directory = %dir.display(), "No configuration files, not a module");
        }

        if depth >= self.options.max_depth {
            return Ok(());
        }

        subdirs.sort();
        for name in subdirs {
            let child = dir.join(&name);
            segments.push(name);
            self.walk(&child, segments, inside_module || is_module)?;
            segments.pop();
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    fn ids(index: &ModuleIndex) -> Vec<&str> {
        index.iter().map(Module::id).collect()
    }

    #[test]
    fn finds_modules_at_pattern_depth() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "svc/prod/eu/vpc/main.tf");
        touch(dir.path(), "svc/prod/eu/eks/main.tf.json");
        touch(dir.path(), "svc/prod/eu/notes/README.md");

        let index = discover(dir.path(), &DiscoveryOptions::default()).unwrap();

        assert_eq!(ids(&index), ["svc/prod/eu/eks", "svc/prod/eu/vpc"]);
    }

    #[test]
    fn too_shallow_directories_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "svc/prod/main.tf");
        touch(dir.path(), "svc/prod/eu/vpc/main.tf");

        let index = discover(dir.path(), &DiscoveryOptions::default()).unwrap();

        assert_eq!(ids(&index), ["svc/prod/eu/vpc"]);
    }

    #[test]
    fn too_deep_directories_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "svc/prod/eu/eks/addons/extra/main.tf");

        let index = discover(dir.path(), &DiscoveryOptions::default()).unwrap();

        assert!(index.is_empty());
    }

    #[test]
    fn hidden_and_excluded_directories_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "svc/prod/eu/vpc/.terraform/modules/x/main.tf");
        touch(dir.path(), ".github/a/b/c/main.tf");
        touch(dir.path(), "_modules/kafka/acl/topic/main.tf");
        touch(dir.path(), "svc/prod/eu/vpc/main.tf");

        let index = discover(dir.path(), &DiscoveryOptions::default()).unwrap();

        assert_eq!(ids(&index), ["svc/prod/eu/vpc"]);
    }

    #[test]
    fn submodules_coexist_with_parent() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "svc/prod/eu/eks/main.tf");
        touch(dir.path(), "svc/prod/eu/eks/addons/main.tf");

        let index = discover(dir.path(), &DiscoveryOptions::default()).unwrap();

        assert_eq!(ids(&index), ["svc/prod/eu/eks", "svc/prod/eu/eks/addons"]);
        assert_eq!(
            index.parent("svc/prod/eu/eks/addons").map(Module::id),
            Some("svc/prod/eu/eks")
        );
    }

    #[test]
    fn submodules_are_dropped_when_disallowed() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "svc/prod/eu/eks/main.tf");
        touch(dir.path(), "svc/prod/eu/eks/addons/main.tf");
        let options = DiscoveryOptions {
            allow_submodules: false,
            ..DiscoveryOptions::default()
        };

        let index = discover(dir.path(), &options).unwrap();

        assert_eq!(ids(&index), ["svc/prod/eu/eks"]);
    }

    #[test]
    fn missing_root_is_fatal() {
        let result = discover(
            Path::new("/nonexistent/path/that/does/not/exist"),
            &DiscoveryOptions::default(),
        );

        assert!(matches!(result, Err(Error::Discovery { .. })));
    }

    #[test]
    fn module_paths_are_absolute_under_canonical_root() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "svc/prod/eu/vpc/main.tf");
        let root = dir.path().canonicalize().unwrap();

        let index = discover(dir.path(), &DiscoveryOptions::default()).unwrap();
        let vpc = index.get("svc/prod/eu/vpc").unwrap();

        assert_eq!(vpc.path(), root.join("svc/prod/eu/vpc"));
        assert!(vpc.path().is_absolute());
    }
}
