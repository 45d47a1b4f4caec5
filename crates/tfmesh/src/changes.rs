//! Classification of changed files.
//!
//! The list of changed files comes from version control, outside this crate.
//! Each file is attributed either to a library directory (when it lies under
//! a library root) or to the deepest module containing it. Everything else
//! (repository docs, CI config) is ignored.
//!
//! A library file belongs to the nearest enclosing directory that holds
//! configuration sources, so templates and other assets in plain subfolders
//! count as changes to the library that loads them. When no such directory
//! exists on disk (a deleted library, say) the top-level directory under the
//! library root is used.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, trace};

use crate::discovery::is_source_file;
use crate::module::ModuleIndex;
use crate::paths;

/// Changed module IDs and library directories derived from a file list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    /// Changed module IDs, sorted.
    pub modules: Vec<String>,
    /// Directories of changed library files, sorted.
    pub library_paths: Vec<PathBuf>,
}

impl ChangeSet {
    /// Classify `changed_files`.
    ///
    /// Relative paths are resolved against `root`. `library_roots` must be
    /// absolute.
    #[must_use]
    pub fn classify<P: AsRef<Path>>(
        index: &ModuleIndex,
        root: &Path,
        library_roots: &[PathBuf],
        changed_files: &[P],
    ) -> Self {
        let mut modules = BTreeSet::new();
        let mut library_paths = BTreeSet::new();

        for file in changed_files {
            let file = paths::normalize(&root.join(file.as_ref()));

            if let Some(library_root) = library_roots.iter().find(|r| paths::is_within(&file, r)) {
                library_paths.insert(library_directory(&file, library_root));
                continue;
            }

            match index.module_for_path(&file) {
                Some(module) => {
                    modules.insert(module.id().to_string());
                }
                None => debug!(path = %file.display(), "Changed file belongs to no module"),
            }
        }

        Self {
            modules: modules.into_iter().collect(),
            library_paths: library_paths.into_iter().collect(),
        }
    }

    /// `true` when nothing relevant changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty() && self.library_paths.is_empty()
    }
}

/// Library directory a changed `file` under `library_root` belongs to.
fn library_directory(file: &Path, library_root: &Path) -> PathBuf {
    let Some(dir) = file.parent() else {
        return file.to_path_buf();
    };

    let name = file.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    if is_source_file(name) {
        return dir.to_path_buf();
    }

    if let Some(found) = dir
        .ancestors()
        .take_while(|d| paths::is_within(d, library_root))
        .find(|d| holds_sources(d))
    {
        return found.to_path_buf();
    }

    let top = file
        .strip_prefix(library_root)
        .ok()
        .and_then(|rel| rel.components().next())
        .filter(|_| dir != library_root)
        .map_or_else(|| library_root.to_path_buf(), |c| library_root.join(c));
    trace!(
        file = %file.display(),
        library = %top.display(),
        "No configuration directory above changed file, using top-level library directory"
    );
    top
}

fn holds_sources(dir: &Path) -> bool {
    fs::read_dir(dir).is_ok_and(|entries| {
        entries
            .filter_map(std::result::Result::ok)
            .any(|e| e.file_name().to_str().is_some_and(is_source_file))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StructurePattern;
    use crate::module::Module;

    fn index() -> ModuleIndex {
        let pattern = StructurePattern::default();
        let modules = ["svc/prod/eu/vpc", "svc/prod/eu/eks", "svc/prod/eu/eks/addons"]
            .iter()
            .map(|id| Module::from_id(&pattern, Path::new("/repo"), id))
            .collect();
        ModuleIndex::new(pattern, modules).unwrap()
    }

    #[test]
    fn files_map_to_deepest_module_and_library_directories() {
        let changes = ChangeSet::classify(
            &index(),
            Path::new("/repo"),
            &[PathBuf::from("/repo/_modules")],
            &[
                "svc/prod/eu/eks/main.tf",
                "svc/prod/eu/eks/addons/helm.tf",
                "svc/prod/eu/vpc/outputs.tf",
                "svc/prod/eu/vpc/variables.tf",
                "_modules/kafka/acl/main.tf",
                "README.md",
            ],
        );

        assert_eq!(
            changes.modules,
            ["svc/prod/eu/eks", "svc/prod/eu/eks/addons", "svc/prod/eu/vpc"]
        );
        assert_eq!(changes.library_paths, [PathBuf::from("/repo/_modules/kafka/acl")]);
    }

    #[test]
    fn library_assets_belong_to_the_enclosing_configuration_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for rel in [
            "_modules/kafka/main.tf",
            "_modules/kafka/templates/policy.json",
            "_modules/kafka/acl/main.tf",
        ] {
            let path = root.join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, "").unwrap();
        }

        let changes = ChangeSet::classify(
            &index(),
            root,
            &[root.join("_modules")],
            &["_modules/kafka/templates/policy.json", "_modules/kafka/acl/main.tf"],
        );

        assert_eq!(
            changes.library_paths,
            [root.join("_modules/kafka"), root.join("_modules/kafka/acl")]
        );
    }

    #[test]
    fn deleted_library_assets_fall_back_to_the_top_level_library() {
        let changes = ChangeSet::classify(
            &index(),
            Path::new("/repo"),
            &[PathBuf::from("/repo/_modules")],
            &["_modules/kafka/templates/policy.json", "_modules/README.md"],
        );

        assert_eq!(
            changes.library_paths,
            [PathBuf::from("/repo/_modules"), PathBuf::from("/repo/_modules/kafka")]
        );
    }

    #[test]
    fn absolute_paths_are_accepted() {
        let changes = ChangeSet::classify(
            &index(),
            Path::new("/repo"),
            &[],
            &["/repo/svc/prod/eu/vpc/main.tf"],
        );

        assert_eq!(changes.modules, ["svc/prod/eu/vpc"]);
        assert!(changes.library_paths.is_empty());
    }

    #[test]
    fn unrelated_files_produce_an_empty_change_set() {
        let changes = ChangeSet::classify(&index(), Path::new("/repo"), &[], &[".github/ci.yml"]);

        assert!(changes.is_empty());
    }
}
