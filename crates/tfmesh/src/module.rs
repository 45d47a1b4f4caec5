//! Module records and the read-only module index.
//!
//! A module's identity is its position in the directory hierarchy: the
//! slash-joined sequence of path segments below the discovery root. Parent and
//! child relationships between a module and its submodules are never stored;
//! they are derived on demand from ID-prefix containment.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::StructurePattern;
use crate::error::{Error, Result};

/// Field name bound to the segment that follows a full pattern match.
pub const SUBMODULE_FIELD: &str = "submodule";

/// A unit of infrastructure configuration located by its directory.
///
/// Created once by discovery and immutable afterward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Module {
    id: String,
    segments: Vec<String>,
    fields: Vec<(String, String)>,
    path: PathBuf,
    relative_path: PathBuf,
}

impl Module {
    /// Build a module from its path segments below `root`.
    ///
    /// Segments bind positionally to the pattern's placeholders. The segment
    /// directly after a complete match binds to `submodule`.
    #[must_use]
    pub fn new(pattern: &StructurePattern, root: &Path, segments: Vec<String>) -> Self {
        let mut fields: Vec<(String, String)> = pattern
            .names()
            .iter()
            .zip(&segments)
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        if let Some(extra) = segments.get(pattern.len()) {
            fields.push((SUBMODULE_FIELD.to_string(), extra.clone()));
        }

        let relative_path: PathBuf = segments.iter().collect();
        Self {
            id: segments.join("/"),
            path: root.join(&relative_path),
            relative_path,
            segments,
            fields,
        }
    }

    /// Build a module from a slash-separated ID.
    #[must_use]
    pub fn from_id(pattern: &StructurePattern, root: &Path, id: &str) -> Self {
        let segments = id
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Self::new(pattern, root, segments)
    }

    /// Slash-joined segment sequence.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Ordered location segments.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments below the root.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// `true` when the module sits below a complete pattern match.
    ///
    /// Position alone decides; the enclosing directory need not be a module.
    #[must_use]
    pub fn is_submodule(&self) -> bool {
        self.field(SUBMODULE_FIELD).is_some()
    }

    /// Last path segment.
    #[must_use]
    pub fn name(&self) -> &str {
        self.segments.last().map_or("", String::as_str)
    }

    /// Value bound to a pattern placeholder (or `submodule`).
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// All placeholder bindings in pattern order.
    #[must_use]
    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    /// Absolute directory of the module.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory relative to the discovery root.
    #[must_use]
    pub fn relative_path(&self) -> &Path {
        &self.relative_path
    }
}

/// Read-only lookup over a discovered module set.
///
/// Modules live in a flat arena sorted by ID; the ID map points into it. The
/// index is built once and shared by reference.
#[derive(Debug, Clone)]
pub struct ModuleIndex {
    pattern: StructurePattern,
    modules: Vec<Module>,
    by_id: HashMap<String, usize>,
}

impl ModuleIndex {
    /// Build an index, rejecting duplicate IDs.
    pub fn new(pattern: StructurePattern, mut modules: Vec<Module>) -> Result<Self> {
        modules.sort_by(|a, b| a.id.cmp(&b.id));

        let mut by_id = HashMap::with_capacity(modules.len());
        for (slot, module) in modules.iter().enumerate() {
            if by_id.insert(module.id.clone(), slot).is_some() {
                return Err(Error::Config(format!("duplicate module id: {}", module.id)));
            }
        }

        Ok(Self {
            pattern,
            modules,
            by_id,
        })
    }

    /// Pattern the modules were discovered with.
    #[must_use]
    pub fn pattern(&self) -> &StructurePattern {
        &self.pattern
    }

    /// All modules, sorted by ID.
    #[must_use]
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    /// Iterate modules in ID order.
    pub fn iter(&self) -> impl Iterator<Item = &Module> {
        self.modules.iter()
    }

    /// Number of modules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// `true` if no modules were discovered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Look up a module by ID.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Module> {
        self.by_id.get(id).map(|&slot| &self.modules[slot])
    }

    /// `true` if the ID is indexed.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Modules whose placeholder `name` is bound to `value`.
    #[must_use]
    pub fn by_field(&self, name: &str, value: &str) -> Vec<&Module> {
        self.find(&[(name, value)])
    }

    /// Modules matching every `(field, value)` pair.
    #[must_use]
    pub fn find(&self, criteria: &[(&str, &str)]) -> Vec<&Module> {
        self.modules
            .iter()
            .filter(|m| {
                criteria
                    .iter()
                    .all(|(name, value)| m.field(name) == Some(*value))
            })
            .collect()
    }

    /// Closest indexed ancestor of a module, by ID prefix.
    #[must_use]
    pub fn parent(&self, id: &str) -> Option<&Module> {
        let module = self.get(id)?;
        let segments = module.segments();
        (1..segments.len())
            .rev()
            .find_map(|len| self.get(&segments[..len].join("/")))
    }

    /// Modules whose closest indexed ancestor is `id`.
    #[must_use]
    pub fn children(&self, id: &str) -> Vec<&Module> {
        let prefix = format!("{id}/");
        self.modules
            .iter()
            .filter(|m| m.id.starts_with(&prefix))
            .filter(|m| self.parent(&m.id).is_some_and(|p| p.id == id))
            .collect()
    }

    /// `true` if the indexed module `id` is a submodule.
    #[must_use]
    pub fn is_submodule(&self, id: &str) -> bool {
        self.get(id).is_some_and(Module::is_submodule)
    }

    /// Deepest module whose directory contains `path`.
    ///
    /// `path` may be absolute or relative to the discovery root.
    #[must_use]
    pub fn module_for_path(&self, path: &Path) -> Option<&Module> {
        self.modules
            .iter()
            .filter(|m| {
                if path.is_absolute() {
                    path.starts_with(&m.path)
                } else {
                    path.starts_with(&m.relative_path)
                }
            })
            .max_by_key(|m| m.depth())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(ids: &[&str]) -> ModuleIndex {
        let pattern = StructurePattern::default();
        let modules = ids
            .iter()
            .map(|id| Module::from_id(&pattern, Path::new("/repo"), id))
            .collect();
        ModuleIndex::new(pattern, modules).expect("ids are unique")
    }

    #[test]
    fn module_binds_fields_positionally() {
        let pattern = StructurePattern::default();
        let module = Module::from_id(&pattern, Path::new("/repo"), "platform/prod/eu-west-1/eks/addons");

        assert_eq!(module.field("service"), Some("platform"));
        assert_eq!(module.field("environment"), Some("prod"));
        assert_eq!(module.field("region"), Some("eu-west-1"));
        assert_eq!(module.field("module"), Some("eks"));
        assert_eq!(module.field(SUBMODULE_FIELD), Some("addons"));
        assert_eq!(module.name(), "addons");
        assert_eq!(module.path(), Path::new("/repo/platform/prod/eu-west-1/eks/addons"));
        assert_eq!(
            module.relative_path(),
            Path::new("platform/prod/eu-west-1/eks/addons")
        );
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let pattern = StructurePattern::default();
        let a = Module::from_id(&pattern, Path::new("/repo"), "s/e/r/m");
        let result = ModuleIndex::new(pattern, vec![a.clone(), a]);

        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn modules_are_sorted_by_id() {
        let index = index(&["s/e/r/vpc", "s/e/r/eks", "a/e/r/x"]);

        let ids: Vec<&str> = index.iter().map(Module::id).collect();
        assert_eq!(ids, ["a/e/r/x", "s/e/r/eks", "s/e/r/vpc"]);
    }

    #[test]
    fn find_filters_on_field_combinations() {
        let index = index(&["svc/prod/eu/vpc", "svc/stage/eu/vpc", "svc/prod/us/vpc", "svc/prod/eu/eks"]);

        let prod_eu = index.find(&[("environment", "prod"), ("region", "eu")]);
        let ids: Vec<&str> = prod_eu.iter().map(|m| m.id()).collect();
        assert_eq!(ids, ["svc/prod/eu/eks", "svc/prod/eu/vpc"]);

        assert_eq!(index.by_field("module", "vpc").len(), 3);
        assert!(index.by_field("module", "rds").is_empty());
    }

    #[test]
    fn parent_and_children_follow_id_prefixes() {
        let index = index(&["s/e/r/eks", "s/e/r/eks/addons", "s/e/r/eks/iam", "s/e/r/eksctl"]);

        assert_eq!(index.parent("s/e/r/eks/addons").map(Module::id), Some("s/e/r/eks"));
        assert!(index.parent("s/e/r/eks").is_none());
        assert!(index.is_submodule("s/e/r/eks/iam"));
        assert!(!index.is_submodule("s/e/r/eksctl"));

        let children: Vec<&str> = index.children("s/e/r/eks").iter().map(|m| m.id()).collect();
        assert_eq!(children, ["s/e/r/eks/addons", "s/e/r/eks/iam"]);
    }

    #[test]
    fn submodule_status_does_not_need_an_indexed_parent() {
        let index = index(&["s/e/r/eks/addons", "s/e/r/eks/iam", "s/e/r/vpc"]);

        assert!(index.parent("s/e/r/eks/addons").is_none());
        assert!(index.is_submodule("s/e/r/eks/addons"));
        assert!(!index.is_submodule("s/e/r/vpc"));
        assert!(!index.is_submodule("s/e/r/missing/x"));
    }

    #[test]
    fn module_for_path_prefers_deepest_match() {
        let index = index(&["s/e/r/eks", "s/e/r/eks/addons"]);

        let hit = index.module_for_path(Path::new("s/e/r/eks/addons/main.tf"));
        assert_eq!(hit.map(Module::id), Some("s/e/r/eks/addons"));

        let hit = index.module_for_path(Path::new("/repo/s/e/r/eks/variables.tf"));
        assert_eq!(hit.map(Module::id), Some("s/e/r/eks"));

        assert!(index.module_for_path(Path::new("README.md")).is_none());
    }
}
