//! Dependency extraction.
//!
//! Turns the structured reference data of each module into resolved
//! dependencies:
//!
//! ```text
//! ParsedModule ──► expr::expand ──► matcher::match_path ──► ModuleDependencies
//!   remote_states    (locals, for_each)   (ordered strategies)    dependencies / depends_on
//!   module_calls  ──► library roots / module dirs ─────────────►  library_dependencies
//! ```
//!
//! Problems never abort extraction. Every unresolvable expression, unknown
//! iterable and unmatched path becomes an [`ExtractionDiagnostic`] on the
//! module's bundle, and the remaining references are still processed.

mod expr;
mod matcher;
mod parallel;
mod source;

pub use expr::{expand, ExprError};
pub use matcher::{match_path, MatchContext, MatchStrategy};
pub use source::{ReferenceSource, StaticReferences};

use std::path::{Path, PathBuf};

use tracing::{debug, trace, warn};

use crate::error::ExtractionDiagnostic;
use crate::module::{Module, ModuleIndex};
use crate::paths;
use crate::types::{
    Dependency, DependencyKind, LibraryDependency, ModuleCall, ModuleDependencies, ParsedModule,
    RemoteStateRef,
};

/// Resolves declared references against a module index.
///
/// The extractor only reads the index, so one instance can be shared by
/// every worker.
#[derive(Debug, Clone)]
pub struct Extractor<'a> {
    index: &'a ModuleIndex,
    library_roots: Vec<PathBuf>,
}

impl<'a> Extractor<'a> {
    /// Create an extractor. `library_roots` must be absolute.
    #[must_use]
    pub fn new(index: &'a ModuleIndex, library_roots: &[PathBuf]) -> Self {
        Self {
            index,
            library_roots: library_roots.iter().map(|r| paths::normalize(r)).collect(),
        }
    }

    /// Index references are resolved against.
    #[must_use]
    pub fn index(&self) -> &'a ModuleIndex {
        self.index
    }

    /// Extract the dependencies of one module from its parsed references.
    #[must_use]
    pub fn extract(&self, module: &Module, parsed: &ParsedModule) -> ModuleDependencies {
        let mut deps = ModuleDependencies::new(module.id());

        for reference in &parsed.remote_states {
            self.extract_remote_state(module, parsed, reference, &mut deps);
        }
        for call in &parsed.module_calls {
            self.extract_module_call(module, call, &mut deps);
        }

        trace!(
            module = %module.id(),
            dependencies = deps.dependencies.len(),
            libraries = deps.library_dependencies.len(),
            diagnostics = deps.errors.len(),
            "Extracted module"
        );
        deps
    }

    fn extract_remote_state(
        &self,
        module: &Module,
        parsed: &ParsedModule,
        reference: &RemoteStateRef,
        deps: &mut ModuleDependencies,
    ) {
        let paths = match expand(reference, &parsed.locals) {
            Ok(paths) => paths,
            Err(ExprError::Expression(expr)) => {
                warn!(
                    module = %module.id(),
                    reference = %reference.name,
                    expression = %expr,
                    "Remote state path is not statically resolvable, dropping"
                );
                deps.errors.push(ExtractionDiagnostic::unresolved_expression(
                    module.id(),
                    &reference.name,
                    &expr,
                ));
                return;
            }
            Err(ExprError::Iterable(source)) => {
                warn!(
                    module = %module.id(),
                    reference = %reference.name,
                    for_each = %source,
                    "for_each source is not statically resolvable, dropping"
                );
                deps.errors.push(ExtractionDiagnostic::unresolved_iterable(
                    module.id(),
                    &reference.name,
                    &source,
                ));
                return;
            }
        };

        for path in paths {
            let target = match_path(self.index, module, &path).map(|(id, strategy)| {
                debug!(
                    module = %module.id(),
                    reference = %reference.name,
                    path = %path,
                    target = %id,
                    strategy = strategy.as_str(),
                    "Resolved remote state"
                );
                id
            });

            if target.is_none() {
                warn!(
                    module = %module.id(),
                    reference = %reference.name,
                    path = %path,
                    "Remote state path matches no module"
                );
                deps.errors
                    .push(ExtractionDiagnostic::unmatched(module.id(), &reference.name, &path));
                continue;
            }

            deps.push_dependency(Dependency {
                from: module.id().to_string(),
                to: target,
                kind: DependencyKind::RemoteState,
                reference_name: reference.name.clone(),
            });
        }
    }

    fn extract_module_call(&self, module: &Module, call: &ModuleCall, deps: &mut ModuleDependencies) {
        let relative = call.source.starts_with("./") || call.source.starts_with("../");
        if !(call.is_local || relative) {
            trace!(module = %module.id(), call = %call.name, "Remote module source, skipping");
            return;
        }

        let target = paths::normalize(&module.path().join(&call.source));

        if self.is_library_path(&target) {
            debug!(
                module = %module.id(),
                call = %call.name,
                library = %target.display(),
                "Recorded library usage"
            );
            deps.push_library(LibraryDependency {
                module_call: call.name.clone(),
                path: target,
            });
            return;
        }

        if let Some(included) = self.index.iter().find(|m| m.path() == target) {
            deps.push_dependency(Dependency {
                from: module.id().to_string(),
                to: Some(included.id().to_string()),
                kind: DependencyKind::Library,
                reference_name: call.name.clone(),
            });
            return;
        }

        debug!(
            module = %module.id(),
            call = %call.name,
            path = %target.display(),
            "Local module source is neither a library nor a module, skipping"
        );
    }

    fn is_library_path(&self, path: &Path) -> bool {
        self.library_roots.iter().any(|root| path.starts_with(root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StructurePattern;
    use crate::error::DiagnosticKind;
    use crate::types::{ForEach, LocalValue};

    fn index(ids: &[&str]) -> ModuleIndex {
        let pattern = StructurePattern::default();
        let modules = ids
            .iter()
            .map(|id| Module::from_id(&pattern, Path::new("/repo"), id))
            .collect();
        ModuleIndex::new(pattern, modules).unwrap()
    }

    fn sample() -> ModuleIndex {
        index(&["svc/env/region/vpc", "svc/env/region/eks", "svc/env/region/rds"])
    }

    fn extract(index: &ModuleIndex, from: &str, parsed: &ParsedModule) -> ModuleDependencies {
        let extractor = Extractor::new(index, &[PathBuf::from("/repo/_modules")]);
        extractor.extract(index.get(from).unwrap(), parsed)
    }

    #[test]
    fn resolves_state_key_reference() {
        let index = sample();
        let parsed = ParsedModule {
            remote_states: vec![RemoteStateRef::new(
                "vpc",
                "s3",
                "svc/env/region/vpc/terraform.tfstate",
            )],
            ..ParsedModule::default()
        };

        let deps = extract(&index, "svc/env/region/eks", &parsed);

        assert_eq!(deps.depends_on, ["svc/env/region/vpc"]);
        assert_eq!(deps.dependencies[0].kind, DependencyKind::RemoteState);
        assert_eq!(deps.dependencies[0].reference_name, "vpc");
        assert!(deps.is_clean());
    }

    #[test]
    fn workspace_prefixed_key_resolves_identically() {
        let index = sample();
        let parsed = ParsedModule {
            remote_states: vec![RemoteStateRef::new(
                "vpc",
                "s3",
                "env:/env/svc/env/region/vpc/terraform.tfstate",
            )],
            ..ParsedModule::default()
        };

        let deps = extract(&index, "svc/env/region/eks", &parsed);

        assert_eq!(deps.depends_on, ["svc/env/region/vpc"]);
    }

    #[test]
    fn bare_name_resolves_in_same_context() {
        let index = sample();
        let parsed = ParsedModule {
            remote_states: vec![RemoteStateRef::new("vpc", "s3", "vpc")],
            ..ParsedModule::default()
        };

        let deps = extract(&index, "svc/env/region/eks", &parsed);

        assert_eq!(deps.depends_on, ["svc/env/region/vpc"]);
    }

    #[test]
    fn unresolved_iteration_token_yields_diagnostic_and_no_edges() {
        let index = sample();
        let parsed = ParsedModule {
            remote_states: vec![RemoteStateRef::new(
                "per_env",
                "s3",
                "svc/${each.key}/region/vpc/terraform.tfstate",
            )
            .with_for_each(ForEach::Reference("var.environments".to_string()))],
            ..ParsedModule::default()
        };

        let deps = extract(&index, "svc/env/region/eks", &parsed);

        assert!(deps.dependencies.is_empty());
        assert_eq!(deps.errors.len(), 1);
        assert_eq!(deps.errors[0].kind, DiagnosticKind::UnresolvedIterable);
        assert_eq!(deps.errors[0].module, "svc/env/region/eks");
    }

    #[test]
    fn unmatched_path_is_reported_and_others_still_resolve() {
        let index = sample();
        let parsed = ParsedModule {
            remote_states: vec![
                RemoteStateRef::new("ghost", "s3", "nope/env/region/ghost/terraform.tfstate"),
                RemoteStateRef::new("db", "s3", "rds"),
            ],
            ..ParsedModule::default()
        };

        let deps = extract(&index, "svc/env/region/eks", &parsed);

        assert_eq!(deps.depends_on, ["svc/env/region/rds"]);
        assert_eq!(deps.errors.len(), 1);
        assert_eq!(deps.errors[0].kind, DiagnosticKind::UnmatchedReference);
        assert!(deps.errors[0].message.contains("nope/env/region/ghost"));
    }

    #[test]
    fn for_each_over_local_expands_to_several_dependencies() {
        let index = sample();
        let mut parsed = ParsedModule {
            remote_states: vec![RemoteStateRef::new(
                "deps",
                "s3",
                "svc/${local.env}/region/${each.value}/terraform.tfstate",
            )
            .with_for_each(ForEach::Reference("local.targets".to_string()))],
            ..ParsedModule::default()
        };
        parsed
            .locals
            .insert("env".to_string(), LocalValue::Scalar("env".to_string()));
        parsed.locals.insert(
            "targets".to_string(),
            LocalValue::List(vec!["vpc".to_string(), "rds".to_string()]),
        );

        let deps = extract(&index, "svc/env/region/eks", &parsed);

        assert_eq!(deps.depends_on, ["svc/env/region/vpc", "svc/env/region/rds"]);
        assert!(deps.is_clean());
    }

    #[test]
    fn self_reference_is_dropped() {
        let index = sample();
        let parsed = ParsedModule {
            remote_states: vec![RemoteStateRef::new("me", "s3", "eks")],
            ..ParsedModule::default()
        };

        let deps = extract(&index, "svc/env/region/eks", &parsed);

        assert!(deps.depends_on.is_empty());
        assert!(deps.is_clean());
    }

    #[test]
    fn local_call_under_library_root_is_recorded_as_library() {
        let index = sample();
        let parsed = ParsedModule {
            module_calls: vec![ModuleCall::local("acl", "../../../../_modules/kafka/acl")],
            ..ParsedModule::default()
        };

        let deps = extract(&index, "svc/env/region/eks", &parsed);

        assert_eq!(
            deps.library_dependencies,
            [LibraryDependency {
                module_call: "acl".to_string(),
                path: PathBuf::from("/repo/_modules/kafka/acl"),
            }]
        );
        assert!(deps.dependencies.is_empty());
    }

    #[test]
    fn local_call_into_module_directory_is_library_edge() {
        let index = sample();
        let parsed = ParsedModule {
            module_calls: vec![ModuleCall::local("network", "../vpc")],
            ..ParsedModule::default()
        };

        let deps = extract(&index, "svc/env/region/eks", &parsed);

        assert_eq!(deps.depends_on, ["svc/env/region/vpc"]);
        assert_eq!(deps.dependencies[0].kind, DependencyKind::Library);
    }

    #[test]
    fn registry_sources_are_ignored() {
        let index = sample();
        let parsed = ParsedModule {
            module_calls: vec![ModuleCall {
                name: "vpc".to_string(),
                source: "terraform-aws-modules/vpc/aws".to_string(),
                is_local: false,
            }],
            ..ParsedModule::default()
        };

        let deps = extract(&index, "svc/env/region/eks", &parsed);

        assert!(deps.dependencies.is_empty());
        assert!(deps.library_dependencies.is_empty());
        assert!(deps.is_clean());
    }
}
