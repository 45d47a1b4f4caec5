//! Path-to-module matching.
//!
//! A concrete reference path is matched against the index by trying each
//! [`MatchStrategy`] in [`MatchStrategy::ORDERED`] order. The first strategy
//! that produces an indexed module ID wins; there is no scoring.
//!
//! | Strategy | Input shape | Example (referencer `svc/prod/eu/eks`) |
//! |----------|-------------|----------------------------------------|
//! | `Exact` | module ID | `svc/prod/eu/vpc` |
//! | `Normalized` | ID with odd separators | `svc\prod\eu\vpc/` |
//! | `Suffix` | state key | `env:/prod/svc/prod/eu/vpc/terraform.tfstate` |
//! | `SameContext` | bare name | `vpc` |
//! | `ModuleSubmodule` | `module/submodule` | `eks/addons` |
//! | `Relative` | relative directory | `../vpc` |
//!
//! The bare-name heuristics only look inside the referencer's own leading
//! context (service/environment/region for the default pattern). A bare name
//! shared by modules in other contexts is never considered.

use crate::module::{Module, ModuleIndex};

/// Inputs every strategy sees.
#[derive(Debug, Clone, Copy)]
pub struct MatchContext<'a> {
    /// Index to resolve against.
    pub index: &'a ModuleIndex,
    /// Module that declared the reference.
    pub referencer: &'a Module,
    /// Concrete reference path after expression expansion.
    pub path: &'a str,
}

/// One independent way of turning a path into a module ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchStrategy {
    /// Path is already a module ID.
    Exact,
    /// Path is a module ID once separators are cleaned up.
    Normalized,
    /// Trailing segments of a state key name a module.
    Suffix,
    /// Bare name of a sibling in the referencer's context.
    SameContext,
    /// `module/submodule` in the referencer's context.
    ModuleSubmodule,
    /// Directory path relative to the referencer.
    Relative,
}

impl MatchStrategy {
    /// Order in which strategies are tried.
    pub const ORDERED: [Self; 6] = [
        Self::Exact,
        Self::Normalized,
        Self::Suffix,
        Self::SameContext,
        Self::ModuleSubmodule,
        Self::Relative,
    ];

    /// Run this strategy alone.
    #[must_use]
    pub fn apply(self, ctx: &MatchContext<'_>) -> Option<String> {
        match self {
            Self::Exact => exact(ctx),
            Self::Normalized => normalized(ctx),
            Self::Suffix => suffix(ctx),
            Self::SameContext => same_context(ctx),
            Self::ModuleSubmodule => module_submodule(ctx),
            Self::Relative => relative(ctx),
        }
    }

    /// Short name used in logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Normalized => "normalized",
            Self::Suffix => "suffix",
            Self::SameContext => "same-context",
            Self::ModuleSubmodule => "module-submodule",
            Self::Relative => "relative",
        }
    }
}

/// Resolve `path` to a module ID using the first strategy that succeeds.
#[must_use]
pub fn match_path(
    index: &ModuleIndex,
    referencer: &Module,
    path: &str,
) -> Option<(String, MatchStrategy)> {
    let ctx = MatchContext {
        index,
        referencer,
        path,
    };
    MatchStrategy::ORDERED
        .iter()
        .find_map(|strategy| strategy.apply(&ctx).map(|id| (id, *strategy)))
}

fn lookup(index: &ModuleIndex, id: String) -> Option<String> {
    index.contains(&id).then_some(id)
}

fn exact(ctx: &MatchContext<'_>) -> Option<String> {
    lookup(ctx.index, ctx.path.to_string())
}

fn normalized(ctx: &MatchContext<'_>) -> Option<String> {
    lookup(ctx.index, separator_segments(ctx.path).join("/"))
}

fn suffix(ctx: &MatchContext<'_>) -> Option<String> {
    let segments = state_segments(ctx.path);
    if segments.iter().any(|s| s == "..") {
        return None;
    }
    let width = ctx.index.pattern().len();
    [width + 1, width]
        .into_iter()
        .filter(|&n| n > 0 && segments.len() >= n)
        .find_map(|n| lookup(ctx.index, segments[segments.len() - n..].join("/")))
}

fn same_context(ctx: &MatchContext<'_>) -> Option<String> {
    let segments = state_segments(ctx.path);
    let [name] = segments.as_slice() else {
        return None;
    };
    if name == ".." {
        return None;
    }

    if ctx.referencer.is_submodule() {
        let segments = ctx.referencer.segments();
        let dir = &segments[..segments.len() - 1];
        if let Some(id) = lookup(ctx.index, format!("{}/{name}", dir.join("/"))) {
            return Some(id);
        }
    }
    lookup(ctx.index, in_context(ctx, &[name]))
}

fn module_submodule(ctx: &MatchContext<'_>) -> Option<String> {
    let segments = state_segments(ctx.path);
    let [module, submodule] = segments.as_slice() else {
        return None;
    };
    if module == ".." || submodule == ".." {
        return None;
    }
    lookup(ctx.index, in_context(ctx, &[module, submodule]))
}

fn relative(ctx: &MatchContext<'_>) -> Option<String> {
    let cleaned = ctx.path.replace('\\', "/");
    if !(cleaned.starts_with("./") || cleaned.starts_with("../")) {
        return None;
    }

    let mut resolved: Vec<&str> = ctx.referencer.segments().iter().map(String::as_str).collect();
    let segments = state_segments(ctx.path);
    for segment in &segments {
        if segment == ".." {
            resolved.pop()?;
        } else {
            resolved.push(segment);
        }
    }
    lookup(ctx.index, resolved.join("/"))
}

/// Join `tail` onto the referencer's leading context (all pattern segments
/// except the module name).
fn in_context(ctx: &MatchContext<'_>, tail: &[&String]) -> String {
    let width = ctx.index.pattern().len().saturating_sub(1);
    ctx.referencer
        .segments()
        .iter()
        .take(width)
        .chain(tail.iter().copied())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("/")
}

/// Split on either separator, dropping empty and `.` segments.
fn separator_segments(path: &str) -> Vec<String> {
    path.split(['/', '\\'])
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != ".")
        .map(str::to_string)
        .collect()
}

/// Segments of a state key with workspace prefix and state file name removed.
///
/// `env:/staging/svc/prod/eu/vpc/terraform.tfstate` becomes
/// `["svc", "prod", "eu", "vpc"]`; `svc/prod/eu/vpc.tfstate` becomes
/// `["svc", "prod", "eu", "vpc"]`.
fn state_segments(path: &str) -> Vec<String> {
    let mut segments = separator_segments(path);

    if segments.first().is_some_and(|s| s.ends_with(':')) {
        let skip = segments.len().min(2);
        segments.drain(..skip);
    }

    if let Some(last) = segments.last_mut() {
        if let Some(stem) = last.strip_suffix(".tfstate") {
            if stem.is_empty() || stem == "terraform" {
                segments.pop();
            } else {
                *last = stem.to_string();
            }
        }
    }

    segments
}
