//! Lexical path helpers.
//!
//! Library paths are compared by prefix, so both sides must be normalized the
//! same way. Normalization is purely lexical: the paths involved may describe
//! directories that don't exist on the machine running the analysis.

use std::path::{Component, Path, PathBuf};

/// Collapse `.` and `..` components without touching the filesystem.
///
/// A `..` that would climb above the root (or above the first component of a
/// relative path) is kept as-is.
#[must_use]
pub fn normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    out.iter().collect()
}

/// `true` when `path` equals `prefix` or lies beneath it (component-wise).
#[must_use]
pub fn is_within(path: &Path, prefix: &Path) -> bool {
    normalize(path).starts_with(normalize(prefix))
}
