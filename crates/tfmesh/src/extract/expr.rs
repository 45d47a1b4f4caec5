//! Static evaluation of remote-state path expressions.
//!
//! Paths are string templates. `${local.NAME}` is replaced by a scalar local,
//! `${each.key}` / `${each.value}` by the current for-each element. Anything
//! else inside `${}` (variables, data sources, workspace names) is only known
//! at runtime, so the whole reference is reported as unresolvable instead of
//! guessing.

use std::collections::BTreeMap;

use crate::types::{ForEach, LocalValue, RemoteStateRef};

/// Why a path expression could not be evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprError {
    /// The template still holds a runtime-only construct.
    Expression(String),
    /// The for-each source doesn't name a known collection.
    Iterable(String),
}

/// One `(each.key, each.value)` binding.
type Binding = (String, String);

/// Expand a reference into the concrete paths it denotes.
///
/// A plain reference yields one path; an iterated reference yields one path
/// per collection element, in collection order.
pub fn expand(
    reference: &RemoteStateRef,
    locals: &BTreeMap<String, LocalValue>,
) -> Result<Vec<String>, ExprError> {
    let Some(for_each) = &reference.for_each else {
        return interpolate(&reference.path, locals, None).map(|p| vec![p]);
    };

    bindings(for_each, locals)?
        .iter()
        .map(|binding| interpolate(&reference.path, locals, Some(binding)))
        .collect()
}

fn bindings(
    for_each: &ForEach,
    locals: &BTreeMap<String, LocalValue>,
) -> Result<Vec<Binding>, ExprError> {
    match for_each {
        ForEach::List(items) => Ok(list_bindings(items)),
        ForEach::Map(map) => Ok(map_bindings(map)),
        ForEach::Reference(expr) => {
            let name = strip_collection_wrappers(expr)
                .strip_prefix("local.")
                .ok_or_else(|| ExprError::Iterable(expr.clone()))?;
            match locals.get(name) {
                Some(LocalValue::List(items)) => Ok(list_bindings(items)),
                Some(LocalValue::Map(map)) => Ok(map_bindings(map)),
                Some(LocalValue::Scalar(_)) | None => Err(ExprError::Iterable(expr.clone())),
            }
        }
    }
}

fn list_bindings(items: &[String]) -> Vec<Binding> {
    items.iter().map(|i| (i.clone(), i.clone())).collect()
}

fn map_bindings(map: &BTreeMap<String, String>) -> Vec<Binding> {
    map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}

/// Peel `${...}`, `toset(...)`, `tolist(...)` and `tomap(...)` off an expression.
fn strip_collection_wrappers(expr: &str) -> &str {
    let mut current = expr.trim();
    loop {
        let next = current
            .strip_prefix("${")
            .and_then(|s| s.strip_suffix('}'))
            .or_else(|| {
                ["toset(", "tolist(", "tomap("]
                    .iter()
                    .find_map(|f| current.strip_prefix(f))
                    .and_then(|s| s.strip_suffix(')'))
            });
        match next {
            Some(inner) => current = inner.trim(),
            None => return current,
        }
    }
}

/// Substitute every `${...}` in `template`.
fn interpolate(
    template: &str,
    locals: &BTreeMap<String, LocalValue>,
    binding: Option<&Binding>,
) -> Result<String, ExprError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find('}')
            .ok_or_else(|| ExprError::Expression(template.to_string()))?;
        let inner = after[..end].trim();

        let value = match (inner, binding) {
            ("each.key", Some((key, _))) => key.as_str(),
            ("each.value", Some((_, value))) => value.as_str(),
            _ => match inner.strip_prefix("local.").and_then(|n| locals.get(n)) {
                Some(LocalValue::Scalar(value)) => value.as_str(),
                _ => return Err(ExprError::Expression(template.to_string())),
            },
        };
        out.push_str(value);
        rest = &after[end + 1..];
    }
    out.push_str(rest);

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn locals() -> BTreeMap<String, LocalValue> {
        let mut locals = BTreeMap::new();
        locals.insert("env".to_string(), LocalValue::Scalar("prod".to_string()));
        locals.insert(
            "regions".to_string(),
            LocalValue::List(vec!["eu-west-1".to_string(), "us-east-1".to_string()]),
        );
        locals.insert(
            "zones".to_string(),
            LocalValue::Map(
                [("primary".to_string(), "eu-west-1".to_string())]
                    .into_iter()
                    .collect(),
            ),
        );
        locals
    }

    #[rstest]
    #[case::static_path("svc/prod/eu/vpc/terraform.tfstate", "svc/prod/eu/vpc/terraform.tfstate")]
    #[case::local_scalar("svc/${local.env}/eu/vpc", "svc/prod/eu/vpc")]
    #[case::padded_local("svc/${ local.env }/eu/vpc", "svc/prod/eu/vpc")]
    #[case::repeated_local("${local.env}/${local.env}", "prod/prod")]
    fn plain_references_expand_to_one_path(#[case] path: &str, #[case] expected: &str) {
        let reference = RemoteStateRef::new("r", "s3", path);

        assert_eq!(expand(&reference, &locals()), Ok(vec![expected.to_string()]));
    }

    #[rstest]
    #[case::variable("svc/${var.env}/eu/vpc")]
    #[case::workspace("svc/${terraform.workspace}/vpc")]
    #[case::list_local_as_scalar("svc/${local.regions}/vpc")]
    #[case::unknown_local("svc/${local.missing}/vpc")]
    #[case::each_without_for_each("svc/prod/${each.key}/vpc")]
    #[case::unterminated("svc/${local.env/vpc")]
    fn runtime_constructs_are_unresolvable(#[case] path: &str) {
        let reference = RemoteStateRef::new("r", "s3", path);

        assert_eq!(
            expand(&reference, &locals()),
            Err(ExprError::Expression(path.to_string()))
        );
    }

    #[test]
    fn for_each_over_local_list_yields_path_per_element() {
        let reference = RemoteStateRef::new("vpc", "s3", "svc/${local.env}/${each.key}/vpc")
            .with_for_each(ForEach::Reference("${toset(local.regions)}".to_string()));

        let paths = expand(&reference, &locals()).unwrap();

        assert_eq!(paths, ["svc/prod/eu-west-1/vpc", "svc/prod/us-east-1/vpc"]);
    }

    #[test]
    fn for_each_over_literal_map_binds_key_and_value() {
        let map = [
            ("a".to_string(), "vpc".to_string()),
            ("b".to_string(), "dns".to_string()),
        ]
        .into_iter()
        .collect();
        let reference = RemoteStateRef::new("deps", "s3", "svc/prod/${each.key}/${each.value}")
            .with_for_each(ForEach::Map(map));

        let paths = expand(&reference, &locals()).unwrap();

        assert_eq!(paths, ["svc/prod/a/vpc", "svc/prod/b/dns"]);
    }

    #[test]
    fn for_each_over_local_map_uses_values() {
        let reference = RemoteStateRef::new("vpc", "s3", "svc/prod/${each.value}/vpc")
            .with_for_each(ForEach::Reference("local.zones".to_string()));

        assert_eq!(
            expand(&reference, &locals()),
            Ok(vec!["svc/prod/eu-west-1/vpc".to_string()])
        );
    }

    #[rstest]
    #[case::variable("var.regions")]
    #[case::scalar_local("local.env")]
    #[case::missing_local("local.nope")]
    fn unresolvable_iterables_are_reported(#[case] source: &str) {
        let reference = RemoteStateRef::new("vpc", "s3", "svc/prod/${each.key}/vpc")
            .with_for_each(ForEach::Reference(source.to_string()));

        assert_eq!(
            expand(&reference, &locals()),
            Err(ExprError::Iterable(source.to_string()))
        );
    }

    #[test]
    fn empty_literal_collection_yields_no_paths() {
        let reference = RemoteStateRef::new("vpc", "s3", "svc/prod/${each.key}/vpc")
            .with_for_each(ForEach::List(Vec::new()));

        assert_eq!(expand(&reference, &locals()), Ok(Vec::new()));
    }
}
