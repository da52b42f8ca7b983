/*
 * loader.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Resolution of placeholders left in an already parsed tree.
 */

use crate::error::Result;
use crate::params::IncludeParams;
use crate::resolver::Resolver;
use crate::value::Value;

/// Resolve every placeholder in `value`, including the ones that appear in
/// resolved content, and return the finished tree.
pub fn resolve(mut value: Value, resolver: &Resolver) -> Result<Value> {
    resolve_in_place(&mut value, resolver)?;
    Ok(value)
}

/// Resolve every placeholder in `value` in place.
///
/// The walk is depth-first with an explicit stack. Each resolved node is
/// visited again, one include deeper, so content that brings its own
/// placeholders is expanded until none remain or the resolver's depth
/// limit is hit. Placeholders used as mapping keys are left alone.
pub fn resolve_in_place(value: &mut Value, resolver: &Resolver) -> Result<()> {
    walk(value, resolver, true, &mut |_, _| {})
}

/// Resolve the placeholders present in `value` now, without looking into
/// the content they resolve to.
pub fn resolve_shallow(value: &mut Value, resolver: &Resolver) -> Result<()> {
    walk(value, resolver, false, &mut |_, _| {})
}

/// Resolve placeholders one at a time, calling `on_resolved` after each
/// replacement with the directive and the value now in its place.
///
/// Placeholders are visited in document order. With `nested`, content
/// brought in by a placeholder is scanned too, as in [`resolve_in_place`];
/// otherwise only the placeholders present on entry are resolved. On error
/// the placeholders handled so far stay replaced.
pub fn resolve_each<F>(
    value: &mut Value,
    resolver: &Resolver,
    nested: bool,
    mut on_resolved: F,
) -> Result<()>
where
    F: FnMut(&IncludeParams, &Value),
{
    walk(value, resolver, nested, &mut on_resolved)
}

fn walk(
    root: &mut Value,
    resolver: &Resolver,
    revisit: bool,
    on_resolved: &mut dyn FnMut(&IncludeParams, &Value),
) -> Result<()> {
    let mut stack: Vec<(&mut Value, Vec<String>)> = vec![(root, Vec::new())];
    let mut resolved = 0usize;

    while let Some((node, chain)) = stack.pop() {
        if let Value::Include(params) = &*node {
            let next = resolver.descend(&chain, params.path())?;
            let value = resolver.load_with(params, &chain)?;
            resolved += 1;
            if let Value::Include(params) = std::mem::replace(node, value) {
                on_resolved(&*params, &*node);
            }
            if revisit {
                stack.push((node, next));
            }
            continue;
        }

        match node {
            Value::Sequence(items) => {
                for item in items.iter_mut().rev() {
                    stack.push((item, chain.clone()));
                }
            }
            Value::Mapping(map) => {
                let children: Vec<&mut Value> = map.values_mut().collect();
                for child in children.into_iter().rev() {
                    stack.push((child, chain.clone()));
                }
            }
            _ => {}
        }
    }

    tracing::debug!(resolved, "resolved placeholders");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IncludeError;
    use crate::fs::MemoryFileSystem;
    use crate::params::IncludeParams;
    use std::sync::Arc;

    fn lazy_resolver(files: &[(&str, &str)]) -> Resolver {
        Resolver::builder()
            .default_fs(Arc::new(MemoryFileSystem::with_files(files.iter().copied())))
            .autoload(false)
            .build()
    }

    #[test]
    fn test_resolve_nested_placeholders() {
        let resolver = lazy_resolver(&[
            ("/a.yml", "inner: !include /b.yml"),
            ("/b.yml", "[1, 2]"),
        ]);
        let doc = resolver.parse_str("top: !include /a.yml\nother: [x, !include /b.yml]").unwrap();
        assert_eq!(doc.count_includes(), 2);

        let doc = resolve(doc, &resolver).unwrap();
        assert_eq!(doc.count_includes(), 0);
        let expected = resolver
            .with_autoload(true, |r| {
                r.parse_str("top: {inner: [1, 2]}\nother: [x, [1, 2]]")
            })
            .unwrap();
        assert_eq!(doc, expected);
    }

    #[test]
    fn test_resolve_single_placeholder() {
        let resolver = lazy_resolver(&[("/a.yml", "name: a")]);
        let value = Value::from(IncludeParams::new("/a.yml").unwrap());
        let value = resolve(value, &resolver).unwrap();
        assert_eq!(value.get("name"), Some(&Value::from("a")));
    }

    #[test]
    fn test_shallow_leaves_new_placeholders() {
        let resolver = lazy_resolver(&[
            ("/a.yml", "inner: !include /b.yml"),
            ("/b.yml", "b"),
        ]);
        let mut doc = resolver.parse_str("top: !include /a.yml").unwrap();
        resolve_shallow(&mut doc, &resolver).unwrap();
        let inner = doc.get("top").and_then(|top| top.get("inner")).unwrap();
        assert!(inner.is_include());

        resolve_in_place(&mut doc, &resolver).unwrap();
        assert_eq!(
            doc.get("top").and_then(|top| top.get("inner")),
            Some(&Value::from("b"))
        );
    }

    #[test]
    fn test_cycle_is_reported() {
        let resolver = Resolver::builder()
            .default_fs(Arc::new(MemoryFileSystem::with_files([
                ("/a.yml", "next: !include /b.yml"),
                ("/b.yml", "next: !include /a.yml"),
            ])))
            .autoload(false)
            .max_depth(4)
            .build();
        let doc = resolver.parse_str("!include /a.yml").unwrap();
        let err = resolve(doc, &resolver).unwrap_err();
        match err {
            IncludeError::MaxIncludeDepthExceeded { limit, chain } => {
                assert_eq!(limit, 4);
                assert_eq!(chain, vec!["/a.yml", "/b.yml", "/a.yml", "/b.yml", "/a.yml"]);
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_resolve_each_reports_in_document_order() {
        let resolver = lazy_resolver(&[
            ("/a.yml", "inner: !include /c.yml"),
            ("/b.yml", "[1, 2]"),
            ("/c.yml", "c"),
        ]);
        let source = "first: !include /a.yml\nsecond: [x, !include /b.yml]";

        let mut doc = resolver.parse_str(source).unwrap();
        let mut seen = Vec::new();
        resolve_each(&mut doc, &resolver, true, |params, value| {
            seen.push((params.path().to_string(), value.kind_name()));
        })
        .unwrap();
        assert_eq!(
            seen,
            vec![
                ("/a.yml".to_string(), "mapping"),
                ("/c.yml".to_string(), "string"),
                ("/b.yml".to_string(), "sequence"),
            ]
        );
        assert_eq!(doc.count_includes(), 0);

        let mut doc = resolver.parse_str(source).unwrap();
        let mut count = 0;
        resolve_each(&mut doc, &resolver, false, |_, _| count += 1).unwrap();
        assert_eq!(count, 2);
        assert_eq!(doc.count_includes(), 1);
    }

    #[test]
    fn test_resolve_each_keeps_progress_on_error() {
        let resolver = lazy_resolver(&[("/a.yml", "a")]);
        let mut doc = resolver
            .parse_str("[!include /a.yml, !include /missing.yml]")
            .unwrap();
        let mut paths = Vec::new();
        let err = resolve_each(&mut doc, &resolver, true, |params, _| {
            paths.push(params.path().to_string());
        })
        .unwrap_err();
        assert!(matches!(err, IncludeError::BackendAccess { .. }));
        assert_eq!(paths, vec!["/a.yml"]);
        assert_eq!(doc.as_sequence().map(|items| items[0].clone()), Some(Value::from("a")));
        assert_eq!(doc.count_includes(), 1);
    }

    #[test]
    fn test_plain_tree_is_unchanged() {
        let resolver = lazy_resolver(&[]);
        let doc = resolver.parse_str("a: [1, {b: c}]").unwrap();
        assert_eq!(resolve(doc.clone(), &resolver).unwrap(), doc);
    }

    #[test]
    fn test_missing_target_aborts() {
        let resolver = lazy_resolver(&[("/a.yml", "a")]);
        let doc = resolver.parse_str("[!include /a.yml, !include /missing.yml]").unwrap();
        let err = resolve(doc, &resolver).unwrap_err();
        assert!(matches!(
            err,
            IncludeError::BackendAccess { ref path, .. } if path == "/missing.yml"
        ));
    }
}
