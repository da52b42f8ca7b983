/*
 * target.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Classification of path expressions into access strategies.
 */

//! Target classification.
//!
//! Precedence, evaluated on the path expression:
//!
//! 1. `<scheme>://` without wildcards: one `open_many` call on the scheme's
//!    backend, with glob and open options combined.
//! 2. Any wildcard (`*`, `?`, `[`): list with the glob options, then open
//!    each match with the open options.
//! 3. Otherwise a single open on the default backend, joined to the base
//!    directory unless the path is absolute.

use std::path::Path;

use crate::error::Result;
use crate::params::{IncludeParams, OptionArgs};

/// Characters that turn a path expression into a pattern.
pub const WILDCARDS: [char; 3] = ['*', '?', '['];

/// How a directive's targets are reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// Hand the whole expression to the scheme's backend.
    OpenMany {
        scheme: String,
        urlpath: String,
        options: OptionArgs,
    },

    /// List matches of `pattern`, then open each one in listing order.
    ///
    /// `scheme` is `None` for plain patterns, which go to the default backend.
    GlobThenOpen {
        scheme: Option<String>,
        pattern: String,
        glob_options: OptionArgs,
        open_options: OptionArgs,
    },

    /// Open exactly one path on the default backend.
    Open { path: String, options: OptionArgs },
}

impl Strategy {
    /// Short label for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Strategy::OpenMany { .. } => "open-many",
            Strategy::GlobThenOpen { .. } => "glob",
            Strategy::Open { .. } => "open",
        }
    }
}

/// Decide how to reach the targets of `params`.
///
/// Fails only when the combined option set of cases 1 and 3 mixes
/// positional and named arguments.
pub fn plan(params: &IncludeParams, base_dir: Option<&Path>) -> Result<Strategy> {
    let expression = params.path();
    let scheme = split_scheme(expression).map(|(scheme, _)| scheme.to_string());

    if has_wildcard(expression) {
        let pattern = match (&scheme, base_dir) {
            (None, Some(base)) if !is_absolute(expression) => join(base, expression),
            _ => expression.to_string(),
        };
        return Ok(Strategy::GlobThenOpen {
            scheme,
            pattern,
            glob_options: params.glob_options().clone(),
            open_options: params.open_options().clone(),
        });
    }

    let options = params.glob_options().union(params.open_options())?;
    match scheme {
        Some(scheme) => Ok(Strategy::OpenMany {
            scheme,
            urlpath: expression.to_string(),
            options,
        }),
        None => {
            let path = match base_dir {
                Some(base) if !is_absolute(expression) => join(base, expression),
                _ => expression.to_string(),
            };
            Ok(Strategy::Open { path, options })
        }
    }
}

/// Split `<scheme>://<rest>`; the scheme must look like a URI scheme.
pub fn split_scheme(expression: &str) -> Option<(&str, &str)> {
    let (scheme, rest) = expression.split_once("://")?;
    let mut chars = scheme.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some((scheme, rest))
}

pub fn has_wildcard(expression: &str) -> bool {
    expression.contains(|c: char| WILDCARDS.contains(&c))
}

/// Absolute by either `/`-rooted convention or the host's own rules.
pub fn is_absolute(path: &str) -> bool {
    path.starts_with('/') || Path::new(path).is_absolute()
}

fn join(base: &Path, relative: &str) -> String {
    base.join(relative).to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use std::path::PathBuf;

    fn params(path: &str) -> IncludeParams {
        IncludeParams::new(path).unwrap()
    }

    #[test]
    fn test_split_scheme() {
        assert_eq!(split_scheme("s3://bucket/a.yml"), Some(("s3", "bucket/a.yml")));
        assert_eq!(split_scheme("git+ssh://host/x"), Some(("git+ssh", "host/x")));
        assert_eq!(split_scheme("/tmp/a.yml"), None);
        assert_eq!(split_scheme("://nothing"), None);
        assert_eq!(split_scheme("dir/with ://space"), None);
    }

    #[test]
    fn test_relative_path_joins_base_dir() {
        let base = PathBuf::from("/data/conf");
        let strategy = plan(&params("a.yml"), Some(&base)).unwrap();
        assert_eq!(
            strategy,
            Strategy::Open {
                path: "/data/conf/a.yml".into(),
                options: OptionArgs::default(),
            }
        );

        let strategy = plan(&params("a.yml"), None).unwrap();
        assert_eq!(
            strategy,
            Strategy::Open {
                path: "a.yml".into(),
                options: OptionArgs::default(),
            }
        );
    }

    #[test]
    fn test_absolute_path_ignores_base_dir() {
        let base = PathBuf::from("/data/conf");
        let strategy = plan(&params("/etc/a.yml"), Some(&base)).unwrap();
        assert!(matches!(strategy, Strategy::Open { path, .. } if path == "/etc/a.yml"));
    }

    #[test]
    fn test_scheme_without_wildcard_opens_many() {
        let base = PathBuf::from("/data");
        let p = params("memory://x/a.yml")
            .with_glob_options(OptionArgs::Positional(vec![Value::Integer(2)]))
            .with_open_options(OptionArgs::Positional(vec!["r".into()]));
        let strategy = plan(&p, Some(&base)).unwrap();
        assert_eq!(
            strategy,
            Strategy::OpenMany {
                scheme: "memory".into(),
                urlpath: "memory://x/a.yml".into(),
                options: OptionArgs::Positional(vec![Value::Integer(2), "r".into()]),
            }
        );
        assert_eq!(strategy.kind(), "open-many");
    }

    #[test]
    fn test_wildcard_wins_over_scheme() {
        let strategy = plan(&params("memory://x/*.yml"), Some(Path::new("/data"))).unwrap();
        assert_eq!(
            strategy,
            Strategy::GlobThenOpen {
                scheme: Some("memory".into()),
                pattern: "memory://x/*.yml".into(),
                glob_options: OptionArgs::default(),
                open_options: OptionArgs::default(),
            }
        );
    }

    #[test]
    fn test_relative_pattern_joins_base_dir() {
        for pattern in ["*.yml", "a?.yml", "[ab].yml"] {
            let strategy = plan(&params(pattern), Some(Path::new("/data"))).unwrap();
            match strategy {
                Strategy::GlobThenOpen { scheme, pattern: p, .. } => {
                    assert_eq!(scheme, None);
                    assert_eq!(p, format!("/data/{pattern}"));
                }
                other => panic!("unexpected strategy {other:?}"),
            }
        }
    }

    #[test]
    fn test_mixed_option_shapes_fail_for_single_open() {
        let p = params("a.yml")
            .with_glob_options(OptionArgs::Positional(vec![Value::Integer(1)]))
            .with_open_options(OptionArgs::Named(
                [("mode".to_string(), Value::from("r"))].into_iter().collect(),
            ));
        assert!(plan(&p, None).is_err());

        // patterns keep the two sets apart, so they never clash
        let p = params("*.yml")
            .with_glob_options(OptionArgs::Positional(vec![Value::Integer(1)]))
            .with_open_options(OptionArgs::Named(
                [("mode".to_string(), Value::from("r"))].into_iter().collect(),
            ));
        assert!(plan(&p, None).is_ok());
    }
}
