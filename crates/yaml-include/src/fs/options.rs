/*
 * fs/options.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Interpretation of glob/open option sets shared by the built-in backends.
 */

use glob::MatchOptions;

use super::{BackendError, BackendResult};
use crate::params::OptionArgs;
use crate::value::Value;

/// Listing options understood by the built-in backends.
///
/// Positional form: `[maxdepth]`. Named form: `maxdepth`, `case_sensitive`,
/// `require_literal_separator`, `require_literal_leading_dot`.
#[derive(Debug, Clone, Copy)]
pub struct GlobSettings {
    /// Maximum number of path components a match may have below the
    /// literal (wildcard-free) prefix of the pattern.
    pub max_depth: Option<usize>,
    pub match_options: MatchOptions,
}

impl Default for GlobSettings {
    fn default() -> Self {
        Self {
            max_depth: None,
            // `*` stays within one path component, as in a shell
            match_options: MatchOptions {
                require_literal_separator: true,
                ..MatchOptions::new()
            },
        }
    }
}

impl GlobSettings {
    pub fn from_args(args: &OptionArgs) -> BackendResult<Self> {
        let mut settings = GlobSettings::default();
        match args {
            OptionArgs::Positional(values) => match values.as_slice() {
                [] => {}
                [max_depth] => settings.max_depth = parse_max_depth(max_depth)?,
                _ => {
                    return Err(BackendError::unsupported(
                        "glob",
                        "expected at most one positional argument (maxdepth)",
                    ));
                }
            },
            OptionArgs::Named(named) => {
                for (name, value) in named {
                    match name.as_str() {
                        "maxdepth" => settings.max_depth = parse_max_depth(value)?,
                        "case_sensitive" => {
                            settings.match_options.case_sensitive = parse_flag(name, value)?
                        }
                        "require_literal_separator" => {
                            settings.match_options.require_literal_separator =
                                parse_flag(name, value)?
                        }
                        "require_literal_leading_dot" => {
                            settings.match_options.require_literal_leading_dot =
                                parse_flag(name, value)?
                        }
                        _ => {
                            return Err(BackendError::unsupported(
                                name.as_str(),
                                "not a recognized glob option",
                            ));
                        }
                    }
                }
            }
        }
        Ok(settings)
    }

    /// Whether `path`, a match of `pattern`, is within the depth limit.
    pub fn accepts(&self, pattern: &str, path: &str) -> bool {
        let Some(max_depth) = self.max_depth else {
            return true;
        };
        let prefix = components(pattern)
            .take_while(|c| !c.contains(|ch: char| matches!(ch, '*' | '?' | '[')))
            .count();
        components(path).count().saturating_sub(prefix) <= max_depth
    }
}

fn components(path: &str) -> impl Iterator<Item = &str> {
    path.split(|ch: char| ch == '/' || ch == '\\')
        .filter(|c| !c.is_empty() && *c != ".")
}

fn parse_max_depth(value: &Value) -> BackendResult<Option<usize>> {
    // Integers sometimes arrive as strings from hand-written directives
    let depth = match value {
        Value::Null => return Ok(None),
        Value::Integer(i) => usize::try_from(*i).ok(),
        Value::String(s) => s.trim().parse::<usize>().ok(),
        _ => None,
    };
    match depth {
        Some(0) | None => Err(BackendError::unsupported(
            "maxdepth",
            format!("expected a positive integer, found {}", value.kind_name()),
        )),
        Some(depth) => Ok(Some(depth)),
    }
}

fn parse_flag(name: &str, value: &Value) -> BackendResult<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        other => Err(BackendError::unsupported(
            name,
            format!("expected a boolean, found {}", other.kind_name()),
        )),
    }
}

/// Validate open options for backends that only serve UTF-8 text reads.
///
/// Positional form: `[mode]`. Named form: `mode`, `encoding`.
pub fn check_open_options(args: &OptionArgs) -> BackendResult<()> {
    match args {
        OptionArgs::Positional(values) => match values.as_slice() {
            [] => Ok(()),
            [mode] => check_mode(mode),
            _ => Err(BackendError::unsupported(
                "open",
                "expected at most one positional argument (mode)",
            )),
        },
        OptionArgs::Named(named) => {
            for (name, value) in named {
                match name.as_str() {
                    "mode" => check_mode(value)?,
                    "encoding" => check_encoding(value)?,
                    _ => {
                        return Err(BackendError::unsupported(
                            name.as_str(),
                            "not a recognized open option",
                        ));
                    }
                }
            }
            Ok(())
        }
    }
}

fn check_mode(value: &Value) -> BackendResult<()> {
    match value.as_str() {
        Some(mode) if mode.starts_with('r') && mode.chars().all(|c| matches!(c, 'r' | 'b' | 't')) => {
            Ok(())
        }
        _ => Err(BackendError::unsupported(
            "mode",
            "only read modes (r, rb, rt) are supported",
        )),
    }
}

fn check_encoding(value: &Value) -> BackendResult<()> {
    match value.as_str().map(str::to_ascii_lowercase).as_deref() {
        Some("utf-8" | "utf8") => Ok(()),
        _ => Err(BackendError::unsupported(
            "encoding",
            "only utf-8 is supported",
        )),
    }
}
