/*
 * merge.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Combining the documents matched by one directive.
 */

use crate::error::{IncludeError, Result};
use crate::value::Value;

/// A parsed target, with the path it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded {
    pub path: String,
    pub value: Value,
}

impl Loaded {
    pub fn new(path: impl Into<String>, value: Value) -> Self {
        Self {
            path: path.into(),
            value,
        }
    }
}

/// Build the value that replaces a directive.
///
/// - no targets: an empty sequence
/// - one target: its content, unwrapped (`flatten` has no effect)
/// - several targets: a sequence in target order, or with `flatten`, the
///   concatenation of each target's top-level sequence
pub fn merge(loaded: Vec<Loaded>, flatten: bool) -> Result<Value> {
    let mut loaded = loaded;
    match loaded.len() {
        0 => Ok(Value::Sequence(Vec::new())),
        1 => Ok(loaded.remove(0).value),
        _ if flatten => {
            let mut items = Vec::new();
            for Loaded { path, value } in loaded {
                match value {
                    Value::Sequence(children) => items.extend(children),
                    other => {
                        return Err(IncludeError::FlattenTypeMismatch {
                            path,
                            found: other.kind_name(),
                        });
                    }
                }
            }
            Ok(Value::Sequence(items))
        }
        _ => Ok(Value::Sequence(
            loaded.into_iter().map(|target| target.value).collect(),
        )),
    }
}
