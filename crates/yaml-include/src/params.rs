/*
 * params.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Canonicalization of include directive payloads.
 */

//! Include directive parameters.
//!
//! A directive's payload comes in one of three shapes:
//!
//! ```yaml
//! a: !include foo.yml                                   # scalar
//! b: !include [foo/**/*.yml, 2, {mode: r}]              # sequence
//! c: !include {urlpath: "*.yml", flatten: true, open: {encoding: utf-8}}
//! ```
//!
//! [`IncludeParams::from_payload`] turns all of them into the same record.

use hashlink::LinkedHashMap;

use crate::error::{IncludeError, Result};
use crate::value::{Mapping, Value};

/// Keys accepted as the path of a mapping-form directive.
pub const PATH_KEYS: [&str; 3] = ["path", "pathname", "urlpath"];

/// Named backend options.
pub type NamedOptions = LinkedHashMap<String, Value>;

/// Arguments forwarded to a backend `glob` or `open` call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OptionArgs {
    Positional(Vec<Value>),
    Named(NamedOptions),
}

impl Default for OptionArgs {
    fn default() -> Self {
        OptionArgs::Positional(Vec::new())
    }
}

impl OptionArgs {
    pub fn is_empty(&self) -> bool {
        match self {
            OptionArgs::Positional(args) => args.is_empty(),
            OptionArgs::Named(args) => args.is_empty(),
        }
    }

    /// Positional arguments; empty for the named form.
    pub fn positional(&self) -> &[Value] {
        match self {
            OptionArgs::Positional(args) => args,
            OptionArgs::Named(_) => &[],
        }
    }

    /// A named argument; always `None` for the positional form.
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self {
            OptionArgs::Named(args) => args.get(name),
            OptionArgs::Positional(_) => None,
        }
    }

    /// Read an option set from its YAML form.
    ///
    /// Sequences become positional arguments, mappings become named ones,
    /// any other scalar is a single positional argument. `set` names the
    /// option set for error messages.
    pub fn from_value(set: &str, value: Value) -> Result<Self> {
        let args = match value {
            Value::Null => OptionArgs::default(),
            Value::Sequence(items) => OptionArgs::Positional(items),
            Value::Mapping(map) => {
                let mut named = NamedOptions::new();
                for (key, value) in map {
                    match key {
                        Value::String(name) => {
                            named.insert(name, value);
                        }
                        other => {
                            return Err(IncludeError::invalid_option(
                                set,
                                format!("option names must be strings, found {}", other.kind_name()),
                            ));
                        }
                    }
                }
                OptionArgs::Named(named)
            }
            Value::Include(_) => {
                return Err(IncludeError::malformed(format!(
                    "`{set}` options cannot contain an include directive"
                )));
            }
            scalar => OptionArgs::Positional(vec![scalar]),
        };
        // Empty sets compare equal regardless of the shape they were written in
        if args.is_empty() {
            Ok(OptionArgs::default())
        } else {
            Ok(args)
        }
    }

    /// Combine two option sets; entries of `other` win on name clashes.
    ///
    /// Positional and named arguments cannot be combined with each other.
    pub fn union(&self, other: &OptionArgs) -> Result<OptionArgs> {
        match (self, other) {
            (this, other) if other.is_empty() => Ok(this.clone()),
            (this, other) if this.is_empty() => Ok(other.clone()),
            (OptionArgs::Positional(a), OptionArgs::Positional(b)) => {
                Ok(OptionArgs::Positional(a.iter().chain(b).cloned().collect()))
            }
            (OptionArgs::Named(a), OptionArgs::Named(b)) => {
                let mut merged = a.clone();
                for (name, value) in b {
                    merged.replace(name.clone(), value.clone());
                }
                Ok(OptionArgs::Named(merged))
            }
            _ => Err(IncludeError::invalid_option(
                "options",
                "cannot combine positional and named options",
            )),
        }
    }

    /// YAML form, as accepted back by [`OptionArgs::from_value`].
    pub fn to_value(&self) -> Value {
        match self {
            OptionArgs::Positional(args) => Value::Sequence(args.clone()),
            OptionArgs::Named(args) => Value::Mapping(
                args.iter()
                    .map(|(name, value)| (Value::String(name.clone()), value.clone()))
                    .collect(),
            ),
        }
    }
}

/// Canonical parameters of one include directive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IncludeParams {
    path: String,
    glob: OptionArgs,
    open: OptionArgs,
    flatten: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Partition {
    Glob,
    Open,
}

impl Partition {
    fn from_key(key: &str) -> Option<Self> {
        match key {
            "glob" => Some(Partition::Glob),
            "open" => Some(Partition::Open),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Partition::Glob => "glob",
            Partition::Open => "open",
        }
    }
}

impl IncludeParams {
    /// Parameters with a path expression and no options.
    pub fn new(path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        if path.trim().is_empty() {
            return Err(IncludeError::MissingPathExpression);
        }
        Ok(Self {
            path,
            glob: OptionArgs::default(),
            open: OptionArgs::default(),
            flatten: false,
        })
    }

    pub fn with_glob_options(mut self, glob: OptionArgs) -> Self {
        self.glob = glob;
        self
    }

    pub fn with_open_options(mut self, open: OptionArgs) -> Self {
        self.open = open;
        self
    }

    pub fn with_flatten(mut self, flatten: bool) -> Self {
        self.flatten = flatten;
        self
    }

    /// The path expression: a path, a URI, or a pattern.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn glob_options(&self) -> &OptionArgs {
        &self.glob
    }

    pub fn open_options(&self) -> &OptionArgs {
        &self.open
    }

    pub fn flatten(&self) -> bool {
        self.flatten
    }

    /// Canonicalize a directive payload.
    pub fn from_payload(payload: Value) -> Result<Self> {
        match payload {
            Value::Sequence(items) => Self::from_sequence(items),
            Value::Mapping(map) => Self::from_mapping(map),
            Value::Include(_) => Err(IncludeError::malformed(
                "an include directive cannot take another include directive as argument",
            )),
            scalar => Self::new(path_text(scalar)?),
        }
    }

    fn from_sequence(items: Vec<Value>) -> Result<Self> {
        let mut items = items.into_iter();
        let path = match items.next() {
            Some(first) => path_text(first)?,
            None => return Err(IncludeError::MissingPathExpression),
        };

        let mut glob = None;
        let mut open = None;
        for (position, item) in items.enumerate() {
            let (partition, value) = match partition_of(&item) {
                Some(partition) => (partition, partition_value(item)),
                None => match position {
                    0 => (Partition::Glob, item),
                    1 => (Partition::Open, item),
                    _ => {
                        return Err(IncludeError::malformed(
                            "expected at most two option arguments after the path",
                        ));
                    }
                },
            };
            let slot = match partition {
                Partition::Glob => &mut glob,
                Partition::Open => &mut open,
            };
            if slot.is_some() {
                return Err(IncludeError::malformed(format!(
                    "`{}` options given more than once",
                    partition.name()
                )));
            }
            *slot = Some(OptionArgs::from_value(partition.name(), value)?);
        }

        Ok(Self::new(path)?
            .with_glob_options(glob.unwrap_or_default())
            .with_open_options(open.unwrap_or_default()))
    }

    fn from_mapping(map: Mapping) -> Result<Self> {
        let mut path = None;
        let mut flatten = false;
        let mut glob = None;
        let mut open = None;
        let mut rest = NamedOptions::new();

        for (key, value) in map {
            let key = match key {
                Value::String(key) => key,
                other => {
                    return Err(IncludeError::malformed(format!(
                        "option names must be strings, found {}",
                        other.kind_name()
                    )));
                }
            };
            if PATH_KEYS.contains(&key.as_str()) {
                if path.is_some() {
                    return Err(IncludeError::malformed(format!(
                        "only one of {} may be given",
                        PATH_KEYS.join(", ")
                    )));
                }
                path = Some(path_text(value)?);
                continue;
            }
            match key.as_str() {
                "flatten" => flatten = coerce_flatten(value)?,
                "glob" => glob = Some(OptionArgs::from_value("glob", value)?),
                "open" => open = Some(OptionArgs::from_value("open", value)?),
                _ => {
                    rest.insert(key, value);
                }
            }
        }

        let path = path.ok_or(IncludeError::MissingPathExpression)?;
        let rest = if rest.is_empty() {
            OptionArgs::default()
        } else {
            OptionArgs::Named(rest)
        };
        let open = rest.union(&open.unwrap_or_default())?;

        Ok(Self::new(path)?
            .with_glob_options(glob.unwrap_or_default())
            .with_open_options(open)
            .with_flatten(flatten))
    }

    /// Canonical payload, as written back by the emitter.
    ///
    /// Parameters without options keep the scalar form; anything else uses
    /// the mapping form with explicit `glob`/`open` partitions so that the
    /// result parses back to an equal record.
    pub fn to_value(&self) -> Value {
        if !self.flatten && self.glob.is_empty() && self.open.is_empty() {
            return Value::String(self.path.clone());
        }
        let mut map = Mapping::new();
        map.insert("urlpath".into(), Value::String(self.path.clone()));
        if self.flatten {
            map.insert("flatten".into(), Value::Bool(true));
        }
        if !self.glob.is_empty() {
            map.insert("glob".into(), self.glob.to_value());
        }
        if !self.open.is_empty() {
            map.insert("open".into(), self.open.to_value());
        }
        Value::Mapping(map)
    }
}

fn path_text(value: Value) -> Result<String> {
    match value {
        Value::Null => Err(IncludeError::MissingPathExpression),
        Value::String(s) => Ok(s),
        Value::Integer(i) => Ok(i.to_string()),
        Value::Real(r) => Ok(r),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(IncludeError::malformed(format!(
            "path expression must be a scalar, found {}",
            other.kind_name()
        ))),
    }
}

/// A single-entry mapping keyed `glob` or `open` inside a sequence payload.
fn partition_of(item: &Value) -> Option<Partition> {
    let map = item.as_mapping()?;
    if map.len() != 1 {
        return None;
    }
    map.keys().next()?.as_str().and_then(Partition::from_key)
}

fn partition_value(item: Value) -> Value {
    match item {
        Value::Mapping(map) => map.into_iter().next().map(|(_, v)| v).unwrap_or(Value::Null),
        other => other,
    }
}

fn coerce_flatten(value: Value) -> Result<bool> {
    match value {
        Value::Bool(b) => Ok(b),
        Value::Null => Ok(false),
        Value::String(text) => match Value::from_plain_scalar(&text) {
            Value::Bool(b) => Ok(b),
            _ => Err(IncludeError::invalid_option(
                "flatten",
                format!("expected a boolean, found {text:?}"),
            )),
        },
        other => Err(IncludeError::invalid_option(
            "flatten",
            format!("expected a boolean, found {}", other.kind_name()),
        )),
    }
}
