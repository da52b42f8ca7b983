/*
 * value.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Document value tree produced by the parser and consumed by the resolver.
 */

//! Document values.
//!
//! [`Value`] is the tree every parsed document turns into. Besides the usual
//! YAML shapes it carries [`Value::Include`], the placeholder left behind by an
//! include directive that was parsed while autoload was off.

use hashlink::LinkedHashMap;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::emitter;
use crate::params::IncludeParams;

/// Insertion-ordered YAML mapping.
pub type Mapping = LinkedHashMap<Value, Value>;

/// A YAML document node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    /// Floating point number, kept in its source spelling so that values
    /// stay hashable and round-trip exactly.
    Real(String),
    String(String),
    Sequence(Vec<Value>),
    Mapping(Mapping),
    /// An include directive that has not been resolved yet.
    Include(Box<IncludeParams>),
}

impl Value {
    /// Resolve an untagged plain scalar to its typed value.
    ///
    /// Booleans follow YAML 1.1 spelling (`yes`/`no`/`on`/`off` included);
    /// integers accept decimal, `0x` and `0o` forms.
    pub fn from_plain_scalar(text: &str) -> Value {
        match text {
            "null" | "Null" | "NULL" | "~" | "" => return Value::Null,
            "true" | "True" | "TRUE" | "yes" | "Yes" | "YES" | "on" | "On" | "ON" => {
                return Value::Bool(true);
            }
            "false" | "False" | "FALSE" | "no" | "No" | "NO" | "off" | "Off" | "OFF" => {
                return Value::Bool(false);
            }
            ".inf" | ".Inf" | ".INF" | "+.inf" | "+.Inf" | "+.INF" | "-.inf" | "-.Inf"
            | "-.INF" | ".nan" | ".NaN" | ".NAN" => return Value::Real(text.to_string()),
            _ => {}
        }

        if let Ok(i) = text.parse::<i64>() {
            return Value::Integer(i);
        }
        let radix = text
            .strip_prefix("0x")
            .map(|digits| (digits, 16))
            .or_else(|| text.strip_prefix("0o").map(|digits| (digits, 8)));
        if let Some(Ok(i)) = radix.map(|(digits, radix)| i64::from_str_radix(digits, radix)) {
            return Value::Integer(i);
        }
        if looks_like_float(text) {
            return Value::Real(text.to_string());
        }

        Value::String(text.to_string())
    }

    /// Short name of the node kind, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Real(_) => "real",
            Value::String(_) => "string",
            Value::Sequence(_) => "sequence",
            Value::Mapping(_) => "mapping",
            Value::Include(_) => "include placeholder",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_include(&self) -> bool {
        matches!(self, Value::Include(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Real(r) => parse_real(r),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Value::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_include(&self) -> Option<&IncludeParams> {
        match self {
            Value::Include(params) => Some(params),
            _ => None,
        }
    }

    /// Look up a mapping entry by string key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_mapping()
            .and_then(|map| map.get(&Value::String(key.to_string())))
    }

    /// Number of unresolved placeholders anywhere in this tree.
    ///
    /// Placeholders used as mapping keys are counted too, although the
    /// loader never resolves those.
    pub fn count_includes(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match node {
                Value::Include(_) => count += 1,
                Value::Sequence(items) => stack.extend(items),
                Value::Mapping(map) => {
                    for (key, value) in map {
                        stack.push(key);
                        stack.push(value);
                    }
                }
                _ => {}
            }
        }
        count
    }

    /// Text used when this value has to act as a string mapping key.
    pub(crate) fn key_text(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Real(r) => r.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null => "null".to_string(),
            other => emitter::flow_string(other),
        }
    }
}

fn looks_like_float(text: &str) -> bool {
    text.bytes().any(|b| b.is_ascii_digit())
        && text
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'))
        && text.parse::<f64>().is_ok()
}

/// YAML spelling of `f` that reads back as a real.
fn real_text(f: f64) -> String {
    if f.is_nan() {
        ".nan".to_string()
    } else if f.is_infinite() {
        let text = if f.is_sign_positive() { ".inf" } else { "-.inf" };
        text.to_string()
    } else {
        // `{:?}` keeps the fractional part, so 1.0 does not turn into 1
        format!("{f:?}")
    }
}

fn parse_real(text: &str) -> Option<f64> {
    match text.trim_start_matches('+') {
        ".inf" | ".Inf" | ".INF" => Some(f64::INFINITY),
        "-.inf" | "-.Inf" | "-.INF" => Some(f64::NEG_INFINITY),
        ".nan" | ".NaN" | ".NAN" => Some(f64::NAN),
        other => other.parse().ok(),
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Sequence(items)
    }
}

impl From<Mapping> for Value {
    fn from(map: Mapping) -> Self {
        Value::Mapping(map)
    }
}

impl From<IncludeParams> for Value {
    fn from(params: IncludeParams) -> Self {
        Value::Include(Box::new(params))
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Real(n.to_string()),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Sequence(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(object) => Value::Mapping(
                object
                    .into_iter()
                    .map(|(k, v)| (Value::String(k), Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<toml::Value> for Value {
    fn from(toml: toml::Value) -> Self {
        match toml {
            toml::Value::String(s) => Value::String(s),
            toml::Value::Integer(i) => Value::Integer(i),
            toml::Value::Float(f) => Value::Real(real_text(f)),
            toml::Value::Boolean(b) => Value::Bool(b),
            toml::Value::Datetime(dt) => Value::String(dt.to_string()),
            toml::Value::Array(items) => {
                Value::Sequence(items.into_iter().map(Value::from).collect())
            }
            toml::Value::Table(table) => Value::Mapping(
                table
                    .into_iter()
                    .map(|(k, v)| (Value::String(k), Value::from(v)))
                    .collect(),
            ),
        }
    }
}

/// Placeholders serialize as a single-entry map keyed by the default tag,
/// e.g. `{"!include": {"urlpath": "a.yml", "flatten": true}}`.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Real(r) => match parse_real(r) {
                Some(f) if f.is_finite() => serializer.serialize_f64(f),
                _ => serializer.serialize_str(r),
            },
            Value::String(s) => serializer.serialize_str(s),
            Value::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Mapping(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (key, value) in map {
                    out.serialize_entry(&key.key_text(), value)?;
                }
                out.end()
            }
            Value::Include(params) => {
                let mut out = serializer.serialize_map(Some(1))?;
                out.serialize_entry(
                    &format!("!{}", crate::resolver::DEFAULT_TAG),
                    &params.to_value(),
                )?;
                out.end()
            }
        }
    }
}
