/*
 * emitter.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * YAML writer for Value trees, placeholders included.
 */

use std::io::{self, Write};

use crate::resolver::DEFAULT_TAG;
use crate::value::{Mapping, Value};

const INDENT: usize = 2;

/// Longer keys get the explicit `? key` form; YAML caps implicit keys at
/// 1024 characters.
const MAX_IMPLICIT_KEY: usize = 1000;

/// Block-style YAML writer.
///
/// Non-empty collections are written in block style with two-space
/// indentation. Empty collections, mapping keys and directive payloads
/// use flow style. Placeholders come out as `!<tag> <payload>`, which
/// parses back to the same parameters.
#[derive(Debug, Clone)]
pub struct Emitter<'a> {
    tag: &'a str,
}

impl Default for Emitter<'_> {
    fn default() -> Self {
        Self { tag: DEFAULT_TAG }
    }
}

impl<'a> Emitter<'a> {
    pub fn new(tag: &'a str) -> Self {
        Self { tag }
    }

    pub fn emit<T: Write>(&self, value: &Value, buf: &mut T) -> io::Result<()> {
        match value {
            Value::Mapping(map) if !map.is_empty() => self.write_block_mapping(map, 0, false, buf),
            Value::Sequence(items) if !items.is_empty() => {
                self.write_block_sequence(items, 0, false, buf)
            }
            other => {
                self.write_flow(other, buf)?;
                writeln!(buf)
            }
        }
    }

    pub fn to_string(&self, value: &Value) -> String {
        let mut buf = Vec::new();
        // Writing into a Vec<u8> does not fail
        let _ = self.emit(value, &mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Write `map` at `indent`; with `inline_first` the first entry
    /// continues the current line (after a `- ` marker).
    fn write_block_mapping<T: Write>(
        &self,
        map: &Mapping,
        indent: usize,
        inline_first: bool,
        buf: &mut T,
    ) -> io::Result<()> {
        for (i, (key, value)) in map.iter().enumerate() {
            if i > 0 || !inline_first {
                write_indent(indent, buf)?;
            }
            let mut key_text = Vec::new();
            self.write_flow(key, &mut key_text)?;
            if key_text.len() > MAX_IMPLICIT_KEY {
                write!(buf, "? ")?;
                buf.write_all(&key_text)?;
                writeln!(buf)?;
                write_indent(indent, buf)?;
            } else {
                buf.write_all(&key_text)?;
            }
            write!(buf, ":")?;
            self.write_block_value(value, indent, buf)?;
        }
        Ok(())
    }

    fn write_block_sequence<T: Write>(
        &self,
        items: &[Value],
        indent: usize,
        inline_first: bool,
        buf: &mut T,
    ) -> io::Result<()> {
        for (i, item) in items.iter().enumerate() {
            if i > 0 || !inline_first {
                write_indent(indent, buf)?;
            }
            write!(buf, "- ")?;
            match item {
                Value::Mapping(map) if !map.is_empty() => {
                    self.write_block_mapping(map, indent + INDENT, true, buf)?
                }
                Value::Sequence(inner) if !inner.is_empty() => {
                    self.write_block_sequence(inner, indent + INDENT, true, buf)?
                }
                other => {
                    self.write_flow(other, buf)?;
                    writeln!(buf)?;
                }
            }
        }
        Ok(())
    }

    /// The part of a mapping entry after `key:`.
    fn write_block_value<T: Write>(&self, value: &Value, indent: usize, buf: &mut T) -> io::Result<()> {
        match value {
            Value::Mapping(map) if !map.is_empty() => {
                writeln!(buf)?;
                self.write_block_mapping(map, indent + INDENT, false, buf)
            }
            Value::Sequence(items) if !items.is_empty() => {
                writeln!(buf)?;
                self.write_block_sequence(items, indent + INDENT, false, buf)
            }
            other => {
                write!(buf, " ")?;
                self.write_flow(other, buf)?;
                writeln!(buf)
            }
        }
    }

    fn write_flow<T: Write>(&self, value: &Value, buf: &mut T) -> io::Result<()> {
        match value {
            Value::Null => write!(buf, "null"),
            Value::Bool(b) => write!(buf, "{}", b),
            Value::Integer(i) => write!(buf, "{}", i),
            Value::Real(r) => write!(buf, "{}", r),
            Value::String(s) => write_string(s, buf),
            Value::Sequence(items) => {
                write!(buf, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(buf, ", ")?;
                    }
                    self.write_flow(item, buf)?;
                }
                write!(buf, "]")
            }
            Value::Mapping(map) => {
                write!(buf, "{{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(buf, ", ")?;
                    }
                    self.write_flow(key, buf)?;
                    write!(buf, ": ")?;
                    self.write_flow(value, buf)?;
                }
                write!(buf, "}}")
            }
            Value::Include(params) => {
                write!(buf, "!{} ", self.tag)?;
                self.write_flow(&params.to_value(), buf)
            }
        }
    }
}

/// Serialize `value` with the default tag.
pub fn to_string(value: &Value) -> String {
    Emitter::default().to_string(value)
}

/// Single-line flow form of `value`.
pub(crate) fn flow_string(value: &Value) -> String {
    let emitter = Emitter::default();
    let mut buf = Vec::new();
    let _ = emitter.write_flow(value, &mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}

fn write_indent<T: Write>(indent: usize, buf: &mut T) -> io::Result<()> {
    write!(buf, "{:indent$}", "", indent = indent)
}

fn write_string<T: Write>(text: &str, buf: &mut T) -> io::Result<()> {
    if !needs_quotes(text) {
        return write!(buf, "{}", text);
    }
    write!(buf, "\"")?;
    for ch in text.chars() {
        match ch {
            '\\' => write!(buf, "\\\\"),
            '"' => write!(buf, "\\\""),
            '\n' => write!(buf, "\\n"),
            '\t' => write!(buf, "\\t"),
            '\r' => write!(buf, "\\r"),
            c if c.is_control() => write!(buf, "\\x{:02X}", c as u32),
            c => write!(buf, "{}", c),
        }?
    }
    write!(buf, "\"")
}

/// Whether `text` has to be quoted to read back as the same string.
fn needs_quotes(text: &str) -> bool {
    let Some(first) = text.chars().next() else {
        return true;
    };
    if !matches!(Value::from_plain_scalar(text), Value::String(_)) {
        return true;
    }
    if "-?:,[]{}#&*!|>'\"%@`".contains(first) || first.is_whitespace() {
        return true;
    }
    if text.ends_with(char::is_whitespace) || text.starts_with("...") {
        return true;
    }
    text.chars()
        .any(|c| matches!(c, ':' | '#' | ',' | '[' | ']' | '{' | '}') || c.is_control())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{IncludeParams, OptionArgs};
    use crate::resolver::Resolver;

    fn map(entries: Vec<(&str, Value)>) -> Value {
        Value::Mapping(
            entries
                .into_iter()
                .map(|(k, v)| (Value::from(k), v))
                .collect(),
        )
    }

    #[test]
    fn test_scalars() {
        assert_eq!(to_string(&Value::Null), "null\n");
        assert_eq!(to_string(&Value::Integer(3)), "3\n");
        assert_eq!(to_string(&Value::from("plain text")), "plain text\n");
        assert_eq!(to_string(&Value::Sequence(vec![])), "[]\n");
    }

    #[test]
    fn test_quoting() {
        assert_eq!(to_string(&Value::from("")), "\"\"\n");
        assert_eq!(to_string(&Value::from("42")), "\"42\"\n");
        assert_eq!(to_string(&Value::from("yes")), "\"yes\"\n");
        assert_eq!(to_string(&Value::from("*.yml")), "\"*.yml\"\n");
        assert_eq!(to_string(&Value::from("a: b")), "\"a: b\"\n");
        assert_eq!(to_string(&Value::from("line\nbreak")), "\"line\\nbreak\"\n");
        assert_eq!(to_string(&Value::from("say \"hi\"")), "say \"hi\"\n");
    }

    #[test]
    fn test_block_layout() {
        let value = map(vec![
            ("name", "demo".into()),
            (
                "items",
                Value::Sequence(vec![
                    map(vec![("a", Value::Integer(1)), ("b", Value::Integer(2))]),
                    Value::Sequence(vec!["x".into(), "y".into()]),
                    "z".into(),
                ]),
            ),
            ("nested", map(vec![("empty", Value::Mapping(Mapping::new()))])),
        ]);
        let expected = "\
name: demo
items:
  - a: 1
    b: 2
  - - x
    - y
  - z
nested:
  empty: {}
";
        assert_eq!(to_string(&value), expected);
    }

    #[test]
    fn test_placeholders() {
        let simple = Value::from(IncludeParams::new("a.yml").unwrap());
        let pattern = Value::from(
            IncludeParams::new("*.yml")
                .unwrap()
                .with_flatten(true)
                .with_glob_options(OptionArgs::Positional(vec![Value::Integer(2)])),
        );
        let doc = map(vec![("a", simple), ("b", pattern)]);
        assert_eq!(
            to_string(&doc),
            "a: !include a.yml\nb: !include {urlpath: \"*.yml\", flatten: true, glob: [2]}\n"
        );
        assert_eq!(
            Emitter::new("inc").to_string(&doc.get("a").cloned().unwrap()),
            "!inc a.yml\n"
        );
    }

    #[test]
    fn test_output_parses_back() {
        let resolver = Resolver::builder().autoload(false).build();
        let source = r##"
title: "2024"
flags: [on, "off", ~]
paths:
  - "C:\\data"
  - "key: value"
  - !include {path: "conf/*.yml", glob: {maxdepth: 1}, open: [r]}
deep:
  - - [1, 2]
    - {x: "#"}
"##;
        let value = resolver.parse_str(source).unwrap();
        let reparsed = resolver.parse_str(&resolver.dump(&value)).unwrap();
        assert_eq!(reparsed, value);
    }

    #[test]
    fn test_document_markers_are_quoted() {
        let resolver = Resolver::builder().autoload(false).build();
        assert_eq!(to_string(&Value::from("...")), "\"...\"\n");
        for value in [
            Value::from("..."),
            Value::from("---"),
            Value::Sequence(vec!["... more".into(), "a...b".into()]),
        ] {
            let reparsed = resolver.parse_str(&resolver.dump(&value)).unwrap();
            assert_eq!(reparsed, value);
        }
    }

    #[test]
    fn test_long_keys_use_explicit_form() {
        let resolver = Resolver::builder().autoload(false).build();
        let long_key = "k".repeat(2000);
        let value = map(vec![
            (long_key.as_str(), Value::Integer(1)),
            (
                "items",
                Value::Sequence(vec![map(vec![
                    (long_key.as_str(), map(vec![("x", "y".into())])),
                    ("short", Value::Bool(true)),
                ])]),
            ),
        ]);

        let dumped = resolver.dump(&value);
        assert!(dumped.starts_with(&format!("? {long_key}\n: 1\n")));
        let reparsed = resolver.parse_str(&dumped).unwrap();
        assert_eq!(reparsed, value);
    }
}
