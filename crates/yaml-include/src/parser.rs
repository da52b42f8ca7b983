/*
 * parser.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * YAML parser that builds Value trees and hands include directives to the
 * resolver.
 */

//! Document parsing.
//!
//! The parser drives yaml-rust2's event API and builds [`Value`] trees on a
//! stack, like a regular loader. Nodes tagged with the resolver's include
//! tag are canonicalized into [`IncludeParams`] as soon as they complete and
//! then either resolved on the spot (autoload on) or kept as placeholders.

use std::collections::HashMap;
use std::io::Read;

use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser, Tag};
use yaml_rust2::scanner::{Marker, TScalarStyle};

use crate::content::read_text;
use crate::error::{IncludeError, Result};
use crate::location::Location;
use crate::params::IncludeParams;
use crate::resolver::Resolver;
use crate::value::{Mapping, Value};

/// Handle for parsing one document on behalf of a [`Resolver`].
///
/// Carries the chain of include expressions that led to this document, used
/// to enforce the resolver's depth limit, and an optional name reported in
/// syntax errors.
#[derive(Debug, Clone)]
pub struct DocumentParser<'r> {
    resolver: &'r Resolver,
    chain: Vec<String>,
    name: Option<String>,
}

impl<'r> DocumentParser<'r> {
    /// Parser for a top-level document.
    pub fn new(resolver: &'r Resolver) -> Self {
        Self {
            resolver,
            chain: Vec::new(),
            name: None,
        }
    }

    pub(crate) fn with_chain(resolver: &'r Resolver, chain: Vec<String>) -> Self {
        Self {
            resolver,
            chain,
            name: None,
        }
    }

    /// Name the document, usually after the path it was read from.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn resolver(&self) -> &'r Resolver {
        self.resolver
    }

    /// Include expressions leading to this document, outermost first.
    pub fn chain(&self) -> &[String] {
        &self.chain
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Parse the first YAML document in `text`.
    ///
    /// An empty input parses to [`Value::Null`].
    pub fn parse_str(&self, text: &str) -> Result<Value> {
        let mut parser = Parser::new_from_str(text);
        let mut builder = ValueBuilder::new(self);

        let scanned = parser.load(&mut builder, false); // false = single document only
        if let Some(err) = builder.error.take() {
            return Err(err);
        }
        if let Err(err) = scanned {
            return Err(IncludeError::Syntax {
                message: err.info().to_string(),
                location: Location::from_marker(err.marker()).with_file(self.name.clone()),
            });
        }
        Ok(builder.root.unwrap_or(Value::Null))
    }

    /// Read all of `reader` as UTF-8 and parse it.
    pub fn parse_reader(&self, reader: &mut dyn Read) -> Result<Value> {
        let name = self.name.as_deref().unwrap_or("<input>");
        let text = read_text(name, reader)?;
        self.parse_str(&text)
    }

    /// Turn a directive payload into the value that replaces it.
    pub fn construct(&self, payload: Value) -> Result<Value> {
        let params = IncludeParams::from_payload(payload)?;
        if self.resolver.autoload() {
            self.resolver.load_with(&params, &self.chain)
        } else {
            tracing::trace!(path = params.path(), "keeping include placeholder");
            Ok(Value::Include(Box::new(params)))
        }
    }

    fn is_include_tag(&self, tag: &Option<Tag>) -> bool {
        tag.as_ref().is_some_and(|tag| {
            (tag.handle == "!" || tag.handle.is_empty()) && tag.suffix == self.resolver.tag()
        })
    }
}

/// Schema tag (`!!str`, `!!int`, ...) if `tag` is one.
fn core_tag(tag: &Option<Tag>) -> Option<&str> {
    tag.as_ref()
        .filter(|tag| tag.handle == "tag:yaml.org,2002:" || tag.handle == "!!")
        .map(|tag| tag.suffix.as_str())
}

/// Builder that implements MarkedEventReceiver to construct Values.
struct ValueBuilder<'p, 'r> {
    parser: &'p DocumentParser<'r>,

    /// Stack of collections being constructed
    stack: Vec<Frame>,

    /// Completed anchored nodes, by anchor id
    anchors: HashMap<usize, Value>,

    /// The completed root node
    root: Option<Value>,

    /// First failure; later events are ignored once set
    error: Option<IncludeError>,
}

/// A collection being constructed during parsing.
enum Frame {
    Sequence {
        start: Marker,
        anchor: usize,
        include: bool,
        items: Vec<Value>,
    },
    Mapping {
        start: Marker,
        anchor: usize,
        include: bool,
        map: Mapping,
        key: Option<Value>,
    },
}

impl<'p, 'r> ValueBuilder<'p, 'r> {
    fn new(parser: &'p DocumentParser<'r>) -> Self {
        Self {
            parser,
            stack: Vec::new(),
            anchors: HashMap::new(),
            root: None,
            error: None,
        }
    }

    fn location(&self, marker: &Marker) -> Location {
        Location::from_marker(marker).with_file(self.parser.name.clone())
    }

    /// Finish a node: expand it if it is a directive, record its anchor,
    /// and attach it to the enclosing collection.
    fn complete(&mut self, value: Value, anchor: usize, include: bool, marker: &Marker) {
        let value = if include {
            match self.parser.construct(value) {
                Ok(value) => value,
                Err(err) => {
                    tracing::debug!(location = %self.location(marker), error = %err, "include directive failed");
                    self.error = Some(err);
                    return;
                }
            }
        } else {
            value
        };
        if anchor > 0 {
            self.anchors.insert(anchor, value.clone());
        }
        self.attach(value);
    }

    fn attach(&mut self, value: Value) {
        match self.stack.last_mut() {
            None => self.root = Some(value),
            Some(Frame::Sequence { items, .. }) => items.push(value),
            Some(Frame::Mapping { map, key, .. }) => match key.take() {
                Some(k) => {
                    map.insert(k, value);
                }
                None => *key = Some(value),
            },
        }
    }

    fn scalar(&self, text: String, style: TScalarStyle, tag: &Option<Tag>) -> Value {
        match core_tag(tag) {
            Some("str") => return Value::String(text),
            Some("null") => return Value::Null,
            Some("bool" | "int" | "float") => return Value::from_plain_scalar(&text),
            _ => {}
        }
        match style {
            TScalarStyle::Plain => Value::from_plain_scalar(&text),
            _ => Value::String(text),
        }
    }
}

impl MarkedEventReceiver for ValueBuilder<'_, '_> {
    fn on_event(&mut self, ev: Event, marker: Marker) {
        if self.error.is_some() {
            return;
        }

        match ev {
            Event::Nothing
            | Event::StreamStart
            | Event::StreamEnd
            | Event::DocumentStart
            | Event::DocumentEnd => {}

            Event::Scalar(text, style, anchor, tag) => {
                let include = self.parser.is_include_tag(&tag);
                let value = if include {
                    // Directive payloads are paths, whatever they look like
                    Value::String(text)
                } else {
                    self.scalar(text, style, &tag)
                };
                self.complete(value, anchor, include, &marker);
            }

            Event::SequenceStart(anchor, tag) => {
                let include = self.parser.is_include_tag(&tag);
                self.stack.push(Frame::Sequence {
                    start: marker,
                    anchor,
                    include,
                    items: Vec::new(),
                });
            }

            Event::SequenceEnd => match self.stack.pop() {
                Some(Frame::Sequence {
                    start,
                    anchor,
                    include,
                    items,
                }) => self.complete(Value::Sequence(items), anchor, include, &start),
                _ => {
                    self.error = Some(IncludeError::Syntax {
                        message: "unbalanced sequence end".into(),
                        location: self.location(&marker),
                    });
                }
            },

            Event::MappingStart(anchor, tag) => {
                let include = self.parser.is_include_tag(&tag);
                self.stack.push(Frame::Mapping {
                    start: marker,
                    anchor,
                    include,
                    map: Mapping::new(),
                    key: None,
                });
            }

            Event::MappingEnd => match self.stack.pop() {
                Some(Frame::Mapping {
                    start,
                    anchor,
                    include,
                    map,
                    ..
                }) => self.complete(Value::Mapping(map), anchor, include, &start),
                _ => {
                    self.error = Some(IncludeError::Syntax {
                        message: "unbalanced mapping end".into(),
                        location: self.location(&marker),
                    });
                }
            },

            Event::Alias(anchor) => match self.anchors.get(&anchor).cloned() {
                Some(value) => self.attach(value),
                None => {
                    self.error = Some(IncludeError::Syntax {
                        message: "alias refers to an unknown anchor".into(),
                        location: self.location(&marker),
                    });
                }
            },
        }
    }
}
