//! # yaml-include
//!
//! `!include` directives for YAML documents.
//!
//! A directive names another document, a URI, or a pattern, and is replaced
//! by the parsed content of what it designates:
//!
//! ```yaml
//! database: !include conf/db.yml            # one file: its content
//! plugins: !include plugins/*.yml           # a pattern: a sequence
//! rules: !include {urlpath: rules/*.yml, flatten: true}
//! ```
//!
//! ## Design
//!
//! Parsing runs through a [`Resolver`] that is built explicitly and passed to
//! every parse; nothing is registered globally. Directive payloads are
//! canonicalized into [`IncludeParams`], classified into a [`Strategy`], and
//! executed against pluggable [`FileSystem`] backends. Results are merged
//! into a single value, a sequence, or a flattened sequence.
//!
//! With autoload off, directives become [`Value::Include`] placeholders that
//! serialize back to directives and can be resolved later with [`resolve`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use yaml_include::Resolver;
//!
//! let resolver = Resolver::builder().base_dir("conf").build();
//! let doc = resolver.parse_path("conf/main.yml").unwrap();
//! print!("{}", resolver.dump(&doc));
//! ```

pub mod config;
mod content;
mod emitter;
mod error;
pub mod fs;
mod loader;
mod location;
mod merge;
mod params;
mod parser;
mod resolver;
mod target;
mod value;

use std::io::Read;
use std::path::Path;

pub use config::{ConfigError, IncludeConfig, LoaderKind};
pub use content::{ContentLoader, ExtensionLoader, YamlLoader};
pub use emitter::Emitter;
pub use error::{IncludeError, Result};
pub use fs::{BackendError, FileSystem, FileSystemRegistry, LocalFileSystem, MemoryFileSystem};
pub use loader::{resolve, resolve_each, resolve_in_place, resolve_shallow};
pub use location::Location;
pub use merge::{Loaded, merge};
pub use params::{IncludeParams, NamedOptions, OptionArgs, PATH_KEYS};
pub use parser::DocumentParser;
pub use resolver::{
    AutoloadGuard, BaseDir, DEFAULT_MAX_DEPTH, DEFAULT_TAG, Resolver, ResolverBuilder,
};
pub use target::{Strategy, plan};
pub use value::{Mapping, Value};

/// Parse `text` with `resolver`.
pub fn from_str(text: &str, resolver: &Resolver) -> Result<Value> {
    resolver.parse_str(text)
}

pub fn from_reader<R: Read>(mut reader: R, resolver: &Resolver) -> Result<Value> {
    resolver.parse_reader(&mut reader)
}

/// Parse a file from the host filesystem; syntax errors name the file.
pub fn from_path(path: impl AsRef<Path>, resolver: &Resolver) -> Result<Value> {
    resolver.parse_path(path)
}

/// Serialize `value` as YAML with the default `!include` tag.
pub fn to_string(value: &Value) -> String {
    emitter::to_string(value)
}
