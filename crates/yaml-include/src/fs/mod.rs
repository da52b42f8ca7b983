/*
 * fs/mod.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Storage backends used to list and open included documents.
 *
 * This abstraction allows includes to be served from different places:
 * - LocalFileSystem: the host filesystem (default, also `file://`)
 * - MemoryFileSystem: an in-process store (`memory://`)
 * - anything else registered by the caller for its own scheme
 */

mod local;
mod memory;
mod options;

use std::collections::HashMap;
use std::fmt;
use std::io::{self, Read};
use std::sync::Arc;

use thiserror::Error;

use crate::params::OptionArgs;

pub use local::LocalFileSystem;
pub use memory::MemoryFileSystem;
pub use options::{GlobSettings, check_open_options};

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// A readable byte stream; released when dropped.
pub type Stream = Box<dyn Read>;

/// Errors that can occur inside a storage backend
#[derive(Debug, Error)]
pub enum BackendError {
    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The target does not exist
    #[error("no such file: {0}")]
    NotFound(String),

    /// The pattern could not be compiled
    #[error("invalid pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// The backend does not understand an option it was given
    #[error("unsupported option `{name}`: {message}")]
    UnsupportedOption { name: String, message: String },

    /// Operation not supported by this backend (e.g. listing over HTTP)
    #[error("operation not supported: {0}")]
    NotSupported(String),

    /// No backend is registered for the scheme of a URI
    #[error("no backend registered for scheme `{0}`")]
    UnknownScheme(String),
}

impl BackendError {
    pub(crate) fn unsupported(name: impl Into<String>, message: impl Into<String>) -> Self {
        BackendError::UnsupportedOption {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Trait implemented by every storage backend.
///
/// Backends receive paths exactly as the resolver computed them, including
/// the `<scheme>://` prefix for scheme-qualified expressions, and the option
/// set the directive supplied for the call. Unknown options should be
/// rejected rather than ignored.
pub trait FileSystem: Send + Sync + fmt::Debug {
    /// Scheme this backend serves by default (e.g. "file", "memory").
    fn protocol(&self) -> &'static str;

    /// List the paths matching `pattern`, in a deterministic order.
    ///
    /// A pattern that matches nothing yields an empty list, not an error.
    fn glob(&self, pattern: &str, options: &OptionArgs) -> BackendResult<Vec<String>>;

    /// Open a single path for reading.
    fn open(&self, path: &str, options: &OptionArgs) -> BackendResult<Stream>;

    /// Open everything a scheme-qualified expression designates.
    ///
    /// Backends that understand compound URIs may return several streams;
    /// the default opens exactly one.
    fn open_many(&self, urlpath: &str, options: &OptionArgs) -> BackendResult<Vec<(String, Stream)>> {
        Ok(vec![(urlpath.to_string(), self.open(urlpath, options)?)])
    }
}

/// Backends keyed by URI scheme, plus the default used for plain paths.
#[derive(Debug, Clone)]
pub struct FileSystemRegistry {
    default: Arc<dyn FileSystem>,
    schemes: HashMap<String, Arc<dyn FileSystem>>,
}

impl FileSystemRegistry {
    /// Create a registry whose default backend also serves its own protocol.
    pub fn new(default: Arc<dyn FileSystem>) -> Self {
        let mut schemes = HashMap::new();
        schemes.insert(default.protocol().to_string(), Arc::clone(&default));
        Self { default, schemes }
    }

    /// Route `<scheme>://` expressions to `fs`, replacing any earlier entry.
    pub fn register(&mut self, scheme: impl Into<String>, fs: Arc<dyn FileSystem>) {
        self.schemes.insert(scheme.into().to_ascii_lowercase(), fs);
    }

    /// Replace the backend used for plain paths; it also serves its protocol.
    pub fn set_default(&mut self, fs: Arc<dyn FileSystem>) {
        self.schemes
            .insert(fs.protocol().to_string(), Arc::clone(&fs));
        self.default = fs;
    }

    pub fn default_backend(&self) -> &Arc<dyn FileSystem> {
        &self.default
    }

    pub fn for_scheme(&self, scheme: &str) -> BackendResult<&Arc<dyn FileSystem>> {
        self.schemes
            .get(&scheme.to_ascii_lowercase())
            .ok_or_else(|| BackendError::UnknownScheme(scheme.to_string()))
    }

    /// Backend for an optional scheme; `None` selects the default.
    pub fn select(&self, scheme: Option<&str>) -> BackendResult<&Arc<dyn FileSystem>> {
        match scheme {
            Some(scheme) => self.for_scheme(scheme),
            None => Ok(&self.default),
        }
    }
}

impl Default for FileSystemRegistry {
    fn default() -> Self {
        Self::new(Arc::new(LocalFileSystem::new()))
    }
}

/// Strip a `<scheme>://` prefix if it names `protocol`.
pub(crate) fn strip_protocol<'a>(path: &'a str, protocol: &str) -> &'a str {
    match path.split_once("://") {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case(protocol) => rest,
        _ => path,
    }
}
