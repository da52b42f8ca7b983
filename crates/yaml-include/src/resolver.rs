/*
 * resolver.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * The include resolver: configuration, mode flag, and target loading.
 */

//! Include resolution.
//!
//! A [`Resolver`] is built once with its backends, base directory, content
//! loader and tag, and then passed explicitly to every parse. Nothing is
//! registered globally.
//!
//! ```rust
//! use yaml_include::{MemoryFileSystem, Resolver, Value};
//! use std::sync::Arc;
//!
//! let fs = MemoryFileSystem::with_files([("/conf/a.yml", "name: a")]);
//! let resolver = Resolver::builder()
//!     .default_fs(Arc::new(fs))
//!     .base_dir("/conf")
//!     .build();
//!
//! let doc = resolver.parse_str("a: !include a.yml").unwrap();
//! assert_eq!(doc.get("a").and_then(|a| a.get("name")), Some(&Value::from("a")));
//! ```

use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::content::{ContentLoader, YamlLoader};
use crate::emitter::Emitter;
use crate::error::{IncludeError, Result};
use crate::fs::{FileSystem, FileSystemRegistry};
use crate::merge::{Loaded, merge};
use crate::params::IncludeParams;
use crate::parser::DocumentParser;
use crate::target::{self, Strategy};
use crate::value::Value;

/// Tag recognized when none is configured (`!include`).
pub const DEFAULT_TAG: &str = "include";

/// Default limit on nested includes.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Directory relative include paths are joined to.
#[derive(Clone)]
pub enum BaseDir {
    Fixed(PathBuf),
    /// Evaluated each time a directive is resolved.
    Dynamic(Arc<dyn Fn() -> PathBuf + Send + Sync>),
}

impl BaseDir {
    pub fn path(&self) -> PathBuf {
        match self {
            BaseDir::Fixed(path) => path.clone(),
            BaseDir::Dynamic(f) => f(),
        }
    }
}

impl fmt::Debug for BaseDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaseDir::Fixed(path) => f.debug_tuple("Fixed").field(path).finish(),
            BaseDir::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// Resolves include directives while documents are parsed.
///
/// The `autoload` flag is the only state that changes after construction.
/// Toggle it through [`Resolver::autoload_guard`] or
/// [`Resolver::with_autoload`] so the previous value comes back even on
/// error or panic. One writer at a time: toggling it from several threads
/// at once is not supported.
pub struct Resolver {
    registry: FileSystemRegistry,
    base_dir: Option<BaseDir>,
    autoload: AtomicBool,
    loader: Arc<dyn ContentLoader>,
    tag: String,
    max_depth: usize,
}

impl Resolver {
    /// Resolver with default settings: local files, eager, `!include`.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> ResolverBuilder {
        ResolverBuilder::default()
    }

    /// Tag suffix handled by this resolver, without the leading `!`.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn registry(&self) -> &FileSystemRegistry {
        &self.registry
    }

    /// Current base directory, evaluating it if it is dynamic.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.base_dir.as_ref().map(BaseDir::path)
    }

    /// Whether directives met from now on are resolved immediately.
    pub fn autoload(&self) -> bool {
        self.autoload.load(Ordering::SeqCst)
    }

    /// Set the mode and return the previous one.
    pub fn set_autoload(&self, autoload: bool) -> bool {
        self.autoload.swap(autoload, Ordering::SeqCst)
    }

    /// Set the mode until the returned guard is dropped.
    pub fn autoload_guard(&self, autoload: bool) -> AutoloadGuard<'_> {
        let previous = self.set_autoload(autoload);
        AutoloadGuard {
            resolver: self,
            previous,
        }
    }

    /// Run `f` with the mode set to `autoload`, restoring it afterwards.
    pub fn with_autoload<T>(&self, autoload: bool, f: impl FnOnce(&Self) -> T) -> T {
        let _guard = self.autoload_guard(autoload);
        f(self)
    }

    /// How the targets of `params` would be reached right now.
    pub fn plan(&self, params: &IncludeParams) -> Result<Strategy> {
        let base_dir = self.base_dir();
        target::plan(params, base_dir.as_deref())
    }

    /// Resolve a single directive.
    ///
    /// With autoload off, nested directives in the loaded documents are
    /// left as placeholders; see [`crate::resolve`] to expand those too.
    pub fn load(&self, params: &IncludeParams) -> Result<Value> {
        self.load_with(params, &[])
    }

    /// Resolve `params` as reached through the include `chain`.
    pub(crate) fn load_with(&self, params: &IncludeParams, chain: &[String]) -> Result<Value> {
        let chain = self.descend(chain, params.path())?;
        let strategy = self.plan(params)?;
        tracing::debug!(
            path = params.path(),
            strategy = strategy.kind(),
            depth = chain.len(),
            "resolving include"
        );

        let loaded = match strategy {
            Strategy::OpenMany {
                scheme,
                urlpath,
                options,
            } => {
                let fs = self
                    .registry
                    .for_scheme(&scheme)
                    .map_err(|e| IncludeError::backend(&urlpath, e))?;
                let streams = fs
                    .open_many(&urlpath, &options)
                    .map_err(|e| IncludeError::backend(&urlpath, e))?;
                let mut loaded = Vec::with_capacity(streams.len());
                for (path, mut stream) in streams {
                    loaded.push(self.read_target(&path, stream.as_mut(), &chain)?);
                }
                loaded
            }
            Strategy::GlobThenOpen {
                scheme,
                pattern,
                glob_options,
                open_options,
            } => {
                let fs = self
                    .registry
                    .select(scheme.as_deref())
                    .map_err(|e| IncludeError::backend(&pattern, e))?;
                let paths = fs
                    .glob(&pattern, &glob_options)
                    .map_err(|e| IncludeError::backend(&pattern, e))?;
                tracing::debug!(pattern = %pattern, matches = paths.len(), "listed include targets");

                let mut loaded = Vec::with_capacity(paths.len());
                for path in paths {
                    let mut stream = fs
                        .open(&path, &open_options)
                        .map_err(|e| IncludeError::backend(&path, e))?;
                    loaded.push(self.read_target(&path, stream.as_mut(), &chain)?);
                }
                loaded
            }
            Strategy::Open { path, options } => {
                let mut stream = self
                    .registry
                    .default_backend()
                    .open(&path, &options)
                    .map_err(|e| IncludeError::backend(&path, e))?;
                vec![self.read_target(&path, stream.as_mut(), &chain)?]
            }
        };

        merge(loaded, params.flatten())
    }

    /// Extend the include chain by `path`, enforcing the depth limit.
    pub(crate) fn descend(&self, chain: &[String], path: &str) -> Result<Vec<String>> {
        let mut next = chain.to_vec();
        next.push(path.to_string());
        if next.len() > self.max_depth {
            return Err(IncludeError::MaxIncludeDepthExceeded {
                limit: self.max_depth,
                chain: next,
            });
        }
        Ok(next)
    }

    fn read_target(&self, path: &str, stream: &mut dyn Read, chain: &[String]) -> Result<Loaded> {
        tracing::trace!(path, "loading include target");
        let parser = DocumentParser::with_chain(self, chain.to_vec()).with_name(path);
        let value = self.loader.load(path, stream, &parser)?;
        Ok(Loaded::new(path, value))
    }

    /// Parse a document, handling directives according to the current mode.
    pub fn parse_str(&self, text: &str) -> Result<Value> {
        DocumentParser::new(self).parse_str(text)
    }

    pub fn parse_reader(&self, reader: &mut dyn Read) -> Result<Value> {
        DocumentParser::new(self).parse_reader(reader)
    }

    /// Parse a document from the host filesystem, naming it after `path`.
    pub fn parse_path(&self, path: impl AsRef<Path>) -> Result<Value> {
        let path = path.as_ref();
        let name = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|source| IncludeError::Read {
            path: name.clone(),
            source,
        })?;
        DocumentParser::new(self).with_name(name).parse_str(&text)
    }

    /// Serialize `value` as YAML, writing placeholders with this resolver's tag.
    pub fn dump(&self, value: &Value) -> String {
        Emitter::new(&self.tag).to_string(value)
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("registry", &self.registry)
            .field("base_dir", &self.base_dir)
            .field("autoload", &self.autoload())
            .field("tag", &self.tag)
            .field("max_depth", &self.max_depth)
            .finish_non_exhaustive()
    }
}

/// Restores the resolver's previous autoload mode when dropped.
#[must_use = "the previous mode is restored as soon as the guard is dropped"]
pub struct AutoloadGuard<'a> {
    resolver: &'a Resolver,
    previous: bool,
}

impl Drop for AutoloadGuard<'_> {
    fn drop(&mut self) {
        self.resolver.set_autoload(self.previous);
    }
}

/// Builder for [`Resolver`].
pub struct ResolverBuilder {
    registry: FileSystemRegistry,
    base_dir: Option<BaseDir>,
    autoload: bool,
    loader: Arc<dyn ContentLoader>,
    tag: String,
    max_depth: usize,
}

impl Default for ResolverBuilder {
    fn default() -> Self {
        Self {
            registry: FileSystemRegistry::default(),
            base_dir: None,
            autoload: true,
            loader: Arc::new(YamlLoader),
            tag: DEFAULT_TAG.to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ResolverBuilder {
    /// Backend for plain paths and patterns (local files by default).
    pub fn default_fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.registry.set_default(fs);
        self
    }

    /// Backend for `<scheme>://` expressions.
    pub fn register(mut self, scheme: impl Into<String>, fs: Arc<dyn FileSystem>) -> Self {
        self.registry.register(scheme, fs);
        self
    }

    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(BaseDir::Fixed(dir.into()));
        self
    }

    /// Base directory computed at each resolution.
    pub fn base_dir_fn<F>(mut self, f: F) -> Self
    where
        F: Fn() -> PathBuf + Send + Sync + 'static,
    {
        self.base_dir = Some(BaseDir::Dynamic(Arc::new(f)));
        self
    }

    pub fn autoload(mut self, autoload: bool) -> Self {
        self.autoload = autoload;
        self
    }

    pub fn loader(mut self, loader: impl ContentLoader + 'static) -> Self {
        self.loader = Arc::new(loader);
        self
    }

    /// Use a closure as the content loader.
    pub fn loader_fn<F>(self, f: F) -> Self
    where
        F: Fn(&str, &mut dyn Read, &DocumentParser<'_>) -> Result<Value> + Send + Sync + 'static,
    {
        self.loader(f)
    }

    /// Tag to recognize; a leading `!` is ignored.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        self.tag = tag.trim_start_matches('!').to_string();
        self
    }

    /// Longest allowed chain of nested includes.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn build(self) -> Resolver {
        Resolver {
            registry: self.registry,
            base_dir: self.base_dir,
            autoload: AtomicBool::new(self.autoload),
            loader: self.loader,
            tag: self.tag,
            max_depth: self.max_depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;
    use std::sync::Mutex;

    fn memory(files: &[(&str, &str)]) -> Arc<MemoryFileSystem> {
        Arc::new(MemoryFileSystem::with_files(files.iter().copied()))
    }

    #[test]
    fn test_builder_defaults() {
        let resolver = Resolver::new();
        assert_eq!(resolver.tag(), DEFAULT_TAG);
        assert_eq!(resolver.max_depth(), DEFAULT_MAX_DEPTH);
        assert!(resolver.autoload());
        assert_eq!(resolver.base_dir(), None);
        assert_eq!(resolver.registry().default_backend().protocol(), "file");
    }

    #[test]
    fn test_tag_strips_bang() {
        let resolver = Resolver::builder().tag("!inc").build();
        assert_eq!(resolver.tag(), "inc");
    }

    #[test]
    fn test_autoload_guard_restores_mode() {
        let resolver = Resolver::new();
        {
            let _guard = resolver.autoload_guard(false);
            assert!(!resolver.autoload());
            {
                let _inner = resolver.autoload_guard(true);
                assert!(resolver.autoload());
            }
            assert!(!resolver.autoload());
        }
        assert!(resolver.autoload());
    }

    #[test]
    fn test_with_autoload_restores_after_error() {
        let resolver = Resolver::new();
        let result = resolver.with_autoload(false, |r| r.parse_str("a: !include {mode: r}"));
        assert!(result.is_err());
        assert!(resolver.autoload());
    }

    #[test]
    fn test_with_autoload_restores_after_panic() {
        let resolver = Resolver::builder().autoload(false).build();
        let outcome: std::thread::Result<()> = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            resolver.with_autoload(true, |_| panic!("boom"))
        }));
        assert!(outcome.is_err());
        assert!(!resolver.autoload());
    }

    #[test]
    fn test_dynamic_base_dir_is_evaluated_per_resolution() {
        let current = Arc::new(Mutex::new(PathBuf::from("/one")));
        let shared = Arc::clone(&current);
        let resolver = Resolver::builder()
            .default_fs(memory(&[("/one/a.yml", "1"), ("/two/a.yml", "2")]))
            .base_dir_fn(move || shared.lock().unwrap().clone())
            .build();

        let params = IncludeParams::new("a.yml").unwrap();
        assert_eq!(resolver.load(&params).unwrap(), Value::Integer(1));
        *current.lock().unwrap() = PathBuf::from("/two");
        assert_eq!(resolver.load(&params).unwrap(), Value::Integer(2));
    }

    #[test]
    fn test_plan_uses_base_dir() {
        let resolver = Resolver::builder().base_dir("/data").build();
        let strategy = resolver.plan(&IncludeParams::new("x.yml").unwrap()).unwrap();
        assert!(matches!(strategy, Strategy::Open { path, .. } if path == "/data/x.yml"));
    }

    #[test]
    fn test_descend_enforces_limit() {
        let resolver = Resolver::builder().max_depth(2).build();
        let chain = resolver.descend(&[], "a.yml").unwrap();
        let chain = resolver.descend(&chain, "b.yml").unwrap();
        let err = resolver.descend(&chain, "a.yml").unwrap_err();
        match err {
            IncludeError::MaxIncludeDepthExceeded { limit, chain } => {
                assert_eq!(limit, 2);
                assert_eq!(chain, vec!["a.yml", "b.yml", "a.yml"]);
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_self_include_hits_depth_limit() {
        let resolver = Resolver::builder()
            .default_fs(memory(&[("/loop.yml", "again: !include /loop.yml")]))
            .max_depth(5)
            .build();
        let err = resolver.parse_str("root: !include /loop.yml").unwrap_err();
        assert!(matches!(
            err,
            IncludeError::MaxIncludeDepthExceeded { limit: 5, ref chain } if chain.len() == 6
        ));
    }

    #[test]
    fn test_unknown_scheme_is_backend_error() {
        let resolver = Resolver::new();
        let err = resolver.parse_str("a: !include s3://bucket/a.yml").unwrap_err();
        assert!(matches!(
            err,
            IncludeError::BackendAccess { ref path, .. } if path == "s3://bucket/a.yml"
        ));
    }

    #[test]
    fn test_dump_uses_configured_tag() {
        let resolver = Resolver::builder().tag("inc").autoload(false).build();
        let value = resolver.parse_str("a: !inc x.yml\n").unwrap();
        assert_eq!(resolver.dump(&value), "a: !inc x.yml\n");
    }
}
