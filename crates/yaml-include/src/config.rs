/*
 * config.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * File-based resolver configuration.
 */

//! Resolver configuration files.
//!
//! ```toml
//! tag = "inc"
//! base_dir = "conf"
//! autoload = true
//! max_depth = 16
//! loader = "extension"
//! ```
//!
//! Every key is optional; missing keys keep the [`Resolver`] defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::content::{ExtensionLoader, YamlLoader};
use crate::resolver::{DEFAULT_MAX_DEPTH, DEFAULT_TAG, Resolver, ResolverBuilder};

/// How matched targets are parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoaderKind {
    /// Everything is YAML.
    #[default]
    Yaml,
    /// By extension: json, toml, txt, otherwise YAML.
    Extension,
}

/// Errors reading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IncludeConfig {
    pub tag: String,
    pub base_dir: Option<PathBuf>,
    pub autoload: bool,
    pub max_depth: usize,
    pub loader: LoaderKind,
}

impl Default for IncludeConfig {
    fn default() -> Self {
        Self {
            tag: DEFAULT_TAG.to_string(),
            base_dir: None,
            autoload: true,
            max_depth: DEFAULT_MAX_DEPTH,
            loader: LoaderKind::default(),
        }
    }
}

impl IncludeConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Read a configuration file.
    ///
    /// A relative `base_dir` in the file is taken relative to the file's
    /// own directory.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&content)?;
        if let Some(base_dir) = config.base_dir.take() {
            let base_dir = match path.parent() {
                Some(parent) if base_dir.is_relative() => parent.join(base_dir),
                _ => base_dir,
            };
            config.base_dir = Some(base_dir);
        }
        tracing::debug!(path = %path.display(), "loaded include configuration");
        Ok(config)
    }

    /// Builder preloaded with these settings, for further adjustment.
    pub fn builder(&self) -> ResolverBuilder {
        let mut builder = Resolver::builder()
            .tag(self.tag.as_str())
            .autoload(self.autoload)
            .max_depth(self.max_depth);
        if let Some(base_dir) = &self.base_dir {
            builder = builder.base_dir(base_dir.clone());
        }
        match self.loader {
            LoaderKind::Yaml => builder.loader(YamlLoader),
            LoaderKind::Extension => builder.loader(ExtensionLoader),
        }
    }

    pub fn build(&self) -> Resolver {
        self.builder().build()
    }
}
