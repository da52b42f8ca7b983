/*
 * content.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Content loaders: turning an opened target into a document value.
 */

use std::io::Read;
use std::path::Path;

use crate::error::{IncludeError, Result};
use crate::parser::DocumentParser;
use crate::value::Value;

/// Parses the bytes of one matched target.
///
/// `path` is the target as the backend named it, `parser` is already set
/// up for the nested document (its include chain and name), so YAML content
/// can be handed to [`DocumentParser::parse_str`] to keep directive
/// handling and depth tracking intact.
pub trait ContentLoader: Send + Sync {
    fn load(&self, path: &str, stream: &mut dyn Read, parser: &DocumentParser<'_>) -> Result<Value>;
}

impl<F> ContentLoader for F
where
    F: Fn(&str, &mut dyn Read, &DocumentParser<'_>) -> Result<Value> + Send + Sync,
{
    fn load(&self, path: &str, stream: &mut dyn Read, parser: &DocumentParser<'_>) -> Result<Value> {
        self(path, stream, parser)
    }
}

/// Parses every target as YAML.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlLoader;

impl ContentLoader for YamlLoader {
    fn load(&self, path: &str, stream: &mut dyn Read, parser: &DocumentParser<'_>) -> Result<Value> {
        let text = read_text(path, stream)?;
        parser.parse_str(&text)
    }
}

/// Picks the format from the target's extension.
///
/// `.json` and `.toml` are read with their own parsers, `.txt` becomes a
/// plain string, everything else is YAML.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtensionLoader;

impl ContentLoader for ExtensionLoader {
    fn load(&self, path: &str, stream: &mut dyn Read, parser: &DocumentParser<'_>) -> Result<Value> {
        let extension = Path::new(path)
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase());

        match extension.as_deref() {
            Some("json") => {
                let json: serde_json::Value =
                    serde_json::from_reader(stream).map_err(|e| IncludeError::Content {
                        path: path.to_string(),
                        message: e.to_string(),
                    })?;
                Ok(Value::from(json))
            }
            Some("toml") => {
                let text = read_text(path, stream)?;
                let table: toml::Value = toml::from_str(&text).map_err(|e| IncludeError::Content {
                    path: path.to_string(),
                    message: e.to_string(),
                })?;
                Ok(Value::from(table))
            }
            Some("txt") => Ok(Value::String(read_text(path, stream)?)),
            _ => YamlLoader.load(path, stream, parser),
        }
    }
}

pub(crate) fn read_text(path: &str, stream: &mut dyn Read) -> Result<String> {
    let mut text = String::new();
    stream
        .read_to_string(&mut text)
        .map_err(|source| IncludeError::Read {
            path: path.to_string(),
            source,
        })?;
    Ok(text)
}
