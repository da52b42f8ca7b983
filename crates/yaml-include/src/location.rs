/*
 * location.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Source positions for diagnostics.
 */

use std::fmt;

/// Position of a YAML element in its source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Document name (usually the path it was read from)
    pub file: Option<String>,

    /// Byte offset from start of source (0-based)
    pub offset: usize,

    /// Line number (1-based)
    pub line: usize,

    /// Column number (1-based, in characters not bytes)
    pub col: usize,
}

impl Location {
    /// Create a Location from a yaml-rust2 marker.
    pub fn from_marker(marker: &yaml_rust2::scanner::Marker) -> Self {
        Self {
            file: None,
            offset: marker.index(),
            // yaml-rust2 counts lines from 1 and columns from 0
            line: marker.line().max(1),
            col: marker.col() + 1,
        }
    }

    /// Set the document name for this location.
    pub fn with_file(mut self, file: Option<impl Into<String>>) -> Self {
        self.file = file.map(Into::into);
        self
    }
}

impl Default for Location {
    fn default() -> Self {
        Self {
            file: None,
            offset: 0,
            line: 1,
            col: 1,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}:{}:{}", file, self.line, self.col),
            None => write!(f, "line {}, column {}", self.line, self.col),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let loc = Location {
            file: None,
            offset: 10,
            line: 2,
            col: 5,
        };
        assert_eq!(loc.to_string(), "line 2, column 5");
        assert_eq!(
            loc.with_file(Some("config.yaml")).to_string(),
            "config.yaml:2:5"
        );
    }

    #[test]
    fn test_default() {
        let loc = Location::default();
        assert_eq!(loc.file, None);
        assert_eq!(loc.offset, 0);
        assert_eq!(loc.line, 1);
        assert_eq!(loc.col, 1);
    }
}
