/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Error types for include resolution.
 */

use std::io;

use thiserror::Error;

use crate::fs::BackendError;
use crate::location::Location;

/// Result type alias for yaml-include operations.
pub type Result<T> = std::result::Result<T, IncludeError>;

/// Errors raised while parsing documents or resolving include directives.
///
/// Every variant is fatal for the document being loaded; nothing is
/// recovered inside the crate.
#[derive(Debug, Error)]
pub enum IncludeError {
    /// The directive payload has a shape the parameter parser cannot read.
    #[error("malformed include directive: {message}")]
    MalformedDirective { message: String },

    /// Options were supplied but no path expression.
    #[error("include directive has no path expression")]
    MissingPathExpression,

    /// An option value the core itself interprets is invalid.
    #[error("invalid include option `{name}`: {message}")]
    InvalidOption { name: String, message: String },

    /// Listing or opening a target failed in the backend.
    #[error("cannot access `{path}`: {source}")]
    BackendAccess {
        path: String,
        #[source]
        source: BackendError,
    },

    /// `flatten` was requested but a matched document is not a sequence.
    #[error("cannot flatten `{path}`: expected a sequence at the top level, found {found}")]
    FlattenTypeMismatch { path: String, found: &'static str },

    /// The include chain grew past the configured limit.
    #[error("maximum include depth of {limit} exceeded: {}", .chain.join(" -> "))]
    MaxIncludeDepthExceeded { limit: usize, chain: Vec<String> },

    /// YAML syntax error reported by the scanner.
    #[error("YAML syntax error at {location}: {message}")]
    Syntax { message: String, location: Location },

    /// A byte stream could not be read as UTF-8 text.
    #[error("failed to read `{path}`: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    /// A content loader rejected the document it was given.
    #[error("failed to parse `{path}`: {message}")]
    Content { path: String, message: String },
}

impl IncludeError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        IncludeError::MalformedDirective {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_option(name: impl Into<String>, message: impl Into<String>) -> Self {
        IncludeError::InvalidOption {
            name: name.into(),
            message: message.into(),
        }
    }

    pub(crate) fn backend(path: impl Into<String>, source: BackendError) -> Self {
        IncludeError::BackendAccess {
            path: path.into(),
            source,
        }
    }
}
