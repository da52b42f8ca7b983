/*
 * fs/local.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * LocalFileSystem: includes served from the host filesystem.
 */

use std::fs::File;
use std::io::{self, BufReader};

use super::options::{GlobSettings, check_open_options};
use super::{BackendError, BackendResult, FileSystem, Stream, strip_protocol};
use crate::params::OptionArgs;

/// Backend over the host filesystem.
///
/// Relative paths are resolved against the process working directory; the
/// resolver joins them to its base directory beforehand when one is set.
/// Listing returns regular files only, in the order the `glob` crate walks
/// them (alphabetical within each directory).
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for LocalFileSystem {
    fn protocol(&self) -> &'static str {
        "file"
    }

    fn glob(&self, pattern: &str, options: &OptionArgs) -> BackendResult<Vec<String>> {
        let settings = GlobSettings::from_args(options)?;
        let pattern = strip_protocol(pattern, self.protocol());

        let mut matches = Vec::new();
        for entry in glob::glob_with(pattern, settings.match_options)? {
            let path = entry.map_err(|e| BackendError::Io(e.into()))?;
            if !path.is_file() {
                continue;
            }
            let path = path.to_string_lossy().into_owned();
            if settings.accepts(pattern, &path) {
                matches.push(path);
            }
        }
        Ok(matches)
    }

    fn open(&self, path: &str, options: &OptionArgs) -> BackendResult<Stream> {
        check_open_options(options)?;
        let path = strip_protocol(path, self.protocol());
        let file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => BackendError::NotFound(path.to_string()),
            _ => BackendError::Io(e),
        })?;
        Ok(Box::new(BufReader::new(file)))
    }
}
