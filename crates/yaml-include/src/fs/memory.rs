/*
 * fs/memory.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * MemoryFileSystem: an in-process document store.
 */

use std::collections::BTreeMap;
use std::io::Cursor;
use std::sync::{PoisonError, RwLock};

use super::options::{GlobSettings, check_open_options};
use super::{BackendError, BackendResult, FileSystem, Stream, strip_protocol};
use crate::params::OptionArgs;

/// Backend keeping documents in memory, keyed by absolute `/`-separated path.
///
/// Paths may be written with or without the `memory://` prefix; relative
/// paths are taken from the root. Listing walks keys in sorted order.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_files<I, P, C>(files: I) -> Self
    where
        I: IntoIterator<Item = (P, C)>,
        P: AsRef<str>,
        C: Into<Vec<u8>>,
    {
        let fs = Self::new();
        for (path, contents) in files {
            fs.insert(path, contents);
        }
        fs
    }

    /// Store `contents` at `path`, replacing any previous document.
    pub fn insert(&self, path: impl AsRef<str>, contents: impl Into<Vec<u8>>) {
        let key = self.normalize(path.as_ref());
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, contents.into());
    }

    pub fn remove(&self, path: impl AsRef<str>) -> bool {
        let key = self.normalize(path.as_ref());
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key)
            .is_some()
    }

    pub fn contains(&self, path: impl AsRef<str>) -> bool {
        let key = self.normalize(path.as_ref());
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&key)
    }

    /// Canonical key for `path`: scheme stripped, `.`/`..` folded, rooted.
    ///
    /// Any `<scheme>://` prefix is dropped, so the store can be registered
    /// under a scheme other than `memory`.
    pub fn normalize(&self, path: &str) -> String {
        let path = match path.split_once("://") {
            Some((_, rest)) => rest,
            None => strip_protocol(path, self.protocol()),
        };
        let mut parts: Vec<&str> = Vec::new();
        for part in path.split('/') {
            match part {
                "" | "." => {}
                ".." => {
                    parts.pop();
                }
                part => parts.push(part),
            }
        }
        format!("/{}", parts.join("/"))
    }
}

impl FileSystem for MemoryFileSystem {
    fn protocol(&self) -> &'static str {
        "memory"
    }

    fn glob(&self, pattern: &str, options: &OptionArgs) -> BackendResult<Vec<String>> {
        let settings = GlobSettings::from_args(options)?;
        let pattern = self.normalize(pattern);
        let compiled = glob::Pattern::new(&pattern)?;

        let files = self.files.read().unwrap_or_else(PoisonError::into_inner);
        Ok(files
            .keys()
            .filter(|path| compiled.matches_with(path, settings.match_options))
            .filter(|path| settings.accepts(&pattern, path))
            .cloned()
            .collect())
    }

    fn open(&self, path: &str, options: &OptionArgs) -> BackendResult<Stream> {
        check_open_options(options)?;
        let key = self.normalize(path);
        let files = self.files.read().unwrap_or_else(PoisonError::into_inner);
        match files.get(&key) {
            Some(contents) => Ok(Box::new(Cursor::new(contents.clone()))),
            None => Err(BackendError::NotFound(key)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn read_all(mut stream: Stream) -> String {
        let mut text = String::new();
        stream.read_to_string(&mut text).unwrap();
        text
    }

    #[test]
    fn test_normalize() {
        let fs = MemoryFileSystem::new();
        assert_eq!(fs.normalize("memory://data/a.yml"), "/data/a.yml");
        assert_eq!(fs.normalize("/data/./x/../a.yml"), "/data/a.yml");
        assert_eq!(fs.normalize("a.yml"), "/a.yml");
    }

    #[test]
    fn test_open_and_remove() {
        let fs = MemoryFileSystem::with_files([("/a.yml", "name: a")]);
        assert_eq!(
            read_all(fs.open("memory://a.yml", &OptionArgs::default()).unwrap()),
            "name: a"
        );
        assert!(fs.remove("a.yml"));
        assert!(!fs.contains("/a.yml"));
        assert!(matches!(
            fs.open("/a.yml", &OptionArgs::default()),
            Err(BackendError::NotFound(path)) if path == "/a.yml"
        ));
    }

    #[test]
    fn test_glob_sorted_and_scoped() {
        let fs = MemoryFileSystem::with_files([
            ("/d/2.yml", ""),
            ("/d/1.yml", ""),
            ("/d/sub/3.yml", ""),
            ("/other/4.yml", ""),
        ]);
        let top = fs.glob("/d/*.yml", &OptionArgs::default()).unwrap();
        assert_eq!(top, vec!["/d/1.yml", "/d/2.yml"]);

        let recursive = fs.glob("memory://d/**/*.yml", &OptionArgs::default()).unwrap();
        assert_eq!(recursive, vec!["/d/1.yml", "/d/2.yml", "/d/sub/3.yml"]);

        let none = fs.glob("/nothing/*.yml", &OptionArgs::default()).unwrap();
        assert!(none.is_empty());
    }
}
