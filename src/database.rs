use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::entry::Entry;
use crate::error::Error;

/// Index over a compiled terminfo tree, typically `/usr/share/terminfo`.
///
/// Only leaf file names are indexed; the single-letter (or hex-digit)
/// bucket directories ncurses fans entries into are an on-disk detail.
/// Entries are parsed on demand by [`load`](Self::load), never cached.
#[derive(Debug, Clone)]
pub struct Database {
    root: PathBuf,
    index: HashMap<String, PathBuf>,
}

impl Database {
    /// Walk `root` recursively and index every file found under it.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, Error> {
        let root = root.as_ref().to_path_buf();
        let mut index = HashMap::new();
        walk(&root, &mut index)?;
        Ok(Self { root, index })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Names of every indexed entry, in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Read and decode the named entry.
    pub fn load(&self, name: &str) -> Result<Entry, Error> {
        let path = self
            .index
            .get(name)
            .ok_or_else(|| Error::NotFound(name.to_owned()))?;
        Entry::parse(&fs::read(path)?)
    }

    /// Load the terminal named by `$TERM`, or `fallback` when it is unset.
    pub fn load_default(&self, fallback: Option<&str>) -> Result<Entry, Error> {
        match env::var("TERM") {
            Ok(name) if !name.is_empty() => self.load(&name),
            _ => match fallback {
                Some(name) => self.load(name),
                None => Err(Error::Config("TERM is unset and no fallback was given")),
            },
        }
    }
}

fn walk(dir: &Path, index: &mut HashMap<String, PathBuf>) -> Result<(), Error> {
    for dir_entry in fs::read_dir(dir)? {
        let path = dir_entry?.path();
        if path.is_dir() {
            walk(&path, index)?;
        } else if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            index.insert(name.to_owned(), path.clone());
        }
    }
    Ok(())
}
