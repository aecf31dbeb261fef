//! In-memory file namespace: a mapping from absolute path strings to content
//! with creation/modification timestamps and splice-on-write semantics (§4.6).
//!
//! Grounded on the teacher's `vfs` module (mount points, `Filesystem`/`File`
//! traits, `FsError`), simplified to the source's single flat namespace: the
//! in-process simulation has no mount points or backing devices, just one
//! namespace of path -> content, so the trait-object `Filesystem` abstraction
//! is dropped in favour of a single `Vfs` owning a `HashMap` directly.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::clock::LogicalTime;

/// `{path, content, created_at, updated_at}` (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEntry {
    pub path: String,
    pub content: Vec<u8>,
    pub created_at: LogicalTime,
    pub updated_at: LogicalTime,
}

/// The in-memory file namespace.
#[derive(Default)]
pub struct Vfs {
    files: HashMap<String, FileEntry>,
}

/// Normalize a path the way the source implicitly roots non-absolute paths.
pub fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

impl Vfs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exists(&self, path: &str) -> bool {
        self.files.contains_key(&normalize_path(path))
    }

    pub fn get(&self, path: &str) -> Option<&FileEntry> {
        self.files.get(&normalize_path(path))
    }

    pub fn len_of(&self, path: &str) -> Option<usize> {
        self.get(path).map(|f| f.content.len())
    }

    /// Create an empty file if one does not already exist (`w` truncates an
    /// existing file to empty too). Returns the file's content length after
    /// the operation (0 for a fresh or truncated file).
    pub fn create_or_truncate(&mut self, path: &str, now: LogicalTime) {
        let path = normalize_path(path);
        match self.files.get_mut(&path) {
            Some(entry) => {
                entry.content.clear();
                entry.updated_at = now;
            }
            None => {
                self.files.insert(
                    path.clone(),
                    FileEntry {
                        path,
                        content: Vec::new(),
                        created_at: now,
                        updated_at: now,
                    },
                );
            }
        }
    }

    /// Create the file if missing, leaving existing content untouched (`a`).
    pub fn create_if_missing(&mut self, path: &str, now: LogicalTime) {
        let path = normalize_path(path);
        self.files.entry(path.clone()).or_insert_with(|| FileEntry {
            path,
            content: Vec::new(),
            created_at: now,
            updated_at: now,
        });
    }

    /// Splice `data` into the file's content at `position`, overwriting any
    /// overlapping range and extending the content if `position + data.len()`
    /// exceeds the current length (§4.6 write-on-overlap semantics). Returns
    /// the number of bytes written, or `None` if the path has no file entry.
    pub fn write_at(
        &mut self,
        path: &str,
        position: usize,
        data: &[u8],
        now: LogicalTime,
    ) -> Option<usize> {
        let entry = self.files.get_mut(&normalize_path(path))?;
        let end = position + data.len();
        if entry.content.len() < end {
            entry.content.resize(end, 0);
        }
        entry.content[position..end].copy_from_slice(data);
        entry.updated_at = now;
        Some(data.len())
    }

    /// Read up to `n` bytes (or to end, if `n` is `None`) starting at
    /// `position`. Returns `None` only if the path has no file entry.
    pub fn read_at(&self, path: &str, position: usize, n: Option<usize>) -> Option<Vec<u8>> {
        let entry = self.files.get(&normalize_path(path))?;
        if position >= entry.content.len() {
            return Some(Vec::new());
        }
        let end = match n {
            Some(n) => (position + n).min(entry.content.len()),
            None => entry.content.len(),
        };
        Some(entry.content[position..end].to_vec())
    }

    /// Directly overwrite a whole file's content (the `write_file` convenience
    /// syscall), creating it if missing.
    pub fn write_whole(&mut self, path: &str, content: Vec<u8>, now: LogicalTime) {
        let path = normalize_path(path);
        match self.files.get_mut(&path) {
            Some(entry) => {
                entry.content = content;
                entry.updated_at = now;
            }
            None => {
                self.files.insert(
                    path.clone(),
                    FileEntry {
                        path,
                        content,
                        created_at: now,
                        updated_at: now,
                    },
                );
            }
        }
    }

    pub fn unlink(&mut self, path: &str) -> bool {
        self.files.remove(&normalize_path(path)).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileEntry> {
        self.files.values()
    }

    pub(crate) fn from_entries(entries: HashMap<String, FileEntry>) -> Self {
        Self { files: entries }
    }

    pub(crate) fn entries(&self) -> &HashMap<String, FileEntry> {
        &self.files
    }
}
