//! Concurrent set of changed files awaiting one combined broadcast.
//!
//! Every insert stamps the file with a fresh version. Removing a snapshot only
//! drops entries whose version is unchanged, so a file that changes again
//! while its snapshot is being announced stays dirty.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct DirtySet {
    files: DashMap<String, u64>,
    next_version: AtomicU64,
}

/// Files and versions captured by [`DirtySet::snapshot`], sorted by path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirtySnapshot {
    entries: Vec<(String, u64)>,
}

impl DirtySnapshot {
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(path, _)| path.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl DirtySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `file` dirty. Returns `false` when it already was; its version is
    /// bumped either way.
    pub fn insert(&self, file: impl Into<String>) -> bool {
        let version = self.next_version.fetch_add(1, Ordering::SeqCst);
        self.files.insert(file.into(), version).is_none()
    }

    pub fn snapshot(&self) -> DirtySnapshot {
        let mut entries: Vec<(String, u64)> = self
            .files
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        entries.sort();
        DirtySnapshot { entries }
    }

    /// Remove the snapshot's files unless they were marked dirty again since.
    pub fn remove_all(&self, snapshot: &DirtySnapshot) {
        for (file, version) in &snapshot.entries {
            self.files.remove_if(file, |_, current| current == version);
        }
    }

    /// Sorted dirty paths.
    pub fn files(&self) -> Vec<String> {
        self.snapshot().paths().map(str::to_string).collect()
    }

    pub fn contains(&self, file: &str) -> bool {
        self.files.contains_key(file)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
