use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::types::{CacheEntry, SessionSummary};

/// Path-keyed map of per-file fingerprints and their extracted summaries.
///
/// A path is the unit of staleness tracking: distinct files that happen to
/// carry colliding identities are tracked as separate entries here, and the
/// index's id-to-path table keeps only the most recently observed path.
#[derive(Debug, Default)]
pub struct StalenessCache {
    entries: HashMap<PathBuf, CacheEntry>,
}

impl StalenessCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A hit requires an exact match of both size and mtime against the
    /// entry recorded for this path; any mismatch is a miss.
    pub fn lookup(&self, path: &Path, size_bytes: u64, mtime_ms: i64) -> Option<&SessionSummary> {
        let entry = self.entries.get(path)?;
        if entry.size_bytes == size_bytes && entry.mtime_ms == mtime_ms {
            Some(&entry.summary)
        } else {
            None
        }
    }

    /// Insert or replace the entry for a path.
    pub fn store(&mut self, entry: CacheEntry) {
        self.entries.insert(entry.path.clone(), entry);
    }

    /// Replace the stored summary for a path without changing its
    /// fingerprint. Used when a full load attaches exact messages.
    pub fn update_summary(&mut self, path: &Path, summary: SessionSummary) {
        if let Some(entry) = self.entries.get_mut(path) {
            entry.summary = summary;
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &CacheEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Load the persisted snapshot. A missing or corrupt snapshot is an
    /// empty cache, logged, never fatal.
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(_) => return Self::new(),
        };

        match serde_json::from_str::<Vec<CacheEntry>>(&content) {
            Ok(entries) => {
                let entries = entries
                    .into_iter()
                    .map(|entry| (entry.path.clone(), entry))
                    .collect::<HashMap<_, _>>();
                tracing::debug!(entries = entries.len(), "loaded cache snapshot");
                Self { entries }
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "cache snapshot corrupt, starting empty");
                Self::new()
            }
        }
    }

    /// Write the whole cache, overwriting the previous snapshot.
    pub fn persist(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create cache directory {}", parent.display()))?;
        }

        let mut entries: Vec<&CacheEntry> = self.entries.values().collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));

        let content = serde_json::to_string(&entries).context("failed to serialize cache")?;
        std::fs::write(path, content)
            .with_context(|| format!("failed to write cache snapshot {}", path.display()))
    }
}
