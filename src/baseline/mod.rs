//! Persisted baseline of previously-surfaced suggestions.
//!
//! The baseline is one JSON file per workspace (`.reviewd/baseline.json`,
//! a single `suggestions` array). It is loaded once at run start, mutated
//! in memory, and flushed at most once at run end only if something
//! changed. A missing or corrupt file loads as an empty store — corruption
//! must never abort a run.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fingerprint::content_hash;
use crate::models::ReviewComment;

/// One previously-surfaced suggestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineEntry {
    pub fingerprint: String,
    /// File path the suggestion points at, relative to the workspace root.
    pub path: String,
    /// Content hash of the file at the time the suggestion was last
    /// surfaced or updated. Empty means unknown.
    pub content_hash: String,
    pub first_seen: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// On-disk document shape.
#[derive(Debug, Default, Serialize, Deserialize)]
struct BaselineDocument {
    #[serde(default)]
    suggestions: Vec<BaselineEntry>,
}

/// The full set of baseline entries for one workspace.
#[derive(Debug, Default)]
pub struct BaselineStore {
    entries: Vec<BaselineEntry>,
}

impl BaselineStore {
    /// Load the persisted baseline for a workspace.
    ///
    /// Returns an empty store (not an error) when no prior state exists
    /// or the file is malformed.
    pub fn load(workspace: &Path) -> Self {
        let path = Self::file_path(workspace);
        let entries = std::fs::read_to_string(&path)
            .ok()
            .and_then(|content| serde_json::from_str::<BaselineDocument>(&content).ok())
            .map(|doc| doc.suggestions)
            .unwrap_or_default();
        Self { entries }
    }

    /// The baseline file path for a workspace.
    pub fn file_path(workspace: &Path) -> PathBuf {
        workspace
            .join(crate::constants::STATE_DIR)
            .join(crate::constants::BASELINE_FILENAME)
    }

    /// The baseline file path relative to the workspace root, for commits.
    pub fn relative_path() -> String {
        format!(
            "{}/{}",
            crate::constants::STATE_DIR,
            crate::constants::BASELINE_FILENAME
        )
    }

    /// Whether a comment should be suppressed as already surfaced.
    ///
    /// True only when an entry with the same fingerprint exists, its stored
    /// hash equals the current content hash of the comment's file, and both
    /// hashes are non-empty. A suggestion against a file that has since
    /// changed is allowed to resurface.
    pub fn should_skip(&self, comment: &ReviewComment, workspace: &Path) -> bool {
        let fingerprint = comment.fingerprint();
        let Some(entry) = self.get(&fingerprint) else {
            return false;
        };

        let current = content_hash(&workspace.join(&comment.path));
        !entry.content_hash.is_empty() && !current.is_empty() && entry.content_hash == current
    }

    /// Record the comments posted this run.
    ///
    /// Creates a new entry for unseen fingerprints, or refreshes the stored
    /// content hash and updated-at timestamp when the hash has drifted.
    /// Returns whether any mutation occurred so the caller can avoid a
    /// no-op persist/commit.
    pub fn record(&mut self, posted: &[ReviewComment], workspace: &Path) -> bool {
        let now = Utc::now();
        let mut changed = false;

        for comment in posted {
            let fingerprint = comment.fingerprint();
            let current = content_hash(&workspace.join(&comment.path));

            match self.entries.iter_mut().find(|e| e.fingerprint == fingerprint) {
                Some(entry) => {
                    if entry.content_hash != current {
                        entry.content_hash = current;
                        entry.updated_at = now;
                        changed = true;
                    }
                }
                None => {
                    self.entries.push(BaselineEntry {
                        fingerprint,
                        path: comment.path.clone(),
                        content_hash: current,
                        first_seen: now,
                        updated_at: now,
                    });
                    changed = true;
                }
            }
        }

        changed
    }

    /// Serialize the store to the workspace's baseline file.
    ///
    /// Creates the state directory if absent. A plain overwrite is
    /// sufficient given the treat-corruption-as-empty load contract.
    pub fn flush(&self, workspace: &Path) -> std::io::Result<()> {
        let path = Self::file_path(workspace);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let document = BaselineDocument {
            suggestions: self.entries.clone(),
        };
        let content = serde_json::to_string_pretty(&document)
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        std::fs::write(&path, content)
    }

    /// Look up an entry by fingerprint.
    pub fn get(&self, fingerprint: &str) -> Option<&BaselineEntry> {
        self.entries.iter().find(|e| e.fingerprint == fingerprint)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
