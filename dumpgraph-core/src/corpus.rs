//! Dump corpus enumeration
//!
//! The corpus is the set of archived dump files under the configured root.
//! [`CorpusScanner::scan`] enumerates them once per pipeline run and hands
//! back an immutable [`CorpusHandle`] snapshot; every scanner search in that
//! run reuses the same handle, so all of them see an identical corpus even
//! while new dumps are being written. Nothing here parses file contents.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Glob for dump files relative to the corpus root.
const DUMP_PATTERN: &str = "**/*.jsonl";

/// Immutable snapshot of the dump files found under the root at scan time.
///
/// Never written to; owned exclusively by one pipeline run.
#[derive(Debug, Clone)]
pub struct CorpusHandle {
    /// Root the snapshot was taken from
    pub root: PathBuf,
    /// Dump files in deterministic (sorted) order
    pub files: Vec<PathBuf>,
    /// When the snapshot was taken
    pub scanned_at: DateTime<Utc>,
}

impl CorpusHandle {
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Enumerates dump files under a root directory.
pub struct CorpusScanner;

impl CorpusScanner {
    /// Take a snapshot of the corpus under `root`.
    ///
    /// Fails with [`Error::CorpusUnavailable`] if the root does not exist or
    /// is not a readable directory (it may have vanished since startup
    /// validation).
    pub fn scan(root: &Path) -> Result<CorpusHandle> {
        if !root.is_dir() {
            return Err(Error::CorpusUnavailable {
                root: root.to_path_buf(),
            });
        }

        let pattern = root.join(DUMP_PATTERN);
        let pattern = pattern.to_str().ok_or_else(|| Error::CorpusUnavailable {
            root: root.to_path_buf(),
        })?;

        let mut files = Vec::new();
        let entries = glob::glob(pattern).map_err(|e| {
            tracing::warn!(error = %e, pattern, "Bad corpus glob pattern");
            Error::CorpusUnavailable {
                root: root.to_path_buf(),
            }
        })?;

        for entry in entries {
            match entry {
                Ok(path) if path.is_file() => files.push(path),
                Ok(_) => {}
                Err(e) => {
                    // Unreadable entry: skip it rather than failing the
                    // whole snapshot, matching discovery behavior elsewhere.
                    tracing::warn!(error = %e, "Skipping unreadable corpus entry");
                }
            }
        }

        files.sort();

        tracing::debug!(
            root = %root.display(),
            count = files.len(),
            "Corpus snapshot taken"
        );

        Ok(CorpusHandle {
            root: root.to_path_buf(),
            files,
            scanned_at: Utc::now(),
        })
    }
}
