//! Content-identity duplicate detection
//!
//! Checks candidate files against the whole catalog: an exact size+name
//! hit is a duplicate outright; otherwise the original-size bucket is
//! walked comparing content hashes in index order. A confirmed duplicate
//! ends with exactly one of the two files relocated into the holding
//! directory; which one survives is caller policy.

use crate::config::{Config, RunOptions};
use crate::entry::Entry;
use crate::probe::ContentHasher;
use crate::store::EntryStore;
use crate::Result;
use crate::{fsops, index, resolver, scan};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Which copy stays canonical when a duplicate is confirmed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepPolicy {
    /// The catalog's copy stays; the candidate moves to the holding dir
    KeepOriginal,
    /// The candidate stays; the catalog's copy moves to the holding dir
    KeepIncoming,
}

/// One confirmed duplicate and what was done about it
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateHit {
    /// Store position of the matching record
    pub position: usize,
    /// The catalog copy's path at detection time
    pub catalog_file: PathBuf,
    /// The candidate file's path at detection time
    pub candidate_file: PathBuf,
    /// The file that was moved to the holding directory
    pub relocated: PathBuf,
}

/// Duplicate scan over one catalog
pub struct DuplicateDetector<'a> {
    hasher: &'a dyn ContentHasher,
    opts: RunOptions,
}

impl<'a> DuplicateDetector<'a> {
    pub fn new(hasher: &'a dyn ContentHasher, opts: RunOptions) -> Self {
        Self { hasher, opts }
    }

    /// Check every media file in `target_dir` against the catalog and
    /// relocate confirmed duplicates per `policy`.
    pub fn scan_directory(
        &self,
        store: &EntryStore,
        target_dir: &Path,
        config: &Config,
        policy: KeepPolicy,
    ) -> Result<Vec<DuplicateHit>> {
        let candidates = scan::media_entries(target_dir, config)?;
        let size_index = index::by_current_size(store.entries());
        let original_index = index::by_original_size(store.entries());
        let trash_dir = target_dir.join(&config.library.trash_dir);
        let mut hits = Vec::new();

        for candidate in &candidates {
            let matched = match resolver::find_exact(
                store,
                &size_index,
                candidate.current_size,
                &candidate.name,
            ) {
                Some(position) => Some(position),
                None => self.content_match(
                    store,
                    &original_index,
                    candidate.original_size,
                    candidate,
                )?,
            };
            let Some(position) = matched else {
                debug!("{}: no duplicate", candidate.name);
                continue;
            };

            let catalog_file = store.entries()[position].file_path();
            let candidate_file = candidate.file_path();
            if catalog_file == candidate_file {
                // The canonical file itself, scanned in place.
                continue;
            }

            let displaced = match policy {
                KeepPolicy::KeepOriginal => &candidate_file,
                KeepPolicy::KeepIncoming => &catalog_file,
            };
            info!(
                "{} duplicates {}; moving {} to holding",
                candidate_file.display(),
                catalog_file.display(),
                displaced.display()
            );
            let relocated = fsops::trash_file(displaced, &trash_dir, &self.opts)?;
            hits.push(DuplicateHit {
                position,
                catalog_file,
                candidate_file,
                relocated,
            });
        }

        info!("{} duplicates found", hits.len());
        Ok(hits)
    }

    fn content_match(
        &self,
        store: &EntryStore,
        original_index: &index::SortedIndex<u64>,
        size: u64,
        candidate: &Entry,
    ) -> Result<Option<usize>> {
        let mut candidate_digest: Option<String> = None;

        for position in original_index.bucket(&size) {
            if candidate_digest.is_none() {
                candidate_digest = Some(self.hasher.hash(&candidate.file_path())?);
            }
            let record = &store.entries()[position];
            let record_digest = if record.checksum.is_empty() {
                match self.hasher.hash(&record.file_path()) {
                    Ok(digest) => digest,
                    Err(e) => {
                        warn!("cannot hash {}: {}", record.name, e);
                        continue;
                    }
                }
            } else {
                record.checksum.clone()
            };
            if candidate_digest.as_deref() == Some(record_digest.as_str()) {
                return Ok(Some(position));
            }
        }
        Ok(None)
    }
}
