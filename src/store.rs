//! Catalog persistence and the ordered record container

use crate::entry::Entry;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Catalog file format version
pub const CATALOG_VERSION: u32 = 1;

#[derive(Debug, Deserialize)]
struct CatalogFile {
    version: u32,
    entries: Vec<Entry>,
}

#[derive(Serialize)]
struct CatalogFileRef<'a> {
    version: u32,
    entries: &'a [Entry],
}

/// The full ordered collection of catalog records.
///
/// The canonical order is ascending `current_size`; every size-bucket
/// query depends on it. `save` does **not** re-sort — callers that mutated
/// sizes must call [`EntryStore::sort_by_current_size`] before persisting,
/// or later `lower_bound` queries will return garbage. That obligation is
/// the caller's, by contract.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct EntryStore {
    entries: Vec<Entry>,
}

impl EntryStore {
    pub fn new(entries: Vec<Entry>) -> Self {
        Self { entries }
    }

    /// Load a catalog; a missing file is fatal.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::CatalogMissing {
                path: path.to_path_buf(),
            });
        }
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let catalog: CatalogFile = serde_json::from_reader(reader)?;

        if catalog.version != CATALOG_VERSION {
            return Err(Error::CatalogVersion {
                found: catalog.version,
                expected: CATALOG_VERSION,
            });
        }

        let store = Self {
            entries: catalog.entries,
        };
        for defect in store.consistency_defects() {
            warn!("{}", defect);
        }
        Ok(store)
    }

    /// Load a catalog, starting empty when the file does not exist yet.
    pub fn load_or_empty(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Persist the whole collection. Order is written as-is.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(
            writer,
            &CatalogFileRef {
                version: CATALOG_VERSION,
                entries: &self.entries,
            },
        )?;
        Ok(())
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&Entry> {
        self.entries.get(position)
    }

    pub fn get_mut(&mut self, position: usize) -> Option<&mut Entry> {
        self.entries.get_mut(position)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    /// Insert preserving ascending `current_size` order.
    /// Outstanding indexes are invalid afterwards.
    pub fn insert(&mut self, entry: Entry) -> usize {
        let position = self
            .entries
            .partition_point(|e| e.current_size <= entry.current_size);
        self.entries.insert(position, entry);
        position
    }

    /// Remove by position, shifting subsequent positions down.
    /// Outstanding indexes are invalid afterwards.
    pub fn remove(&mut self, position: usize) -> Entry {
        self.entries.remove(position)
    }

    /// Restore the canonical ascending-`current_size` order.
    pub fn sort_by_current_size(&mut self) {
        self.entries.sort_by_key(|e| e.current_size);
    }

    /// Backup-count / pointer-list mismatches (reportable defects, never a
    /// crash) for every record in the store.
    pub fn consistency_defects(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| !e.backups_consistent())
            .map(|e| {
                format!(
                    "{}: backup count {} does not match pointer list length {}",
                    e.name,
                    e.backup_count,
                    e.backup_paths.len()
                )
            })
            .collect()
    }

    /// Pairs of positions whose records claim the same inode within the
    /// same directory — flagged for manual merge, never auto-resolved.
    pub fn duplicate_inodes(&self) -> Vec<(usize, usize)> {
        let mut by_inode: Vec<(u64, usize)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.inode, i))
            .collect();
        by_inode.sort_by_key(|(inode, _)| *inode);

        let mut pairs = Vec::new();
        for window in by_inode.windows(2) {
            let (inode_a, pos_a) = window[0];
            let (inode_b, pos_b) = window[1];
            if inode_a == inode_b && self.entries[pos_a].path == self.entries[pos_b].path {
                pairs.push((pos_a, pos_b));
            }
        }
        pairs
    }

    /// Write the one-way tabular derivative. Human-readable only; the
    /// catalog is never reconstructed from it.
    pub fn export_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record([
            "uid",
            "path",
            "name",
            "original_size",
            "current_size",
            "modified_at",
            "backup_count",
            "backup_paths",
            "original_duration",
            "current_duration",
            "inode",
            "link_count",
            "checksum",
            "extra",
        ])?;
        for entry in &self.entries {
            writer.write_record([
                entry.uid.clone(),
                entry.path.display().to_string(),
                entry.name.clone(),
                entry.original_size.to_string(),
                entry.current_size.to_string(),
                entry.modified_at.to_rfc3339(),
                entry.backup_count.to_string(),
                entry.backup_paths.join(";"),
                entry.original_duration.to_string(),
                entry.current_duration.to_string(),
                entry.inode.to_string(),
                entry.link_count.to_string(),
                entry.checksum.clone(),
                serde_json::to_string(&entry.extra)?,
            ])?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Side-catalog path holding quarantined records for a given catalog.
pub fn quarantine_path(catalog_path: &Path) -> PathBuf {
    let mut name = catalog_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str(".quarantine");
    catalog_path.with_file_name(name)
}
