//! Catalog records for tracked media assets

use crate::probe::Prober;
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// One tracked media asset and its metadata.
///
/// `original_*` fields record the file as it was first cataloged;
/// `current_*` fields track the live file through trims and re-encodes.
/// An empty `checksum` means "not computed yet". `extra` is an open map
/// for auxiliary tags and is never interpreted by the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Opaque stable id
    pub uid: String,
    /// Directory holding the current file
    pub path: PathBuf,
    /// Current file name
    pub name: String,
    /// Size in bytes when first cataloged
    pub original_size: u64,
    /// Live size in bytes
    pub current_size: u64,
    /// Original file modification time
    pub modified_at: DateTime<Utc>,
    /// Number of recorded backup copies
    pub backup_count: u64,
    /// Encoded backup pointers, one per copy
    pub backup_paths: Vec<String>,
    /// Playback duration in seconds when first cataloged
    pub original_duration: f64,
    /// Live playback duration in seconds
    pub current_duration: f64,
    /// Filesystem inode of the current file
    pub inode: u64,
    /// Hard-link count of the current file
    pub link_count: u64,
    /// Content hash, empty until computed
    pub checksum: String,
    /// Open string-keyed map for auxiliary tags
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl Entry {
    /// Build a fresh record from a live file.
    ///
    /// `original_*` and `current_*` start equal and the backup list starts
    /// empty. When a prober is supplied the playback duration is probed;
    /// probe failures propagate so the caller can decide whether the file
    /// is skippable.
    pub fn from_path(path: &Path, prober: Option<&dyn Prober>) -> Result<Self> {
        let meta = fs::metadata(path)?;
        let duration = match prober {
            Some(p) => p.duration(path)?,
            None => 0.0,
        };
        let directory = path.parent().unwrap_or_else(|| Path::new("")).to_path_buf();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self {
            uid: Uuid::new_v4().to_string(),
            path: directory,
            name,
            original_size: meta.len(),
            current_size: meta.len(),
            modified_at: DateTime::<Utc>::from(meta.modified()?),
            backup_count: 0,
            backup_paths: Vec::new(),
            original_duration: duration,
            current_duration: duration,
            inode: meta.ino(),
            link_count: meta.nlink(),
            checksum: String::new(),
            extra: BTreeMap::new(),
        })
    }

    /// Full path of the current file
    pub fn file_path(&self) -> PathBuf {
        self.path.join(&self.name)
    }

    /// Whether the backup count agrees with the pointer list
    pub fn backups_consistent(&self) -> bool {
        self.backup_count as usize == self.backup_paths.len()
    }
}
