//! Directory scans for media files

use crate::config::Config;
use crate::entry::Entry;
use crate::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Paths of the media files sitting directly in `dir`.
///
/// The scan is flat: media libraries and backup sets are single-level
/// directories, and recursing would sweep up holding/trash subdirectories.
pub fn media_paths(dir: &Path, config: &Config) -> Result<Vec<PathBuf>> {
    debug!("scanning {}", dir.display());
    let mut paths = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).into_iter() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if config.is_media_name(&name) {
            paths.push(entry.into_path());
        }
    }

    debug!("{} media files found in {}", paths.len(), dir.display());
    Ok(paths)
}

/// Fresh records for every media file in `dir`, ascending by size.
///
/// Durations are not probed here; operations that need them probe
/// individual files lazily.
pub fn media_entries(dir: &Path, config: &Config) -> Result<Vec<Entry>> {
    let mut entries = Vec::new();
    for path in media_paths(dir, config)? {
        match Entry::from_path(&path, None) {
            Ok(entry) => entries.push(entry),
            Err(e) => warn!("skipping {}: {}", path.display(), e),
        }
    }
    entries.sort_by_key(|e| e.current_size);
    Ok(entries)
}
