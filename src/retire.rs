//! Explicit record deletion
//!
//! The only path that removes a record from the active store. Files the
//! user wants gone are staged in a directory; each one is matched to its
//! record by inode, its backup copies are unlinked, and the record moves
//! into the deleted catalog so the backup-delete tool can finish cleanup
//! on directories that were offline at the time.

use crate::config::{Config, RunOptions};
use crate::entry::Entry;
use crate::store::EntryStore;
use crate::{codec, fsops, scan, Result};
use std::path::Path;
use tracing::{info, warn};

/// Retire every staged file's record. Returns the number of records
/// moved into the deleted catalog.
pub fn retire_entries(
    store: &mut EntryStore,
    deleted_log: &mut EntryStore,
    staging_dir: &Path,
    config: &Config,
    opts: &RunOptions,
) -> Result<usize> {
    let staged = scan::media_entries(staging_dir, config)?;
    info!("{} staged files loaded", staged.len());
    let mut retired = 0;

    for item in &staged {
        let Some(position) = store.iter().position(|e| e.inode == item.inode) else {
            if deleted_log.iter().any(|e| e.inode == item.inode) {
                info!("{} already logged", item.name);
            } else {
                warn!("{} not found in catalog", item.name);
            }
            continue;
        };

        remove_backups(&store.entries()[position], opts)?;
        let record = store.remove(position);
        info!("removing entry {}", record.name);
        deleted_log.insert(record);
        retired += 1;
    }

    info!("{} records retired", retired);
    Ok(retired)
}

/// Unlink a record's backup copies by name. Unreachable directories are
/// reported and left for the backup-delete tool.
fn remove_backups(record: &Entry, opts: &RunOptions) -> Result<()> {
    for pointer in &record.backup_paths {
        let (dir, _) = match codec::decode(pointer) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!("{}: {}", record.name, e);
                continue;
            }
        };
        let backup_file = dir.join(&record.name);
        if backup_file.exists() {
            info!("deleting backup {}", backup_file.display());
            fsops::remove_file(&backup_file, opts)?;
        } else if !dir.exists() {
            warn!(
                "{}: backup directory {} unreachable",
                record.name,
                dir.display()
            );
        }
    }
    Ok(())
}
