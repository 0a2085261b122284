//! Batch catalog integrity checking and repair

use crate::store::EntryStore;
use crate::{codec, Result};
use std::fs;
use std::os::unix::fs::MetadataExt;
use tracing::{info, warn};

/// Outcome of one integrity pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CheckReport {
    /// Human-readable descriptions of everything found
    pub defects: Vec<String>,
    /// Whether any record was repaired (catalog needs rewriting)
    pub changed: bool,
}

impl CheckReport {
    fn report(&mut self, defect: String) {
        warn!("{}", defect);
        self.defects.push(defect);
    }
}

/// Walk the whole catalog checking records against the filesystem.
///
/// With `fix` set, repairs that need no human judgement are applied in
/// place: pointer re-normalization, duplicate pointer removal, backup
/// count resync, stale record inodes, and pointers to vanished backup
/// files. Size drift and duplicate-inode pairs are only ever reported —
/// both need manual investigation.
pub fn check_catalog(store: &mut EntryStore, fix: bool) -> Result<CheckReport> {
    let mut report = CheckReport::default();

    for (a, b) in store.duplicate_inodes() {
        report.report(format!(
            "{} and {} inodes match",
            store.entries()[a].file_path().display(),
            store.entries()[b].file_path().display()
        ));
    }

    for position in 0..store.len() {
        check_record(store, position, fix, &mut report)?;
    }

    info!("{} records checked", store.len());
    Ok(report)
}

fn check_record(
    store: &mut EntryStore,
    position: usize,
    fix: bool,
    report: &mut CheckReport,
) -> Result<()> {
    let target_path = store.entries()[position].file_path();

    match fs::metadata(&target_path) {
        Err(_) => {
            report.report(format!("{} doesn't exist", target_path.display()));
            return Ok(());
        }
        Ok(meta) => {
            let record = &store.entries()[position];
            if meta.ino() != record.inode {
                report.report(format!(
                    "{} inode {} doesn't match entry {}",
                    target_path.display(),
                    meta.ino(),
                    record.inode
                ));
                if fix {
                    store.get_mut(position).expect("checked position").inode = meta.ino();
                    report.changed = true;
                }
                return Ok(());
            }
            if meta.len() != record.current_size {
                report.report(format!(
                    "{} has changed size from {} to {}",
                    target_path.display(),
                    record.current_size,
                    meta.len()
                ));
                return Ok(());
            }
        }
    }

    normalize_pointers(store, position, fix, report);
    check_backup_files(store, position, fix, report);

    let record = &store.entries()[position];
    if record.backup_count as usize != record.backup_paths.len() {
        report.report(format!(
            "{} backup count {} does not match pointer list length {}",
            target_path.display(),
            record.backup_count,
            record.backup_paths.len()
        ));
        if fix {
            let record = store.get_mut(position).expect("checked position");
            record.backup_count = record.backup_paths.len() as u64;
            report.changed = true;
        }
    }
    if store.entries()[position].backup_paths.is_empty() {
        warn!("{} has no valid backups", target_path.display());
    }
    Ok(())
}

/// Re-encode every pointer through the codec and drop duplicates.
fn normalize_pointers(
    store: &mut EntryStore,
    position: usize,
    fix: bool,
    report: &mut CheckReport,
) {
    let record = &store.entries()[position];
    let mut normalized: Vec<String> = Vec::new();
    let mut defective = false;

    for pointer in &record.backup_paths {
        match codec::decode(pointer) {
            Ok((dir, inode)) => {
                let encoded = codec::encode(&dir, inode);
                if encoded != *pointer {
                    defective = true;
                }
                if normalized.contains(&encoded) {
                    defective = true;
                } else {
                    normalized.push(encoded);
                }
            }
            Err(e) => {
                report.report(format!("{}: {}", record.name, e));
                defective = true;
            }
        }
    }

    if defective {
        report.report(format!(
            "{}: pointers corrected {:?} -> {:?}",
            record.name, record.backup_paths, normalized
        ));
        if fix {
            let record = store.get_mut(position).expect("checked position");
            record.backup_paths = normalized;
            record.backup_count = record.backup_paths.len() as u64;
            report.changed = true;
        }
    }
}

/// Verify each pointer's backup file on disk.
fn check_backup_files(
    store: &mut EntryStore,
    position: usize,
    fix: bool,
    report: &mut CheckReport,
) {
    let record = store.entries()[position].clone();
    let mut keep: Vec<String> = Vec::new();

    for pointer in &record.backup_paths {
        let Ok((dir, inode)) = codec::decode(pointer) else {
            keep.push(pointer.clone());
            continue;
        };
        if !dir.exists() {
            warn!("{}: backup directory {} unreachable", record.name, dir.display());
            keep.push(pointer.clone());
            continue;
        }
        let backup_path = dir.join(&record.name);
        match fs::metadata(&backup_path) {
            Err(_) => {
                report.report(format!(
                    "{} backup doesn't exist ({} backups listed)",
                    backup_path.display(),
                    record.backup_count
                ));
                // dropped under fix: the pointer is not kept
            }
            Ok(meta) => {
                if meta.ino() != inode {
                    report.report(format!(
                        "{} backup inode {} doesn't match entry {}",
                        backup_path.display(),
                        meta.ino(),
                        inode
                    ));
                    keep.push(codec::encode(&dir, meta.ino()));
                } else {
                    if meta.len() != record.original_size {
                        report.report(format!(
                            "{} backup has changed size from {} to {}",
                            backup_path.display(),
                            record.original_size,
                            meta.len()
                        ));
                    }
                    keep.push(pointer.clone());
                }
            }
        }
    }

    if fix && keep != record.backup_paths {
        let record = store.get_mut(position).expect("checked position");
        record.backup_paths = keep;
        record.backup_count = record.backup_paths.len() as u64;
        report.changed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Entry;
    use pretty_assertions::assert_eq;
    use std::fs::File;
    use std::io::Write;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(path: &Path, content: &[u8]) {
        File::create(path).unwrap().write_all(content).unwrap();
    }

    #[test]
    fn count_mismatch_is_reported_and_fixed() -> Result<()> {
        let dir = TempDir::new()?;
        write(&dir.path().join("a.mp4"), b"bytes");
        let mut entry = Entry::from_path(&dir.path().join("a.mp4"), None)?;
        entry.backup_count = 5;
        let mut store = EntryStore::new(vec![entry]);

        let report = check_catalog(&mut store, false)?;
        assert!(report.defects.iter().any(|d| d.contains("backup count")));
        assert!(!report.changed);

        let report = check_catalog(&mut store, true)?;
        assert!(report.changed);
        assert_eq!(store.get(0).unwrap().backup_count, 0);
        Ok(())
    }

    #[test]
    fn missing_record_file_is_reported_not_fatal() -> Result<()> {
        let dir = TempDir::new()?;
        write(&dir.path().join("a.mp4"), b"bytes");
        let entry = Entry::from_path(&dir.path().join("a.mp4"), None)?;
        fs::remove_file(dir.path().join("a.mp4"))?;
        let mut store = EntryStore::new(vec![entry]);

        let report = check_catalog(&mut store, true)?;
        assert!(report.defects.iter().any(|d| d.contains("doesn't exist")));
        Ok(())
    }

    #[test]
    fn vanished_backup_pointer_is_dropped_under_fix() -> Result<()> {
        let root = TempDir::new()?;
        let library = root.path().join("library");
        let backups = root.path().join("backups");
        fs::create_dir_all(&library)?;
        fs::create_dir_all(&backups)?;
        write(&library.join("a.mp4"), b"bytes");

        let mut entry = Entry::from_path(&library.join("a.mp4"), None)?;
        entry.backup_paths = vec![crate::codec::encode(&backups, 999)];
        entry.backup_count = 1;
        let mut store = EntryStore::new(vec![entry]);

        let report = check_catalog(&mut store, true)?;
        assert!(report.changed);
        let record = store.get(0).unwrap();
        assert!(record.backup_paths.is_empty());
        assert_eq!(record.backup_count, 0);
        assert!(report
            .defects
            .iter()
            .any(|d| d.contains("backup doesn't exist")));
        Ok(())
    }

    #[test]
    fn stale_record_inode_is_refreshed_under_fix() -> Result<()> {
        let dir = TempDir::new()?;
        write(&dir.path().join("a.mp4"), b"bytes");
        let mut entry = Entry::from_path(&dir.path().join("a.mp4"), None)?;
        let real_inode = entry.inode;
        entry.inode = real_inode + 1;
        let mut store = EntryStore::new(vec![entry]);

        let report = check_catalog(&mut store, true)?;
        assert!(report.changed);
        assert_eq!(store.get(0).unwrap().inode, real_inode);
        Ok(())
    }

    #[test]
    fn duplicate_inode_pairs_are_flagged_for_manual_merge() -> Result<()> {
        let dir = TempDir::new()?;
        write(&dir.path().join("a.mp4"), b"bytes");
        let entry = Entry::from_path(&dir.path().join("a.mp4"), None)?;
        let mut twin = entry.clone();
        twin.name = "b.mp4".to_string();
        let mut store = EntryStore::new(vec![entry, twin]);

        let report = check_catalog(&mut store, false)?;
        assert!(report.defects.iter().any(|d| d.contains("inodes match")));
        Ok(())
    }
}
