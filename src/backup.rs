//! Backup-copy lifecycle: record, verify, delete, restore, recreate
//!
//! Backup copies are addressed by encoded `(directory, inode)` pointers on
//! each catalog record. Everything here funnels through the pointer codec
//! and the identity resolver; nothing re-derives the pointer format or
//! second-guesses the tier order.

use crate::config::{Config, RunOptions};
use crate::probe::{ContentHasher, Prober};
use crate::resolver::{self, DURATION_TOLERANCE};
use crate::store::EntryStore;
use crate::{codec, fsops, index, scan};
use crate::{Error, Result};
use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::Path;
use tracing::{debug, info, warn};

/// Candidate shown when an unmatched backup file resembles a record by
/// duration
#[derive(Debug, Clone, PartialEq)]
pub struct DurationCandidate {
    pub name: String,
    pub duration: f64,
}

/// One backup file with no catalog match, plus its near-duration records
#[derive(Debug, Clone, PartialEq)]
pub struct UnmatchedBackup {
    pub name: String,
    pub size: u64,
    pub duration: f64,
    pub candidates: Vec<DurationCandidate>,
}

/// Verify presents candidates within this duration window (seconds)
pub const VERIFY_WINDOW: f64 = 0.2;

/// Backup-copy reconciliation over one catalog
pub struct BackupReconciler<'a> {
    prober: &'a dyn Prober,
    hasher: &'a dyn ContentHasher,
    opts: RunOptions,
}

impl<'a> BackupReconciler<'a> {
    pub fn new(prober: &'a dyn Prober, hasher: &'a dyn ContentHasher, opts: RunOptions) -> Self {
        Self {
            prober,
            hasher,
            opts,
        }
    }

    /// Record the copies found in a backup directory.
    ///
    /// Each file with an exact size+name match gains a backup pointer,
    /// unless that pointer is already present. Files matching nothing are
    /// reported and skipped. Returns the number of records updated.
    pub fn record(
        &self,
        store: &mut EntryStore,
        backup_dir: &Path,
        config: &Config,
    ) -> Result<usize> {
        let copies = scan::media_entries(backup_dir, config)?;
        info!("{} backup files found in {}", copies.len(), backup_dir.display());

        // Only names and pointer lists change below; sizes are untouched,
        // so the index stays valid for the whole pass.
        let size_index = index::by_current_size(store.entries());
        let mut changed = 0;

        for copy in &copies {
            let found = resolver::find_exact(store, &size_index, copy.current_size, &copy.name);
            let Some(position) = found else {
                warn!("{} not found in catalog", copy.name);
                continue;
            };

            let pointer = codec::encode(backup_dir, copy.inode);
            let record = store.get_mut(position).expect("indexed position");
            if !record.backup_paths.contains(&pointer) {
                record.backup_paths.push(pointer);
                record.backup_count += 1;
                changed += 1;
                debug!("{}: backup recorded", record.name);
            }
        }

        info!("{} records updated", changed);
        Ok(changed)
    }

    /// List backup files with no exact catalog match, each with the
    /// records whose duration falls inside the ±0.2 s window, for manual
    /// disposition. Never deletes anything.
    pub fn verify(
        &self,
        store: &EntryStore,
        backup_dir: &Path,
        config: &Config,
    ) -> Result<Vec<UnmatchedBackup>> {
        let copies = scan::media_entries(backup_dir, config)?;
        let size_index = index::by_current_size(store.entries());
        let mut unmatched = Vec::new();

        for copy in &copies {
            if resolver::find_exact(store, &size_index, copy.current_size, &copy.name).is_some() {
                continue;
            }

            let duration = match self.prober.duration(&copy.file_path()) {
                Ok(duration) => duration,
                Err(e) => {
                    warn!("cannot probe {}: {}", copy.name, e);
                    continue;
                }
            };
            let candidates = store
                .iter()
                .filter(|record| (record.current_duration - duration).abs() < VERIFY_WINDOW)
                .map(|record| DurationCandidate {
                    name: record.name.clone(),
                    duration: record.current_duration,
                })
                .collect();
            unmatched.push(UnmatchedBackup {
                name: copy.name.clone(),
                size: copy.current_size,
                duration,
                candidates,
            });
        }

        Ok(unmatched)
    }

    /// Remove the backup copies of fully-deleted records from one backup
    /// directory. Returns the number of files unlinked.
    ///
    /// A pointer whose file is gone under its recorded name is chased by
    /// inode through the directory listing, but an inode whose content no
    /// longer matches the record's size and duration is treated as
    /// filesystem inode reuse: the operation refuses to touch the file
    /// and aborts, because deleting by inode alone could destroy an
    /// unrelated file.
    pub fn delete(
        &self,
        deleted: &EntryStore,
        backup_dir: &Path,
        config: &Config,
    ) -> Result<usize> {
        let normalized_dir = codec::normalize(backup_dir);
        if !normalized_dir.exists() {
            warn!("{} is unreachable", normalized_dir.display());
            return Ok(0);
        }
        let listing = scan::media_entries(backup_dir, config)?;
        let mut removed = 0;

        for item in deleted.iter() {
            for pointer in &item.backup_paths {
                if pointer.is_empty() {
                    debug!("{}: no backup", item.name);
                    continue;
                }
                let (dir, inode) = match codec::decode(pointer) {
                    Ok(decoded) => decoded,
                    Err(e) => {
                        warn!("{}: {}", item.name, e);
                        continue;
                    }
                };
                if dir != normalized_dir {
                    continue;
                }

                let backup_file = dir.join(&item.name);
                if let Ok(meta) = fs::metadata(&backup_file) {
                    if meta.ino() == inode {
                        fsops::remove_file(&backup_file, &self.opts)?;
                        removed += 1;
                        continue;
                    }
                    debug!(
                        "{}: name present but inode {} != {}",
                        item.name,
                        meta.ino(),
                        inode
                    );
                }

                // Recorded name is stale; chase the inode through the
                // directory, guarding against inode reuse.
                let Some(found) = listing.iter().find(|f| f.inode == inode) else {
                    warn!("no backup found: {}", backup_file.display());
                    continue;
                };
                if found.current_size != item.current_size {
                    return Err(Error::InodeMismatch {
                        path: found.file_path(),
                        recorded: inode,
                        actual: found.inode,
                    });
                }
                let duration = self.prober.duration(&found.file_path())?;
                if (duration - item.current_duration).abs() >= DURATION_TOLERANCE {
                    return Err(Error::InodeMismatch {
                        path: found.file_path(),
                        recorded: inode,
                        actual: found.inode,
                    });
                }
                fsops::remove_file(&found.file_path(), &self.opts)?;
                removed += 1;
            }
        }

        info!("{} backup files removed", removed);
        Ok(removed)
    }

    /// Restore lost or corrupted originals from their backup copies.
    ///
    /// Each backup file is matched to its record by original size + name;
    /// the current live file (if any) is moved into the trash holding
    /// directory rather than deleted, the backup is copied into the
    /// vacated path, and the record's live fields are refreshed from the
    /// restored file. Returns the number of records restored.
    pub fn restore(
        &self,
        store: &mut EntryStore,
        backup_dir: &Path,
        config: &Config,
    ) -> Result<usize> {
        let targets = scan::media_entries(backup_dir, config)?;
        let original_index = index::by_original_size(store.entries());
        let mut restored = 0;

        for target in &targets {
            let found =
                resolver::find_exact(store, &original_index, target.original_size, &target.name);
            let Some(position) = found else {
                return Err(Error::NoMatch {
                    name: target.name.clone(),
                });
            };

            let live_path = store.entries()[position].file_path();
            let library_dir = store.entries()[position].path.clone();
            if live_path.exists() {
                let trash = library_dir.join(&config.library.trash_dir);
                info!("moving {} to trash", live_path.display());
                fsops::trash_file(&live_path, &trash, &self.opts)?;
            }
            fsops::copy_file(&target.file_path(), &live_path, &self.opts)?;

            if !self.opts.dry_run {
                let meta = fs::metadata(&live_path)?;
                let record = store.get_mut(position).expect("indexed position");
                record.current_duration = self.prober.duration(&live_path)?;
                record.current_size = meta.len();
                record.inode = meta.ino();
                if !record.checksum.is_empty() {
                    record.checksum = self.hasher.hash(&live_path)?;
                }
            }
            restored += 1;
        }

        info!("{} records restored", restored);
        Ok(restored)
    }

    /// Re-copy primaries whose backup copy in `backup_dir` has vanished,
    /// rewriting each affected pointer with the fresh inode. Returns the
    /// number of pointers rewritten.
    pub fn recreate(&self, store: &mut EntryStore, backup_dir: &Path) -> Result<usize> {
        let normalized_dir = codec::normalize(backup_dir);
        let mut changed = 0;

        for position in 0..store.len() {
            let item = store.entries()[position].clone();
            let source_path = item.file_path();
            for (slot, pointer) in item.backup_paths.iter().enumerate() {
                let (dir, _) = match codec::decode(pointer) {
                    Ok(decoded) => decoded,
                    Err(e) => {
                        warn!("{}: {}", item.name, e);
                        continue;
                    }
                };
                if dir != normalized_dir {
                    continue;
                }
                let target_path = dir.join(&item.name);
                if !source_path.exists() || target_path.exists() {
                    continue;
                }

                fsops::copy_file(&source_path, &target_path, &self.opts)?;
                if !self.opts.dry_run {
                    let meta = fs::metadata(&target_path)?;
                    let record = store.get_mut(position).expect("iterated position");
                    record.backup_paths[slot] = codec::encode(&dir, meta.ino());
                    changed += 1;
                }
            }
        }

        info!("{} backup pointers rewritten", changed);
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Entry;
    use crate::probe::{Blake3Hasher, MdTag};
    use pretty_assertions::assert_eq;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    struct StubProber(f64);

    impl Prober for StubProber {
        fn duration(&self, _path: &Path) -> Result<f64> {
            Ok(self.0)
        }
        fn md_tag(&self, _path: &Path) -> Result<Option<MdTag>> {
            Ok(None)
        }
    }

    fn write(path: &Path, content: &[u8]) {
        File::create(path).unwrap().write_all(content).unwrap();
    }

    fn entry_for(path: &Path) -> Entry {
        Entry::from_path(path, None).unwrap()
    }

    fn reconciler<'a>(
        prober: &'a StubProber,
        hasher: &'a Blake3Hasher,
    ) -> BackupReconciler<'a> {
        BackupReconciler::new(prober, hasher, RunOptions::default())
    }

    #[test]
    fn record_appends_pointer_once_and_keeps_invariant() -> Result<()> {
        let root = TempDir::new()?;
        let library = root.path().join("library");
        let backups = root.path().join("backups");
        fs::create_dir_all(&library)?;
        fs::create_dir_all(&backups)?;
        write(&library.join("clip.mp4"), b"clip bytes");
        write(&backups.join("clip.mp4"), b"clip bytes");

        let mut store = EntryStore::new(vec![entry_for(&library.join("clip.mp4"))]);
        let prober = StubProber(0.0);
        let hasher = Blake3Hasher::new();
        let engine = reconciler(&prober, &hasher);
        let config = Config::default();

        let changed = engine.record(&mut store, &backups, &config)?;
        assert_eq!(changed, 1);
        let record = store.get(0).unwrap();
        assert_eq!(record.backup_count, 1);
        assert!(record.backups_consistent());

        // Same directory again: pointer already present, nothing changes.
        let changed = engine.record(&mut store, &backups, &config)?;
        assert_eq!(changed, 0);
        assert_eq!(store.get(0).unwrap().backup_count, 1);
        Ok(())
    }

    #[test]
    fn verify_reports_unmatched_files_with_duration_candidates() -> Result<()> {
        let root = TempDir::new()?;
        let library = root.path().join("library");
        let backups = root.path().join("backups");
        fs::create_dir_all(&library)?;
        fs::create_dir_all(&backups)?;
        write(&library.join("known.mp4"), b"0123456789");
        write(&backups.join("stray.mp4"), b"different bytes");

        let mut known = entry_for(&library.join("known.mp4"));
        known.current_duration = 42.1;
        let store = EntryStore::new(vec![known]);

        let prober = StubProber(42.0);
        let hasher = Blake3Hasher::new();
        let engine = reconciler(&prober, &hasher);

        let unmatched = engine.verify(&store, &backups, &Config::default())?;
        assert_eq!(unmatched.len(), 1);
        assert_eq!(unmatched[0].name, "stray.mp4");
        assert_eq!(unmatched[0].candidates.len(), 1);
        assert_eq!(unmatched[0].candidates[0].name, "known.mp4");
        Ok(())
    }

    #[test]
    fn delete_removes_backup_when_inode_matches_pointer() -> Result<()> {
        let root = TempDir::new()?;
        let backups = root.path().join("backups");
        fs::create_dir_all(&backups)?;
        write(&backups.join("gone.mp4"), b"backup copy");

        let mut item = entry_for(&backups.join("gone.mp4"));
        let inode = item.inode;
        item.backup_paths = vec![codec::encode(&backups, inode)];
        item.backup_count = 1;
        let deleted = EntryStore::new(vec![item]);

        let prober = StubProber(0.0);
        let hasher = Blake3Hasher::new();
        let engine = reconciler(&prober, &hasher);

        let removed = engine.delete(&deleted, &backups, &Config::default())?;
        assert_eq!(removed, 1);
        assert!(!backups.join("gone.mp4").exists());
        Ok(())
    }

    #[test]
    fn delete_refuses_reused_inode_with_mismatched_content() -> Result<()> {
        let root = TempDir::new()?;
        let backups = root.path().join("backups");
        fs::create_dir_all(&backups)?;
        // An unrelated file occupies the inode the pointer remembers.
        write(&backups.join("unrelated.mp4"), b"different content entirely");
        let squatter_inode = fs::metadata(backups.join("unrelated.mp4"))?.ino();

        let mut item = entry_for(&backups.join("unrelated.mp4"));
        item.name = "deleted.mp4".to_string();
        item.current_size = 10; // stored size disagrees with the squatter
        item.backup_paths = vec![codec::encode(&backups, squatter_inode)];
        item.backup_count = 1;
        let deleted = EntryStore::new(vec![item]);

        let prober = StubProber(0.0);
        let hasher = Blake3Hasher::new();
        let engine = reconciler(&prober, &hasher);

        let result = engine.delete(&deleted, &backups, &Config::default());
        assert!(matches!(result, Err(Error::InodeMismatch { .. })));
        assert!(backups.join("unrelated.mp4").exists());
        Ok(())
    }

    #[test]
    fn delete_refuses_reused_inode_with_drifted_duration() -> Result<()> {
        let root = TempDir::new()?;
        let backups = root.path().join("backups");
        fs::create_dir_all(&backups)?;
        write(&backups.join("unrelated.mp4"), b"same size pad");
        let squatter_inode = fs::metadata(backups.join("unrelated.mp4"))?.ino();

        let mut item = entry_for(&backups.join("unrelated.mp4"));
        item.name = "deleted.mp4".to_string();
        item.current_duration = 60.0;
        item.backup_paths = vec![codec::encode(&backups, squatter_inode)];
        item.backup_count = 1;
        let deleted = EntryStore::new(vec![item]);

        let prober = StubProber(10.0); // live content plays nothing like 60 s
        let hasher = Blake3Hasher::new();
        let engine = reconciler(&prober, &hasher);

        let result = engine.delete(&deleted, &backups, &Config::default());
        assert!(matches!(result, Err(Error::InodeMismatch { .. })));
        assert!(backups.join("unrelated.mp4").exists());
        Ok(())
    }

    #[test]
    fn restore_trashes_live_file_and_refreshes_record() -> Result<()> {
        let root = TempDir::new()?;
        let library = root.path().join("library");
        let backups = root.path().join("backups");
        fs::create_dir_all(&library)?;
        fs::create_dir_all(&backups)?;
        write(&library.join("clip.mp4"), b"corrupted!");
        write(&backups.join("clip.mp4"), b"pristine backup bytes");

        let mut record = entry_for(&library.join("clip.mp4"));
        record.original_size = 21; // matches the backup copy
        record.checksum = "stale".to_string();
        let mut store = EntryStore::new(vec![record]);

        let prober = StubProber(99.5);
        let hasher = Blake3Hasher::new();
        let engine = reconciler(&prober, &hasher);
        let config = Config::default();

        let restored = engine.restore(&mut store, &backups, &config)?;
        assert_eq!(restored, 1);

        let record = store.get(0).unwrap();
        assert_eq!(record.current_size, 21);
        assert_eq!(record.current_duration, 99.5);
        assert_ne!(record.checksum, "stale");
        assert!(library.join("DelLinks/clip.mp4").exists());
        assert_eq!(fs::read(library.join("clip.mp4"))?, b"pristine backup bytes");
        Ok(())
    }

    #[test]
    fn recreate_copies_primary_back_and_rewrites_pointer() -> Result<()> {
        let root = TempDir::new()?;
        let library = root.path().join("library");
        let backups = root.path().join("backups");
        fs::create_dir_all(&library)?;
        fs::create_dir_all(&backups)?;
        write(&library.join("clip.mp4"), b"primary bytes");

        let mut record = entry_for(&library.join("clip.mp4"));
        record.backup_paths = vec![codec::encode(&backups, 12345)];
        record.backup_count = 1;
        let mut store = EntryStore::new(vec![record]);

        let prober = StubProber(0.0);
        let hasher = Blake3Hasher::new();
        let engine = reconciler(&prober, &hasher);

        let changed = engine.recreate(&mut store, &backups)?;
        assert_eq!(changed, 1);
        assert!(backups.join("clip.mp4").exists());

        let fresh_inode = fs::metadata(backups.join("clip.mp4"))?.ino();
        let record = store.get(0).unwrap();
        assert_eq!(
            record.backup_paths[0],
            codec::encode(&backups, fresh_inode)
        );
        assert!(record.backups_consistent());
        Ok(())
    }
}
