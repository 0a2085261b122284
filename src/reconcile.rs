//! Catalog ↔ filesystem reconciliation
//!
//! One pass over the scanned directories classifies every media file as
//! MASTER (already known to the active catalog), QUARANTINE (a known
//! record whose old backing file vanished and has now reappeared), or
//! NOENTRY (genuinely new). Quarantined records keep their backup history,
//! so a reappeared file is reunited with its record instead of fabricating
//! a duplicate that would orphan the original's backups.

use crate::entry::Entry;
use crate::index;
use crate::probe::Prober;
use crate::resolver::{self, MatchTier, Observation};
use crate::store::EntryStore;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Outcome counts for one reconciliation run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Files matched against the active store without changes
    pub unchanged: usize,
    /// Records renamed in place
    pub renamed: usize,
    /// Records reunited out of quarantine
    pub reunited: usize,
    /// Brand-new records created
    pub created: usize,
}

/// Reconciliation engine over one catalog and its quarantine set
pub struct Reconciler<'a> {
    prober: &'a dyn Prober,
}

impl<'a> Reconciler<'a> {
    pub fn new(prober: &'a dyn Prober) -> Self {
        Self { prober }
    }

    /// Fail-fast integrity pre-step, run once before classification.
    ///
    /// Records whose backing file is gone move into the quarantine set.
    /// A still-present file whose size drifted without going through a
    /// core operation is a fatal inconsistency: the run aborts rather
    /// than proceeding on stale data.
    pub fn check_fs_status(
        &self,
        store: &mut EntryStore,
        quarantine: &mut Vec<Entry>,
    ) -> Result<()> {
        let mut position = 0;
        while position < store.len() {
            let item = &store.entries()[position];
            let item_path = item.file_path();
            match fs::metadata(&item_path) {
                Err(_) => {
                    info!("{} doesn't exist, quarantined", item.name);
                    let lost = store.remove(position);
                    quarantine.push(lost);
                    // do not advance: removal shifted the next record here
                }
                Ok(meta) if meta.len() != item.current_size => {
                    return Err(Error::SizeDrift {
                        name: item.name.clone(),
                        recorded: item.current_size,
                        actual: meta.len(),
                    });
                }
                Ok(_) => position += 1,
            }
        }
        Ok(())
    }

    /// Classify every scanned file and fold the results into the store.
    ///
    /// Run [`Reconciler::check_fs_status`] first; classification assumes
    /// every active record's backing file exists at its recorded size.
    pub fn process_targets(
        &self,
        store: &mut EntryStore,
        quarantine: &mut Vec<Entry>,
        files: &[std::path::PathBuf],
    ) -> Result<ReconcileStats> {
        let mut stats = ReconcileStats::default();
        let mut size_index = index::by_current_size(store.entries());

        for file_path in files {
            let meta = match fs::metadata(file_path) {
                Ok(meta) => meta,
                Err(e) => {
                    warn!("cannot stat {}: {}", file_path.display(), e);
                    continue;
                }
            };
            let obs = observe(file_path, &meta);
            let modified_at = DateTime::<Utc>::from(meta.modified()?);

            if let Some(matched) = resolver::resolve_known(&obs, store, &size_index) {
                match matched.tier {
                    MatchTier::ExactName => {
                        debug!("{}: unchanged", obs.name);
                        stats.unchanged += 1;
                    }
                    _ => {
                        let record = store.get_mut(matched.position).expect("resolved position");
                        info!("{} -> {} renamed", record.name, obs.name);
                        record.name = obs.name.clone();
                        record.inode = obs.inode;
                        stats.renamed += 1;
                    }
                }
                continue;
            }

            if let Some(q_index) = quarantine_match(quarantine, &obs, modified_at) {
                let mut record = quarantine.remove(q_index);
                info!("{} -> {} reunited from quarantine", record.name, obs.name);
                record.name = obs.name.clone();
                record.path = obs.directory.clone();
                record.inode = obs.inode;
                store.insert(record);
                size_index = index::by_current_size(store.entries());
                stats.reunited += 1;
                continue;
            }

            match Entry::from_path(file_path, Some(self.prober)) {
                Ok(new_entry) => {
                    info!("{} added to catalog", new_entry.name);
                    store.insert(new_entry);
                    size_index = index::by_current_size(store.entries());
                    stats.created += 1;
                }
                Err(e) => warn!("skipping {}: {}", file_path.display(), e),
            }
        }

        info!(
            "{} unchanged, {} renamed, {} reunited, {} created",
            stats.unchanged, stats.renamed, stats.reunited, stats.created
        );
        Ok(stats)
    }
}

fn observe(file_path: &Path, meta: &fs::Metadata) -> Observation {
    use std::os::unix::fs::MetadataExt;
    Observation {
        directory: file_path
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .to_path_buf(),
        name: file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        size: meta.len(),
        inode: meta.ino(),
        duration: None,
        checksum: None,
    }
}

/// Match a reappeared file against the quarantine set: by inode within
/// the same directory first, then by size + original modification time.
fn quarantine_match(
    quarantine: &[Entry],
    obs: &Observation,
    modified_at: DateTime<Utc>,
) -> Option<usize> {
    if let Some(found) = quarantine.iter().position(|item| {
        item.inode == obs.inode && item.path == obs.directory && item.current_size == obs.size
    }) {
        return Some(found);
    }
    quarantine
        .iter()
        .position(|item| item.current_size == obs.size && item.modified_at == modified_at)
}
