//! Tiered identity resolution
//!
//! Decides whether a file observed on disk *is* a record already in the
//! catalog. Name, size, duration, and inode can each change independently
//! over a file's life, so no single attribute is trusted alone; instead a
//! fixed sequence of strategies runs over the same-size bucket, stopping
//! at the first success. The resolver is a pure function over the store
//! and an index snapshot — it never mutates either.

use crate::entry::Entry;
use crate::index::SortedIndex;
use crate::probe::ContentHasher;
use crate::store::EntryStore;
use crate::Result;
use std::path::PathBuf;
use tracing::warn;

/// Two stored durations closer than this are considered the same content
/// (strict: a gap of exactly 0.5 s does not match).
pub const DURATION_TOLERANCE: f64 = 0.5;

/// A file observed on disk, as raw material for identity resolution
#[derive(Debug, Clone)]
pub struct Observation {
    pub directory: PathBuf,
    pub name: String,
    pub size: u64,
    pub inode: u64,
    pub duration: Option<f64>,
    pub checksum: Option<String>,
}

impl Observation {
    pub fn from_entry(entry: &Entry) -> Self {
        Self {
            directory: entry.path.clone(),
            name: entry.name.clone(),
            size: entry.current_size,
            inode: entry.inode,
            duration: if entry.current_duration > 0.0 {
                Some(entry.current_duration)
            } else {
                None
            },
            checksum: if entry.checksum.is_empty() {
                None
            } else {
                Some(entry.checksum.clone())
            },
        }
    }
}

/// Which strategy produced a match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    /// Same size, identical name: an unchanged file
    ExactName,
    /// Same size and inode in the same directory under a new name:
    /// renamed in place
    RelocatedInode,
    /// Same size, stored duration within the tolerance: a re-encode
    DurationTolerance,
    /// Content-hash equality regardless of name or inode
    Checksum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedMatch {
    pub position: usize,
    pub tier: MatchTier,
}

/// Tiers 1–2 only: exact name, then relocated-by-inode. This is the
/// membership test for files already known to the catalog; it never
/// needs a prober or hasher.
pub fn resolve_known(
    obs: &Observation,
    store: &EntryStore,
    size_index: &SortedIndex<u64>,
) -> Option<ResolvedMatch> {
    if let Some(position) = tier_exact_name(obs, store, size_index) {
        return Some(ResolvedMatch {
            position,
            tier: MatchTier::ExactName,
        });
    }
    if let Some(position) = tier_relocated_inode(obs, store, size_index) {
        return Some(ResolvedMatch {
            position,
            tier: MatchTier::RelocatedInode,
        });
    }
    None
}

/// The full tier sequence. Stops at the first success; a tier is never
/// skipped once reached. Within each tier the bucket is scanned in
/// ascending-size, ascending-original-index order and the first candidate
/// satisfying the predicate wins — no closest-match scoring.
pub fn resolve(
    obs: &Observation,
    store: &EntryStore,
    size_index: &SortedIndex<u64>,
    hasher: &dyn ContentHasher,
) -> Result<Option<ResolvedMatch>> {
    if let Some(matched) = resolve_known(obs, store, size_index) {
        return Ok(Some(matched));
    }
    if let Some(position) = tier_duration(obs, store, size_index) {
        return Ok(Some(ResolvedMatch {
            position,
            tier: MatchTier::DurationTolerance,
        }));
    }
    if let Some(position) = tier_checksum(obs, store, size_index, hasher)? {
        return Ok(Some(ResolvedMatch {
            position,
            tier: MatchTier::Checksum,
        }));
    }
    Ok(None)
}

/// First record in `size_index`'s bucket for `size` whose name matches.
///
/// This is the tier-1 predicate, shared with every operation that
/// addresses records by exact size + name (backup recording, restore by
/// original size, duplicate checks).
pub fn find_exact(
    store: &EntryStore,
    size_index: &SortedIndex<u64>,
    size: u64,
    name: &str,
) -> Option<usize> {
    size_index
        .bucket(&size)
        .find(|&position| store.entries()[position].name == name)
}

fn tier_exact_name(
    obs: &Observation,
    store: &EntryStore,
    size_index: &SortedIndex<u64>,
) -> Option<usize> {
    find_exact(store, size_index, obs.size, &obs.name)
}

fn tier_relocated_inode(
    obs: &Observation,
    store: &EntryStore,
    size_index: &SortedIndex<u64>,
) -> Option<usize> {
    size_index.bucket(&obs.size).find(|&position| {
        let candidate = &store.entries()[position];
        candidate.inode == obs.inode
            && candidate.path == obs.directory
            && candidate.name != obs.name
    })
}

fn tier_duration(
    obs: &Observation,
    store: &EntryStore,
    size_index: &SortedIndex<u64>,
) -> Option<usize> {
    let duration = obs.duration?;
    size_index.bucket(&obs.size).find(|&position| {
        (store.entries()[position].current_duration - duration).abs() < DURATION_TOLERANCE
    })
}

fn tier_checksum(
    obs: &Observation,
    store: &EntryStore,
    size_index: &SortedIndex<u64>,
    hasher: &dyn ContentHasher,
) -> Result<Option<usize>> {
    let mut observed_digest: Option<String> = obs.checksum.clone();

    for position in size_index.bucket(&obs.size) {
        // Hash the observation lazily, only once a candidate exists.
        if observed_digest.is_none() {
            observed_digest = Some(hasher.hash(&obs.directory.join(&obs.name))?);
        }
        let candidate = &store.entries()[position];
        let candidate_digest = if candidate.checksum.is_empty() {
            match hasher.hash(&candidate.file_path()) {
                Ok(digest) => digest,
                Err(e) => {
                    warn!("cannot hash candidate {}: {}", candidate.name, e);
                    continue;
                }
            }
        } else {
            candidate.checksum.clone()
        };
        if observed_digest.as_deref() == Some(candidate_digest.as_str()) {
            return Ok(Some(position));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use std::collections::{BTreeMap, HashMap};
    use std::path::Path;

    fn entry(name: &str, size: u64, inode: u64, duration: f64) -> Entry {
        Entry {
            uid: String::new(),
            path: PathBuf::from("/library"),
            name: name.to_string(),
            original_size: size,
            current_size: size,
            modified_at: Utc::now(),
            backup_count: 0,
            backup_paths: Vec::new(),
            original_duration: duration,
            current_duration: duration,
            inode,
            link_count: 1,
            checksum: String::new(),
            extra: BTreeMap::new(),
        }
    }

    fn obs(name: &str, size: u64, inode: u64, duration: Option<f64>) -> Observation {
        Observation {
            directory: PathBuf::from("/library"),
            name: name.to_string(),
            size,
            inode,
            duration,
            checksum: None,
        }
    }

    /// Canned digests keyed by path; panics on unexpected lookups.
    struct MapHasher(HashMap<PathBuf, String>);

    impl ContentHasher for MapHasher {
        fn hash(&self, path: &Path) -> Result<String> {
            Ok(self
                .0
                .get(path)
                .unwrap_or_else(|| panic!("unexpected hash of {}", path.display()))
                .clone())
        }
    }

    fn no_hasher() -> MapHasher {
        MapHasher(HashMap::new())
    }

    #[test]
    fn unchanged_file_matches_tier_one() {
        let store = EntryStore::new(vec![entry("a.mp4", 1000, 5, 60.0)]);
        let idx = index::by_current_size(store.entries());

        let matched = resolve(&obs("a.mp4", 1000, 5, None), &store, &idx, &no_hasher())
            .unwrap()
            .unwrap();
        assert_eq!(matched.tier, MatchTier::ExactName);
        assert_eq!(matched.position, 0);
    }

    #[test]
    fn renamed_in_place_reports_tier_two_never_three_or_four() {
        let store = EntryStore::new(vec![entry("A.mp4", 1000, 5, 60.0)]);
        let idx = index::by_current_size(store.entries());

        // Duration matches too; the inode tier must still win.
        let matched = resolve(
            &obs("B.mp4", 1000, 5, Some(60.0)),
            &store,
            &idx,
            &no_hasher(),
        )
        .unwrap()
        .unwrap();
        assert_eq!(matched.tier, MatchTier::RelocatedInode);
    }

    #[test]
    fn inode_match_requires_same_directory() {
        let store = EntryStore::new(vec![entry("A.mp4", 1000, 5, 0.0)]);
        let idx = index::by_current_size(store.entries());

        let mut observation = obs("B.mp4", 1000, 5, None);
        observation.directory = PathBuf::from("/elsewhere");
        assert_eq!(resolve_known(&observation, &store, &idx), None);
    }

    #[test]
    fn duration_boundary_is_strict() {
        let store = EntryStore::new(vec![entry("a.mp4", 1000, 1, 60.0)]);
        let idx = index::by_current_size(store.entries());

        // 0.499 under the limit matches...
        let hit = tier_duration(&obs("x.mp4", 1000, 9, Some(60.499)), &store, &idx);
        assert_eq!(hit, Some(0));

        // ...exactly 0.5 does not.
        let miss = tier_duration(&obs("x.mp4", 1000, 9, Some(60.5)), &store, &idx);
        assert_eq!(miss, None);
    }

    #[test]
    fn first_candidate_under_tolerance_wins_not_the_closest() {
        let store = EntryStore::new(vec![
            entry("far.mp4", 1000, 1, 60.4),
            entry("near.mp4", 1000, 2, 60.01),
        ]);
        let idx = index::by_current_size(store.entries());

        let matched = tier_duration(&obs("x.mp4", 1000, 9, Some(60.0)), &store, &idx).unwrap();
        assert_eq!(store.entries()[matched].name, "far.mp4");
    }

    #[test]
    fn checksum_tier_matches_regardless_of_name_and_inode() {
        let mut stored = entry("kept.mp4", 1000, 1, 0.0);
        stored.checksum = "digest-1".to_string();
        let store = EntryStore::new(vec![stored]);
        let idx = index::by_current_size(store.entries());

        let hasher = MapHasher(HashMap::from([(
            PathBuf::from("/incoming/new.mp4"),
            "digest-1".to_string(),
        )]));
        let mut observation = obs("new.mp4", 1000, 77, None);
        observation.directory = PathBuf::from("/incoming");

        let matched = resolve(&observation, &store, &idx, &hasher).unwrap().unwrap();
        assert_eq!(matched.tier, MatchTier::Checksum);
    }

    #[test]
    fn exhausted_bucket_resolves_to_no_match() {
        let store = EntryStore::new(vec![entry("a.mp4", 1000, 5, 60.0)]);
        let idx = index::by_current_size(store.entries());

        let result = resolve(&obs("b.mp4", 2000, 9, Some(10.0)), &store, &idx, &no_hasher());
        assert_eq!(result.unwrap(), None);
    }
}
