//! Catalog follow-up after an external trim or re-encode
//!
//! The transcoder itself is out of scope; what it leaves behind is a file
//! whose container comment carries an MD tag recording the pre-transform
//! duration and size. That tag lets the catalog recover the file's
//! identity without re-running the full resolver.

use crate::index;
use crate::probe::Prober;
use crate::store::EntryStore;
use crate::{Error, Result};
use std::fs;
use std::path::Path;
use tracing::info;

/// Refresh a record from its freshly re-encoded file.
///
/// The original record is located by the MD tag's recorded size plus the
/// file's name; a file with no readable tag is fatal because its identity
/// cannot be recovered. Returns the updated record's position.
pub fn apply_reencoded(
    store: &mut EntryStore,
    target_path: &Path,
    prober: &dyn Prober,
) -> Result<usize> {
    let name = target_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let tag = prober
        .md_tag(target_path)?
        .ok_or_else(|| Error::NoMatch { name: name.clone() })?;

    let size_index = index::by_current_size(store.entries());
    let position = size_index
        .bucket(&tag.size)
        .find(|&position| store.entries()[position].name == name)
        .ok_or_else(|| Error::NoMatch { name: name.clone() })?;

    info!(
        "found original record for {}: {}",
        name,
        store.entries()[position].file_path().display()
    );

    let meta = fs::metadata(target_path)?;
    let duration = prober.duration(target_path)?;
    let record = store.get_mut(position).expect("indexed position");
    record.current_duration = duration;
    record.current_size = meta.len();

    Ok(position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Entry;
    use crate::probe::MdTag;
    use pretty_assertions::assert_eq;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    struct TaggedProber {
        tag: Option<MdTag>,
        duration: f64,
    }

    impl Prober for TaggedProber {
        fn duration(&self, _path: &Path) -> Result<f64> {
            Ok(self.duration)
        }
        fn md_tag(&self, _path: &Path) -> Result<Option<MdTag>> {
            Ok(self.tag)
        }
    }

    #[test]
    fn reencoded_file_refreshes_current_fields() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("clip.mp4");
        File::create(&path)?.write_all(b"original ten")?;
        let entry = Entry::from_path(&path, None)?;
        let recorded_size = entry.current_size;
        let mut store = EntryStore::new(vec![entry]);

        // The transcoder shrank the file and stamped the old baseline.
        File::create(&path)?.write_all(b"small")?;
        let prober = TaggedProber {
            tag: Some(MdTag {
                duration: 120.0,
                size: recorded_size,
            }),
            duration: 88.8,
        };

        let position = apply_reencoded(&mut store, &path, &prober)?;
        let record = store.get(position).unwrap();
        assert_eq!(record.current_size, 5);
        assert_eq!(record.current_duration, 88.8);
        assert_eq!(record.original_size, recorded_size);
        Ok(())
    }

    #[test]
    fn missing_tag_is_fatal() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("clip.mp4");
        File::create(&path)?.write_all(b"bytes")?;
        let mut store = EntryStore::default();

        let prober = TaggedProber {
            tag: None,
            duration: 0.0,
        };
        assert!(matches!(
            apply_reencoded(&mut store, &path, &prober),
            Err(Error::NoMatch { .. })
        ));
        Ok(())
    }
}
