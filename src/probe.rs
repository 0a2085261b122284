//! External collaborators: duration probe, MD tag reader, content hash
//!
//! The media prober and the hash function are black boxes to the rest of
//! the crate. They sit behind traits so operations stay testable without a
//! working `ffprobe` on the machine running the tests.

use crate::{Error, Result};
use blake3::Hasher;
use std::fs::File;
use std::io;
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// Marker written into a file's container comment field when it is
/// trimmed or re-encoded, recording its pre-transform baseline.
pub const MD_TAG_HEADER: &str = "###MDV1###";

/// Pre-transform baseline recovered from an embedded MD tag
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MdTag {
    pub duration: f64,
    pub size: u64,
}

/// Playback metadata probe for media files
pub trait Prober {
    /// Playback duration in seconds
    fn duration(&self, path: &Path) -> Result<f64>;
    /// Embedded MD tag, `None` when absent or malformed
    fn md_tag(&self, path: &Path) -> Result<Option<MdTag>>;
}

/// Deterministic content hash; one algorithm for the catalog's lifetime.
/// Mixing algorithms silently breaks content-match identity, so there is
/// exactly one production implementation.
pub trait ContentHasher {
    fn hash(&self, path: &Path) -> Result<String>;
}

/// Parse the fixed-format MD tag out of a container comment string.
///
/// The header must open the comment; anything else, or a value that does
/// not parse, yields `None`.
pub fn parse_md_tag(comment: &str) -> Option<MdTag> {
    let body = comment.strip_prefix(MD_TAG_HEADER)?;
    let mut fields = body.trim_start().split(' ');
    let duration: f64 = fields.next()?.parse().ok()?;
    let size: u64 = fields.next()?.parse().ok()?;
    Some(MdTag { duration, size })
}

/// Production prober shelling out to `ffprobe`
pub struct Ffprobe;

impl Ffprobe {
    pub fn new() -> Self {
        Self
    }

    fn format_entry(&self, path: &Path, entry: &str) -> Result<String> {
        debug!("ffprobe {} for {}", entry, path.display());
        let output = Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-show_entries",
                entry,
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(path)
            .output()
            .map_err(|e| Error::Probe {
                path: path.to_path_buf(),
                reason: format!("failed to execute ffprobe: {}", e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Probe {
                path: path.to_path_buf(),
                reason: stderr.trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl Default for Ffprobe {
    fn default() -> Self {
        Self::new()
    }
}

impl Prober for Ffprobe {
    fn duration(&self, path: &Path) -> Result<f64> {
        let raw = self.format_entry(path, "format=duration")?;
        raw.parse().map_err(|_| Error::Probe {
            path: path.to_path_buf(),
            reason: format!("no decodable duration: {:?}", raw),
        })
    }

    fn md_tag(&self, path: &Path) -> Result<Option<MdTag>> {
        let comment = self.format_entry(path, "format_tags=comment")?;
        Ok(parse_md_tag(&comment))
    }
}

/// Streaming BLAKE3 content hash
pub struct Blake3Hasher;

impl Blake3Hasher {
    pub fn new() -> Self {
        Self
    }
}

impl Default for Blake3Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentHasher for Blake3Hasher {
    fn hash(&self, path: &Path) -> Result<String> {
        let mut file = File::open(path)?;
        let mut hasher = Hasher::new();
        io::copy(&mut file, &mut hasher)?;
        Ok(hasher.finalize().to_hex().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn md_tag_parses_duration_and_size() {
        let tag = parse_md_tag("###MDV1### 123.45 987654").unwrap();
        assert_eq!(tag.duration, 123.45);
        assert_eq!(tag.size, 987654);
    }

    #[test]
    fn md_tag_requires_leading_header() {
        assert_eq!(parse_md_tag("note ###MDV1### 1.0 2"), None);
        assert_eq!(parse_md_tag("no tag here"), None);
        assert_eq!(parse_md_tag(""), None);
    }

    #[test]
    fn md_tag_rejects_malformed_values() {
        assert_eq!(parse_md_tag("###MDV1### abc 123"), None);
        assert_eq!(parse_md_tag("###MDV1### 1.5"), None);
        assert_eq!(parse_md_tag("###MDV1### 1.5 notasize"), None);
    }

    #[test]
    fn blake3_hash_matches_known_digest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.bin");
        File::create(&path).unwrap().write_all(b"hello world").unwrap();

        let digest = Blake3Hasher::new().hash(&path).unwrap();
        assert_eq!(
            digest,
            "d74981efa70a0c880b8d8c1985d075dbcbf679b99a5f9914e5aaf96b831a9e24"
        );
    }

    #[test]
    fn identical_content_hashes_identically() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.mp4");
        let b = dir.path().join("b.mp4");
        File::create(&a).unwrap().write_all(b"same bytes").unwrap();
        File::create(&b).unwrap().write_all(b"same bytes").unwrap();

        let hasher = Blake3Hasher::new();
        assert_eq!(hasher.hash(&a).unwrap(), hasher.hash(&b).unwrap());
    }
}
