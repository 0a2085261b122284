//! Backup pointer text codec
//!
//! A backup pointer names one secondary copy of a record's content as
//! `"<normalized-absolute-directory>[<inode>]"`. The encoded string is the
//! one bit-exact on-the-wire format in the catalog; every consumer must go
//! through this codec rather than re-deriving the layout. Equality between
//! pointers is equality of the encoded strings.

use crate::{Error, Result};
use std::path::{Component, Path, PathBuf};

/// Encode a backup directory and inode into a pointer string.
///
/// The directory is normalized first, so encoding the same location
/// spelled different ways yields the same pointer.
pub fn encode(directory: &Path, inode: u64) -> String {
    format!("{}[{}]", normalize(directory).display(), inode)
}

/// Decode a pointer into its directory and inode.
///
/// Tolerant of un-normalized directory text: the directory component is
/// cleaned lexically, so `decode(encode(d, i)) == (normalize(d), i)`.
pub fn decode(pointer: &str) -> Result<(PathBuf, u64)> {
    let open = pointer.rfind('[').ok_or_else(|| Error::InvalidPointer {
        pointer: pointer.to_string(),
    })?;
    let close = pointer.rfind(']').ok_or_else(|| Error::InvalidPointer {
        pointer: pointer.to_string(),
    })?;
    if close < open {
        return Err(Error::InvalidPointer {
            pointer: pointer.to_string(),
        });
    }
    let inode: u64 = pointer[open + 1..close]
        .parse()
        .map_err(|_| Error::InvalidPointer {
            pointer: pointer.to_string(),
        })?;
    Ok((clean(Path::new(&pointer[..open])), inode))
}

/// Normalize a directory to an absolute, symlink-resolved path.
///
/// `~` is expanded, relative paths are anchored at the current directory,
/// and symlinks are resolved when the path exists on disk. Paths that do
/// not (yet) exist fall back to lexical cleanup only, which keeps
/// normalization idempotent either way.
pub fn normalize(directory: &Path) -> PathBuf {
    let expanded = expand_home(directory);
    let absolute = if expanded.is_absolute() {
        expanded
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(&expanded))
            .unwrap_or(expanded)
    };
    match absolute.canonicalize() {
        Ok(resolved) => resolved,
        Err(_) => clean(&absolute),
    }
}

fn expand_home(path: &Path) -> PathBuf {
    let mut components = path.components();
    if let Some(Component::Normal(first)) = components.next() {
        if first == "~" {
            if let Some(dirs) = directories::BaseDirs::new() {
                return dirs.home_dir().join(components.as_path());
            }
        }
    }
    path.to_path_buf()
}

/// Lexical path cleanup: drop `.` segments, fold `..` onto the parent.
fn clean(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !cleaned.pop() {
                    cleaned.push(Component::ParentDir);
                }
            }
            other => cleaned.push(other),
        }
    }
    cleaned
}
