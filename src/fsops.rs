//! Gated filesystem mutations
//!
//! Every unlink, move, and overwrite in the crate funnels through these
//! helpers so the dry-run flag is honored in one place. A dry run logs
//! the action it would have taken and touches nothing.

use crate::config::RunOptions;
use crate::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Move a file, falling back to copy + unlink across filesystems.
pub fn move_file(source: &Path, target: &Path, opts: &RunOptions) -> Result<()> {
    info!("move {} -> {}", source.display(), target.display());
    if opts.dry_run {
        return Ok(());
    }
    if fs::rename(source, target).is_err() {
        fs::copy(source, target)?;
        fs::remove_file(source)?;
    }
    Ok(())
}

/// Copy a file, overwriting any existing target.
pub fn copy_file(source: &Path, target: &Path, opts: &RunOptions) -> Result<()> {
    info!("copy {} -> {}", source.display(), target.display());
    if opts.dry_run {
        return Ok(());
    }
    fs::copy(source, target)?;
    Ok(())
}

/// Unlink a file. A target already gone is not an error.
pub fn remove_file(path: &Path, opts: &RunOptions) -> Result<()> {
    info!("unlink {}", path.display());
    if opts.dry_run {
        return Ok(());
    }
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Move a file into a holding directory next to it, creating the
/// directory on first use. Returns the file's new location.
pub fn trash_file(path: &Path, trash_dir: &Path, opts: &RunOptions) -> Result<PathBuf> {
    if !trash_dir.exists() && !opts.dry_run {
        fs::create_dir_all(trash_dir)?;
    }
    let target = trash_dir.join(path.file_name().unwrap_or_default());
    move_file(path, &target, opts)?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn write(path: &Path, content: &[u8]) {
        File::create(path).unwrap().write_all(content).unwrap();
    }

    #[test]
    fn dry_run_performs_no_mutation() -> Result<()> {
        let dir = TempDir::new()?;
        let source = dir.path().join("a.mp4");
        write(&source, b"payload");
        let opts = RunOptions {
            dry_run: true,
            verbose: false,
        };

        move_file(&source, &dir.path().join("b.mp4"), &opts)?;
        assert!(source.exists());

        remove_file(&source, &opts)?;
        assert!(source.exists());

        let trash = dir.path().join("DelLinks");
        trash_file(&source, &trash, &opts)?;
        assert!(source.exists());
        assert!(!trash.exists());
        Ok(())
    }

    #[test]
    fn trash_file_creates_holding_dir_and_moves() -> Result<()> {
        let dir = TempDir::new()?;
        let source = dir.path().join("a.mp4");
        write(&source, b"payload");
        let trash = dir.path().join("DelLinks");
        let opts = RunOptions::default();

        let landed = trash_file(&source, &trash, &opts)?;
        assert!(!source.exists());
        assert_eq!(landed, trash.join("a.mp4"));
        assert!(landed.exists());
        Ok(())
    }

    #[test]
    fn remove_file_tolerates_missing_target() -> Result<()> {
        let dir = TempDir::new()?;
        remove_file(&dir.path().join("gone.mp4"), &RunOptions::default())?;
        Ok(())
    }
}
