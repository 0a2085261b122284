//! Configuration for mediakeep tools

use crate::{Error, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Per-invocation flags, threaded explicitly through every operation.
///
/// With `dry_run` set every destructive filesystem action is suppressed
/// while all read-only steps (matching, hashing, reporting) still run, so
/// a dry run is a faithful preview of the real one.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub dry_run: bool,
    pub verbose: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub catalog: CatalogConfig,
    pub library: LibraryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Master catalog file
    pub path: PathBuf,
    /// Side catalog of explicitly deleted records, kept for backup cleanup
    pub deleted_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// File extensions treated as media files
    pub extensions: Vec<String>,
    /// Holding directory name for displaced files, created inside the
    /// directory being operated on
    pub trash_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog: CatalogConfig {
                path: PathBuf::from("master_catalog.json"),
                deleted_path: PathBuf::from("deleted_catalog.json"),
            },
            library: LibraryConfig {
                extensions: vec!["mp4".to_string(), "mp4~".to_string()],
                trash_dir: "DelLinks".to_string(),
            },
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = fs::read_to_string(&config_path)?;
            let config = toml::from_str(&content).map_err(|e| Error::Config {
                reason: format!("failed to parse config: {}", e),
            })?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| Error::Config {
            reason: format!("failed to serialize config: {}", e),
        })?;

        fs::write(&config_path, content)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let project_dirs = ProjectDirs::from("", "", "mediakeep").ok_or_else(|| Error::Config {
            reason: "could not determine config directory".to_string(),
        })?;

        Ok(project_dirs.config_dir().join("config.toml"))
    }

    /// Whether a file name carries one of the configured media extensions
    pub fn is_media_name(&self, name: &str) -> bool {
        self.library
            .extensions
            .iter()
            .any(|ext| name.ends_with(&format!(".{}", ext)))
    }
}
