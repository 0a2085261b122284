//! Error types for mediakeep

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for mediakeep operations.
///
/// Every variant is fatal: the running tool prints the diagnostic and
/// terminates before any catalog write. Recoverable conditions (a single
/// unresolved file, an unreachable pointer directory, a duplicate-inode
/// pair) are reported through `tracing::warn!` at the call site and never
/// surface here.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV export error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Catalog not found: {path}")]
    CatalogMissing { path: PathBuf },

    #[error("Unsupported catalog version: {found} (expected {expected})")]
    CatalogVersion { found: u32, expected: u32 },

    #[error("{name} has changed size from {recorded} to {actual}")]
    SizeDrift {
        name: String,
        recorded: u64,
        actual: u64,
    },

    #[error("{path} inode {actual} does not match recorded inode {recorded}")]
    InodeMismatch {
        path: PathBuf,
        recorded: u64,
        actual: u64,
    },

    #[error("Probe failed for {path}: {reason}")]
    Probe { path: PathBuf, reason: String },

    #[error("Invalid backup pointer: {pointer}")]
    InvalidPointer { pointer: String },

    #[error("No catalog entry for {name}")]
    NoMatch { name: String },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },
}

/// Result type alias for mediakeep operations
pub type Result<T> = std::result::Result<T, Error>;
