//! # mediakeep
//!
//! Media catalog maintenance suite with tiered identity resolution and
//! backup-copy tracking.
//!
//! The catalog tracks a large collection of media files across a primary
//! library and one or more backup directories, and keeps its records
//! consistent as files are renamed, trimmed, re-encoded, duplicated,
//! backed up, lost, or deleted. The hard part is identity: every
//! attribute that normally names a file (name, size, duration, inode)
//! can change independently over its life, so matching runs through a
//! fixed sequence of strategies instead of trusting any one of them.
//!
//! Every tool performs one whole-catalog load → compute → save cycle;
//! two invocations must not run concurrently against the same catalog
//! path (last writer wins).

pub mod backup;
pub mod check;
pub mod cli;
pub mod codec;
pub mod config;
pub mod dupes;
pub mod entry;
pub mod error;
pub mod fsops;
pub mod index;
pub mod logging;
pub mod probe;
pub mod reconcile;
pub mod reencode;
pub mod retire;
pub mod resolver;
pub mod scan;
pub mod store;

// Re-export commonly used types
pub use backup::BackupReconciler;
pub use config::{Config, RunOptions};
pub use dupes::{DuplicateDetector, KeepPolicy};
pub use entry::Entry;
pub use error::{Error, Result};
pub use reconcile::Reconciler;
pub use store::EntryStore;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
