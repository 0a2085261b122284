//! Backup lifecycle command implementation.

use super::{CommonOpts, ToolContext};
use crate::backup::BackupReconciler;
use crate::probe::{Blake3Hasher, Ffprobe};
use crate::store::EntryStore;
use crate::Result;
use clap::{Args, Subcommand};
use std::path::PathBuf;

/// Arguments for the backup command
#[derive(Args)]
pub struct BackupArgs {
    #[command(subcommand)]
    pub operation: BackupOp,
}

#[derive(Subcommand)]
pub enum BackupOp {
    /// Record the copies found in a backup directory onto their records
    Record {
        /// Backup directory to scan
        backup_dir: PathBuf,
    },
    /// List backup files with no catalog match, for manual disposition
    Verify {
        /// Backup directory to scan
        backup_dir: PathBuf,
    },
    /// Remove backup copies belonging to fully-deleted records
    Delete {
        /// Backup directory to clean
        backup_dir: PathBuf,
        /// Catalog of deleted records (defaults to the configured path)
        #[arg(long)]
        deleted_catalog: Option<PathBuf>,
    },
    /// Restore lost or corrupted originals from their backup copies
    Restore {
        /// Backup directory holding the copies to restore from
        backup_dir: PathBuf,
    },
    /// Re-copy primaries whose backup copy has vanished
    Recreate {
        /// Backup directory to repopulate
        backup_dir: PathBuf,
    },
}

/// Run the backup command
pub fn run(args: BackupArgs, common: &CommonOpts) -> Result<()> {
    let ctx = ToolContext::from_common(common)?;
    let prober = Ffprobe::new();
    let hasher = Blake3Hasher::new();
    let engine = BackupReconciler::new(&prober, &hasher, ctx.opts);

    match args.operation {
        BackupOp::Record { backup_dir } => {
            let mut store = EntryStore::load(&ctx.catalog_path)?;
            let changed = engine.record(&mut store, &backup_dir, &ctx.config)?;
            println!("{} records updated", changed);
            ctx.save_catalog(&mut store)?;
        }
        BackupOp::Verify { backup_dir } => {
            let store = EntryStore::load(&ctx.catalog_path)?;
            let unmatched = engine.verify(&store, &backup_dir, &ctx.config)?;
            for item in &unmatched {
                println!("{} - {:.1}s ({} bytes)", item.name, item.duration, item.size);
                if item.candidates.is_empty() {
                    println!("    no duration matches in the catalog");
                }
                for candidate in &item.candidates {
                    println!("    {} - {:.1}s", candidate.name, candidate.duration);
                }
            }
            println!("{} unmatched backup files", unmatched.len());
        }
        BackupOp::Delete {
            backup_dir,
            deleted_catalog,
        } => {
            let deleted_path =
                deleted_catalog.unwrap_or_else(|| ctx.config.catalog.deleted_path.clone());
            let deleted = EntryStore::load(&deleted_path)?;
            println!("{} deleted records loaded", deleted.len());
            let removed = engine.delete(&deleted, &backup_dir, &ctx.config)?;
            println!("{} backup files removed", removed);
        }
        BackupOp::Restore { backup_dir } => {
            let mut store = EntryStore::load(&ctx.catalog_path)?;
            let restored = engine.restore(&mut store, &backup_dir, &ctx.config)?;
            println!("{} records restored", restored);
            ctx.save_catalog(&mut store)?;
        }
        BackupOp::Recreate { backup_dir } => {
            let mut store = EntryStore::load(&ctx.catalog_path)?;
            let changed = engine.recreate(&mut store, &backup_dir)?;
            println!("{} backup pointers rewritten", changed);
            ctx.save_catalog(&mut store)?;
        }
    }
    Ok(())
}
