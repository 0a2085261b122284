//! Command-line interface for mediakeep.
//!
//! Thin clap layer over the library: every subcommand performs one
//! whole-catalog load → compute → save cycle, and a fatal error
//! terminates before the save so a half-updated catalog is never
//! written.

use crate::config::{Config, RunOptions};
use crate::store::EntryStore;
use crate::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

pub mod backup;
pub mod check;
pub mod dupes;
pub mod export;
pub mod reencoded;
pub mod retire;
pub mod update;

/// mediakeep - media catalog maintenance suite
#[derive(Parser)]
#[command(name = "mediakeep")]
#[command(about = "Media catalog maintenance with tiered identity resolution")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(flatten)]
    pub common: CommonOpts,

    #[command(subcommand)]
    pub command: Commands,
}

/// Flags shared by every subcommand
#[derive(Args)]
pub struct CommonOpts {
    /// Catalog file (defaults to the configured path)
    #[arg(short = 'i', long, global = true)]
    pub catalog: Option<PathBuf>,

    /// Write the updated catalog here instead of back to the input
    #[arg(short = 'o', long, global = true)]
    pub output: Option<PathBuf>,

    /// Perform no filesystem or catalog mutation, but run every
    /// read-only step
    #[arg(short = 'n', long, global = true)]
    pub dry_run: bool,

    /// Verbose diagnostics
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Also write the CSV derivative next to the catalog
    #[arg(long, global = true)]
    pub csv: bool,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Reconcile the catalog against one or more library directories
    Update(update::UpdateArgs),
    /// Backup-copy lifecycle operations
    Backup(backup::BackupArgs),
    /// Check a directory for duplicates of cataloged content
    Dupes(dupes::DupesArgs),
    /// Check catalog integrity, optionally repairing defects
    Check(check::CheckArgs),
    /// Refresh a record after an external trim or re-encode
    Reencoded(reencoded::ReencodedArgs),
    /// Retire staged records into the deleted catalog
    Retire(retire::RetireArgs),
    /// Write the one-way CSV derivative of the catalog
    Export(export::ExportArgs),
}

/// Everything a subcommand needs from the environment
pub struct ToolContext {
    pub config: Config,
    pub opts: RunOptions,
    pub catalog_path: PathBuf,
    pub output_path: PathBuf,
    pub write_csv: bool,
}

impl ToolContext {
    pub fn from_common(common: &CommonOpts) -> Result<Self> {
        let config = Config::load()?;
        let catalog_path = common
            .catalog
            .clone()
            .unwrap_or_else(|| config.catalog.path.clone());
        let output_path = common.output.clone().unwrap_or_else(|| catalog_path.clone());
        Ok(Self {
            config,
            opts: RunOptions {
                dry_run: common.dry_run,
                verbose: common.verbose,
            },
            catalog_path,
            output_path,
            write_csv: common.csv,
        })
    }

    /// Persist the catalog in canonical order, honoring dry-run.
    pub fn save_catalog(&self, store: &mut EntryStore) -> Result<()> {
        store.sort_by_current_size();
        if self.opts.dry_run {
            info!(
                "dry run: {} records not written to {}",
                store.len(),
                self.output_path.display()
            );
            return Ok(());
        }
        store.save(&self.output_path)?;
        info!("{} records written", store.len());
        if self.write_csv {
            let csv_path = self.output_path.with_extension("csv");
            store.export_csv(&csv_path)?;
            info!("CSV derivative written to {}", csv_path.display());
        }
        Ok(())
    }
}
