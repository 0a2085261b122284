//! CSV export command implementation.

use super::{CommonOpts, ToolContext};
use crate::store::EntryStore;
use crate::Result;
use clap::Args;
use std::path::PathBuf;

/// Arguments for the export command
#[derive(Args)]
pub struct ExportArgs {
    /// Where to write the CSV (defaults to the catalog path with a .csv
    /// extension)
    #[arg(long)]
    pub output_csv: Option<PathBuf>,
}

/// Run the export command
pub fn run(args: ExportArgs, common: &CommonOpts) -> Result<()> {
    let ctx = ToolContext::from_common(common)?;
    let store = EntryStore::load(&ctx.catalog_path)?;

    let csv_path = args
        .output_csv
        .unwrap_or_else(|| ctx.catalog_path.with_extension("csv"));
    store.export_csv(&csv_path)?;
    println!("{} records exported to {}", store.len(), csv_path.display());
    Ok(())
}
