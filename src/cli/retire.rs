//! Record retirement command implementation.

use super::{CommonOpts, ToolContext};
use crate::retire::retire_entries;
use crate::store::EntryStore;
use crate::Result;
use clap::Args;
use std::path::PathBuf;

/// Arguments for the retire command
#[derive(Args)]
pub struct RetireArgs {
    /// Directory of files staged for deletion
    pub staging_dir: PathBuf,

    /// Deleted catalog to append to (defaults to the configured path)
    #[arg(long)]
    pub deleted_catalog: Option<PathBuf>,
}

/// Run the retire command
pub fn run(args: RetireArgs, common: &CommonOpts) -> Result<()> {
    let ctx = ToolContext::from_common(common)?;
    let mut store = EntryStore::load(&ctx.catalog_path)?;
    println!("{} records loaded", store.len());

    let deleted_path = args
        .deleted_catalog
        .unwrap_or_else(|| ctx.config.catalog.deleted_path.clone());
    let mut deleted = EntryStore::load_or_empty(&deleted_path)?;

    let retired = retire_entries(
        &mut store,
        &mut deleted,
        &args.staging_dir,
        &ctx.config,
        &ctx.opts,
    )?;
    println!("{} records retired", retired);

    if retired > 0 {
        ctx.save_catalog(&mut store)?;
    }
    if !ctx.opts.dry_run {
        deleted.sort_by_current_size();
        deleted.save(&deleted_path)?;
    }
    Ok(())
}
