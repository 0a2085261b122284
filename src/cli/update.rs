//! Update (reconciliation) command implementation.

use super::{CommonOpts, ToolContext};
use crate::probe::Ffprobe;
use crate::reconcile::Reconciler;
use crate::store::{quarantine_path, EntryStore};
use crate::Result;
use clap::Args;
use std::path::PathBuf;

/// Arguments for the update command
#[derive(Args)]
pub struct UpdateArgs {
    /// Library directories to reconcile against the catalog
    #[arg(required = true)]
    pub target_dirs: Vec<PathBuf>,
}

/// Run the update command
pub fn run(args: UpdateArgs, common: &CommonOpts) -> Result<()> {
    let ctx = ToolContext::from_common(common)?;
    let mut store = EntryStore::load_or_empty(&ctx.catalog_path)?;
    store.sort_by_current_size();
    println!("{} records loaded", store.len());

    let mut quarantine = EntryStore::load_or_empty(&quarantine_path(&ctx.catalog_path))?
        .entries()
        .to_vec();

    let prober = Ffprobe::new();
    let engine = Reconciler::new(&prober);
    engine.check_fs_status(&mut store, &mut quarantine)?;

    let mut files = Vec::new();
    for dir in &args.target_dirs {
        println!("scanning {}...", dir.display());
        files.extend(crate::scan::media_paths(dir, &ctx.config)?);
    }
    println!("{} target files found", files.len());

    let stats = engine.process_targets(&mut store, &mut quarantine, &files)?;
    println!(
        "{} unchanged, {} renamed, {} reunited, {} created",
        stats.unchanged, stats.renamed, stats.reunited, stats.created
    );

    ctx.save_catalog(&mut store)?;
    if !ctx.opts.dry_run {
        let mut quarantine_store = EntryStore::new(quarantine);
        quarantine_store.sort_by_current_size();
        quarantine_store.save(&quarantine_path(&ctx.output_path))?;
    }
    Ok(())
}
