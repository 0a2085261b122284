//! Duplicate-check command implementation.

use super::{CommonOpts, ToolContext};
use crate::dupes::{DuplicateDetector, KeepPolicy};
use crate::probe::Blake3Hasher;
use crate::store::EntryStore;
use crate::Result;
use clap::Args;
use std::path::PathBuf;

/// Arguments for the dupes command
#[derive(Args)]
pub struct DupesArgs {
    /// Directory of candidate files to check against the catalog
    pub target_dir: PathBuf,

    /// Keep the incoming file and move the catalog's copy to holding
    #[arg(short = 'm', long)]
    pub keep_incoming: bool,
}

/// Run the dupes command
pub fn run(args: DupesArgs, common: &CommonOpts) -> Result<()> {
    let ctx = ToolContext::from_common(common)?;
    let store = EntryStore::load(&ctx.catalog_path)?;
    println!("{} records loaded", store.len());

    let policy = if args.keep_incoming {
        KeepPolicy::KeepIncoming
    } else {
        KeepPolicy::KeepOriginal
    };
    let hasher = Blake3Hasher::new();
    let detector = DuplicateDetector::new(&hasher, ctx.opts);

    let hits = detector.scan_directory(&store, &args.target_dir, &ctx.config, policy)?;
    for hit in &hits {
        println!(
            "{} duplicates {}",
            hit.candidate_file.display(),
            hit.catalog_file.display()
        );
    }
    println!("{} duplicates found", hits.len());
    Ok(())
}
