//! Re-encode follow-up command implementation.

use super::{CommonOpts, ToolContext};
use crate::probe::Ffprobe;
use crate::reencode::apply_reencoded;
use crate::store::EntryStore;
use crate::Result;
use clap::Args;
use std::path::PathBuf;

/// Arguments for the reencoded command
#[derive(Args)]
pub struct ReencodedArgs {
    /// The freshly trimmed or re-encoded file
    pub target_file: PathBuf,
}

/// Run the reencoded command
pub fn run(args: ReencodedArgs, common: &CommonOpts) -> Result<()> {
    let ctx = ToolContext::from_common(common)?;
    let mut store = EntryStore::load(&ctx.catalog_path)?;

    let prober = Ffprobe::new();
    let position = apply_reencoded(&mut store, &args.target_file, &prober)?;
    println!(
        "updated record: {}",
        store.entries()[position].file_path().display()
    );

    ctx.save_catalog(&mut store)?;
    Ok(())
}
