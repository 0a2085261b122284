//! Catalog integrity command implementation.

use super::{CommonOpts, ToolContext};
use crate::check::check_catalog;
use crate::store::EntryStore;
use crate::Result;
use clap::Args;

/// Arguments for the check command
#[derive(Args)]
pub struct CheckArgs {
    /// Apply repairs that need no human judgement
    #[arg(short = 'f', long)]
    pub fix: bool,
}

/// Run the check command
pub fn run(args: CheckArgs, common: &CommonOpts) -> Result<()> {
    let ctx = ToolContext::from_common(common)?;
    let mut store = EntryStore::load(&ctx.catalog_path)?;
    println!("{} records loaded", store.len());

    let report = check_catalog(&mut store, args.fix)?;
    for defect in &report.defects {
        println!("{}", defect);
    }
    println!("{} records checked, {} defects", store.len(), report.defects.len());

    if report.changed {
        ctx.save_catalog(&mut store)?;
    }
    Ok(())
}
