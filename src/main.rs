//! mediakeep - media catalog maintenance suite
//!
//! Main binary entry point for the command-line interface.

use clap::Parser;
use mediakeep::cli::{self, Cli, Commands};
use mediakeep::logging;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init_logging(cli.common.verbose) {
        eprintln!("failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    let result = match cli.command {
        Commands::Update(args) => cli::update::run(args, &cli.common),
        Commands::Backup(args) => cli::backup::run(args, &cli.common),
        Commands::Dupes(args) => cli::dupes::run(args, &cli.common),
        Commands::Check(args) => cli::check::run(args, &cli.common),
        Commands::Reencoded(args) => cli::reencoded::run(args, &cli.common),
        Commands::Retire(args) => cli::retire::run(args, &cli.common),
        Commands::Export(args) => cli::export::run(args, &cli.common),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
