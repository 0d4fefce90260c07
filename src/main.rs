//! shelfprune - duplicate tagger & pruner for remote audiobook catalogs.
//!
//! Entry point for the CLI.

use clap::Parser;
use shelfprune::{cli::Cli, error::ExitCode, run_app};

fn main() {
    let cli = Cli::parse();

    match run_app(&cli) {
        Ok(code) => std::process::exit(code.as_i32()),
        Err(err) => {
            eprintln!("Error: {err:#}");
            std::process::exit(ExitCode::GeneralError.as_i32());
        }
    }
}
