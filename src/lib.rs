//! shelfprune - duplicate tagger & pruner for remote audiobook catalogs.
//!
//! Finds duplicate books in an Audiobookshelf-compatible catalog by
//! normalized metadata key (title, optionally author or series), tags the
//! extra copies, and optionally prunes them: a format-based keep/delete
//! decision per duplicate set, followed by a safety-railed file operation
//! (move to trash or permanent removal) and the catalog delete. Dry-run by
//! default; `--apply` performs the changes.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod prune;
pub mod report;

use std::io;

use anyhow::{Context, Result};

use crate::catalog::http::HttpCatalog;
use crate::catalog::{select_libraries, CatalogClient};
use crate::cli::{Cli, StdinPrompt};
use crate::config::Options;
use crate::error::ExitCode;
use crate::prune::fileops::DeleteFilesMode;
use crate::prune::Orchestrator;
use crate::report::RunResult;

/// Run the application and return the exit code to report.
///
/// # Errors
///
/// Fails on configuration errors and on catalog connectivity failures;
/// everything downstream is recorded in the run result instead.
pub fn run_app(cli: &Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    let options = Options::load(cli)?;

    if options.delete_files != DeleteFilesMode::Off && options.allow_roots.is_empty() {
        log::warn!(
            "delete_files is enabled but allow_roots is empty; all file ops will be skipped for safety"
        );
    }

    let catalog = HttpCatalog::new(
        options.base_url.as_deref().unwrap_or_default(),
        options.token.as_deref().unwrap_or_default(),
        options.insecure,
    )
    .context("failed to build catalog client")?;

    let all_libraries = catalog
        .list_libraries()
        .context("failed to fetch libraries")?;
    let book_total = all_libraries.iter().filter(|l| l.is_book()).count();
    let chosen = select_libraries(&all_libraries, &options.libraries);
    if chosen.is_empty() {
        log::warn!("No book libraries selected (use --libraries ALL or names/ids)");
        return Ok(ExitCode::NoDuplicates);
    }

    let mut result = RunResult {
        dry_run: !options.apply,
        prune: options.prune,
        libraries_total: book_total,
        ..Default::default()
    };

    let orchestrator = Orchestrator::new(&catalog, &options);
    let mut prompt = StdinPrompt;
    for library in &chosen {
        result
            .libraries
            .push(orchestrator.process_library(library, &mut prompt));
    }

    report::render(&result, &options.tag, &mut io::stdout())
        .context("failed to render report")?;

    Ok(if result.errors_total() > 0 {
        ExitCode::PartialSuccess
    } else if result.dupe_sets_total() == 0 {
        ExitCode::NoDuplicates
    } else {
        ExitCode::Success
    })
}
