//! Command-line interface for shelfprune.
//!
//! All flags are optional overrides on top of the config file and
//! environment layers; see [`crate::config`] for the merge order.
//!
//! # Example
//!
//! ```bash
//! # Dry-run: report duplicate books across all book libraries
//! shelfprune --base-url https://abs.local --token $TOKEN
//!
//! # Tag and prune automatically, trashing files under a safe root
//! shelfprune --prune --assume-yes --apply \
//!     --delete-files trash \
//!     --allow-roots /mnt/user/audiobooks \
//!     --path-map /audiobooks=/mnt/user/audiobooks
//! ```

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;

use crate::duplicates::resolver::DuplicateSet;
use crate::duplicates::GroupMode;
use crate::error::PruneError;
use crate::prune::decision::KeepPrompt;
use crate::prune::fileops::{DeleteFilesMode, PathMapRule};

/// Tag and prune duplicate books in a remote audiobook catalog.
#[derive(Debug, Parser)]
#[command(name = "shelfprune")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to a TOML config file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Catalog base URL, e.g. https://abs.example.org
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Catalog API token
    #[arg(long, value_name = "TOKEN")]
    pub token: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long)]
    pub insecure: bool,

    /// Libraries to process: ids or exact names, or ALL for every book
    /// library
    #[arg(long, value_name = "LIB", value_delimiter = ',')]
    pub libraries: Vec<String>,

    /// Grouping mode: title, title+author or title+series
    #[arg(long, value_name = "MODE")]
    pub by: Option<GroupMode>,

    /// Compare metadata case-sensitively
    #[arg(long)]
    pub case_sensitive: bool,

    /// Do NOT use the catalog's prefix-stripped title when grouping
    #[arg(long)]
    pub no_ignore_prefixes: bool,

    /// Duplicate tag text (default: "Duplicate")
    #[arg(long, value_name = "TAG")]
    pub tag: Option<String>,

    /// Tag ALL copies, including the kept copy
    #[arg(long)]
    pub tag_all: bool,

    /// Enable the deletion workflow
    #[arg(long)]
    pub prune: bool,

    /// Skip prompts; decide from --preferred-formats
    #[arg(short = 'y', long)]
    pub assume_yes: bool,

    /// Comma-separated format priority, e.g. "m4b,mp3"
    #[arg(long, value_name = "FMT", value_delimiter = ',')]
    pub preferred_formats: Vec<String>,

    /// Remove the duplicate tag from the kept copy after pruning
    #[arg(long)]
    pub clean_tags_after_prune: bool,

    /// Write changes (default: dry run)
    #[arg(long)]
    pub apply: bool,

    /// What to do with files of removed items: off, trash or remove
    #[arg(long, value_name = "MODE")]
    pub delete_files: Option<DeleteFilesMode>,

    /// Where trashed items land when --delete-files trash
    #[arg(long, value_name = "PATH")]
    pub trash_dir: Option<PathBuf>,

    /// Safe root to operate within (repeatable)
    #[arg(long = "allow-roots", value_name = "PATH")]
    pub allow_roots: Vec<PathBuf>,

    /// src=dest prefix pair remapping catalog paths to host paths
    /// (repeatable)
    #[arg(long = "path-map", value_name = "SRC=DEST")]
    pub path_map: Vec<PathMapRule>,
}

/// Interactive keep-target prompt on stdin/stderr.
///
/// Lists each copy with its resolved format and reads a 1-based choice;
/// an empty answer takes the suggested default (the keeper-by-date).
pub struct StdinPrompt;

impl StdinPrompt {
    fn choose_from<R: BufRead, W: Write>(
        set: &DuplicateSet,
        formats: &[(String, String)],
        default_id: &str,
        input: &mut R,
        output: &mut W,
    ) -> Result<String, PruneError> {
        let title = &set.items[0].title;
        let _ = writeln!(
            output,
            "Found a duplicate book: '{title}' ({} copies). Which would you like to keep?",
            set.len()
        );
        for (i, (id, format)) in formats.iter().enumerate() {
            let marker = if id == default_id { " (default)" } else { "" };
            let _ = writeln!(output, "  {}. {format} [{id}]{marker}", i + 1);
        }

        loop {
            let _ = write!(output, "Keep [1-{}]: ", formats.len());
            let _ = output.flush();

            let mut line = String::new();
            let read = input.read_line(&mut line).map_err(|_| PruneError::Input {
                item_id: default_id.to_string(),
                field: "keep choice",
            })?;
            if read == 0 {
                // EOF: no valid choice obtainable.
                return Err(PruneError::Input {
                    item_id: default_id.to_string(),
                    field: "keep choice",
                });
            }

            let answer = line.trim();
            if answer.is_empty() {
                return Ok(default_id.to_string());
            }
            if let Ok(n) = answer.parse::<usize>() {
                if (1..=formats.len()).contains(&n) {
                    return Ok(formats[n - 1].0.clone());
                }
            }
            let _ = writeln!(output, "Please type a number between 1 and {}", formats.len());
        }
    }
}

impl KeepPrompt for StdinPrompt {
    fn choose(
        &mut self,
        set: &DuplicateSet,
        formats: &[(String, String)],
        default_id: &str,
    ) -> Result<String, PruneError> {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let mut output = io::stderr();
        Self::choose_from(set, formats, default_id, &mut input, &mut output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::LibraryItem;
    use crate::duplicates::resolve;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["shelfprune"];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    fn sample_set() -> (DuplicateSet, Vec<(String, String)>) {
        let items = vec![
            LibraryItem {
                id: "old".to_string(),
                title: "Dune".to_string(),
                added_at: 1,
                ..Default::default()
            },
            LibraryItem {
                id: "new".to_string(),
                title: "Dune".to_string(),
                added_at: 2,
                ..Default::default()
            },
        ];
        let set = resolve(&items, GroupMode::Title, false, false)
            .sets
            .into_iter()
            .next()
            .unwrap();
        let formats = vec![
            ("old".to_string(), "m4b".to_string()),
            ("new".to_string(), "mp3".to_string()),
        ];
        (set, formats)
    }

    #[test]
    fn test_cli_defaults() {
        let cli = parse(&[]);
        assert_eq!(cli.verbose, 0);
        assert!(!cli.quiet);
        assert!(cli.by.is_none());
        assert!(!cli.apply);
        assert!(cli.libraries.is_empty());
    }

    #[test]
    fn test_cli_value_flags() {
        let cli = parse(&[
            "--by",
            "title+author",
            "--delete-files",
            "trash",
            "--libraries",
            "Audiobooks,Kids",
            "--preferred-formats",
            "m4b,mp3",
            "--path-map",
            "/audiobooks=/mnt/user/audiobooks",
        ]);
        assert_eq!(cli.by, Some(GroupMode::TitleAuthor));
        assert_eq!(cli.delete_files, Some(DeleteFilesMode::Trash));
        assert_eq!(cli.libraries, vec!["Audiobooks", "Kids"]);
        assert_eq!(cli.preferred_formats, vec!["m4b", "mp3"]);
        assert_eq!(cli.path_map[0].dest, PathBuf::from("/mnt/user/audiobooks"));
    }

    #[test]
    fn test_cli_rejects_invalid_mode() {
        let result = Cli::try_parse_from(["shelfprune", "--by", "nope"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_prompt_numeric_choice() {
        let (set, formats) = sample_set();
        let mut input = io::Cursor::new(b"2\n".to_vec());
        let mut output = Vec::new();
        let chosen =
            StdinPrompt::choose_from(&set, &formats, "old", &mut input, &mut output).unwrap();
        assert_eq!(chosen, "new");
    }

    #[test]
    fn test_prompt_empty_takes_default() {
        let (set, formats) = sample_set();
        let mut input = io::Cursor::new(b"\n".to_vec());
        let mut output = Vec::new();
        let chosen =
            StdinPrompt::choose_from(&set, &formats, "old", &mut input, &mut output).unwrap();
        assert_eq!(chosen, "old");
    }

    #[test]
    fn test_prompt_retries_until_valid() {
        let (set, formats) = sample_set();
        let mut input = io::Cursor::new(b"9\nzero\n1\n".to_vec());
        let mut output = Vec::new();
        let chosen =
            StdinPrompt::choose_from(&set, &formats, "old", &mut input, &mut output).unwrap();
        assert_eq!(chosen, "old");
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("Please type a number"));
    }

    #[test]
    fn test_prompt_eof_is_error() {
        let (set, formats) = sample_set();
        let mut input = io::Cursor::new(Vec::new());
        let mut output = Vec::new();
        let err = StdinPrompt::choose_from(&set, &formats, "old", &mut input, &mut output)
            .unwrap_err();
        assert!(matches!(err, PruneError::Input { .. }));
    }
}
