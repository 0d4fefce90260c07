//! Run aggregation and human-readable summary rendering.
//!
//! The engine populates [`RunResult`] fully in both dry-run and apply
//! mode; rendering only changes the phrasing ("would move" vs "moved").
//! A `RunResult` is created fresh per run and never persisted.

use std::io::{self, Write};

use crate::prune::fileops::FileOpResult;

/// Aggregated outcome of one run across all selected libraries.
#[derive(Debug, Default)]
pub struct RunResult {
    /// Per-library breakdowns, in processing order.
    pub libraries: Vec<LibraryReport>,
    /// Whether this run was a dry-run.
    pub dry_run: bool,
    /// Whether the prune workflow was enabled.
    pub prune: bool,
    /// Book libraries available on the catalog.
    pub libraries_total: usize,
}

impl RunResult {
    /// Total items scanned across libraries.
    #[must_use]
    pub fn items_total(&self) -> usize {
        self.libraries.iter().map(|l| l.items_scanned).sum()
    }

    /// Total duplicate sets found.
    #[must_use]
    pub fn dupe_sets_total(&self) -> usize {
        self.libraries.iter().map(|l| l.entries.len()).sum()
    }

    /// Total recorded per-item errors.
    #[must_use]
    pub fn errors_total(&self) -> usize {
        self.libraries.iter().map(|l| l.errors).sum()
    }
}

/// Outcome for one library.
#[derive(Debug, Default)]
pub struct LibraryReport {
    /// Library id.
    pub library_id: String,
    /// Library display name.
    pub name: String,
    /// Items fetched from the catalog.
    pub items_scanned: usize,
    /// One entry per duplicate set, in resolution order.
    pub entries: Vec<SetReport>,
    /// Recorded per-item errors (remote failures, failed file ops,
    /// excluded items).
    pub errors: usize,
}

/// Outcome for one duplicate set.
#[derive(Debug, Default)]
pub struct SetReport {
    /// Display title of the set (from its first member).
    pub title: String,
    /// Display author, if any.
    pub author: Option<String>,
    /// Format label -> member count, sorted by label.
    pub format_counts: Vec<(String, usize)>,
    /// Keeper-by-date id.
    pub keeper_id: String,
    /// Members tagged this run.
    pub tag_added: usize,
    /// Members already carrying the tag.
    pub tag_skipped: usize,
    /// Format of the kept copy, when a prune decision was made.
    pub keep_format: Option<String>,
    /// Preferred-format entry that matched in automatic mode. `None` with
    /// `keep_format` set means the oldest-item fallback was taken (or the
    /// decision was interactive).
    pub matched_preferred: Option<String>,
    /// Removal targets in this set.
    pub to_delete: usize,
    /// File-phase outcome per removal target.
    pub file_results: Vec<(String, FileOpResult)>,
    /// Catalog deletions that succeeded (or would, in dry-run).
    pub catalog_deleted: usize,
    /// Catalog deletions that failed.
    pub catalog_delete_failed: usize,
    /// Whether the duplicate tag was (or would be) removed from the kept
    /// copy.
    pub kept_tag_removed: bool,
}

impl SetReport {
    fn file_count(&self, pred: impl Fn(&FileOpResult) -> bool) -> usize {
        self.file_results.iter().filter(|(_, r)| pred(r)).count()
    }

    /// Removal targets whose folder was (or would be) trashed.
    #[must_use]
    pub fn files_moved(&self) -> usize {
        self.file_count(|r| matches!(r, FileOpResult::MovedToTrash { .. }))
    }

    /// Removal targets whose folder was (or would be) permanently removed.
    #[must_use]
    pub fn files_removed(&self) -> usize {
        self.file_count(|r| matches!(r, FileOpResult::Removed { .. }))
    }

    /// Removal targets skipped because their path fell outside the
    /// allow-roots.
    #[must_use]
    pub fn files_skipped(&self) -> usize {
        self.file_count(|r| matches!(r, FileOpResult::SkippedOutsideRoots { .. }))
    }

    /// Removal targets whose file op failed.
    #[must_use]
    pub fn files_failed(&self) -> usize {
        self.file_count(|r| matches!(r, FileOpResult::Failed { .. }))
    }

    /// A path skipped for safety, for the report's "reason" line.
    #[must_use]
    pub fn first_skipped_path(&self) -> Option<&std::path::Path> {
        self.file_results.iter().find_map(|(_, r)| match r {
            FileOpResult::SkippedOutsideRoots { path } => Some(path.as_path()),
            _ => None,
        })
    }
}

/// Render the run summary to `out`.
///
/// # Errors
///
/// Propagates write errors from `out`.
pub fn render(result: &RunResult, tag: &str, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "{}", "=".repeat(72))?;
    writeln!(out, "SUMMARY")?;
    writeln!(out, "{}", "-".repeat(72))?;
    let mode = if result.dry_run {
        "DRY RUN (no changes)"
    } else {
        "APPLY (changes performed)"
    };
    writeln!(out, "Mode: {mode}")?;
    writeln!(
        out,
        "Libraries scanned: {} of {} book libraries",
        result.libraries.len(),
        result.libraries_total
    )?;
    writeln!(out, "Items scanned: {}", result.items_total())?;
    writeln!(out, "Books with duplicates: {}", result.dupe_sets_total())?;
    writeln!(out, "{}", "-".repeat(72))?;

    if result.dupe_sets_total() == 0 {
        writeln!(out, "No duplicate books found.")?;
    }

    for lib in &result.libraries {
        writeln!(out, "\nLibrary: {} ({})", lib.name, lib.library_id)?;
        if lib.entries.is_empty() {
            writeln!(out, "  No duplicate books.")?;
            continue;
        }
        for entry in &lib.entries {
            render_entry(entry, result, tag, out)?;
        }
    }

    writeln!(out, "{}", "=".repeat(72))?;
    Ok(())
}

fn render_entry(
    entry: &SetReport,
    result: &RunResult,
    tag: &str,
    out: &mut impl Write,
) -> io::Result<()> {
    let author = entry
        .author
        .as_deref()
        .map_or_else(String::new, |a| format!(" — {a}"));
    let formats = if entry.format_counts.is_empty() {
        "unknown".to_string()
    } else {
        entry
            .format_counts
            .iter()
            .map(|(f, n)| format!("{f}x{n}"))
            .collect::<Vec<_>>()
            .join(", ")
    };
    writeln!(out, "  - {}{author} | formats: {formats}", entry.title)?;

    if entry.tag_added > 0 || entry.tag_skipped > 0 {
        let mut bits = Vec::new();
        if entry.tag_added > 0 {
            bits.push(format!("added '{tag}' to {} item(s)", entry.tag_added));
        }
        if entry.tag_skipped > 0 {
            bits.push(format!("skipped {} (already tagged)", entry.tag_skipped));
        }
        writeln!(out, "    Tagging: {}", bits.join("; "))?;
    }

    if result.prune {
        if let Some(keep_format) = &entry.keep_format {
            let (kept, deleted, moved, removed) = if result.dry_run {
                ("would keep", "would delete", "would move", "would remove")
            } else {
                ("kept", "deleted", "moved", "removed")
            };
            let basis = match &entry.matched_preferred {
                Some(fmt) => format!("preferred format {fmt}"),
                None => "oldest copy (no preferred format matched)".to_string(),
            };
            writeln!(
                out,
                "    Outcome: {kept} {keep_format} ({basis}); {deleted} {} other copy/copies.",
                entry.catalog_deleted
            )?;
            writeln!(
                out,
                "    Files: {moved} {}, {removed} {}, skipped {}, failed {}.",
                entry.files_moved(),
                entry.files_removed(),
                entry.files_skipped(),
                entry.files_failed()
            )?;
            if entry.kept_tag_removed {
                let verb = if result.dry_run {
                    "Would remove"
                } else {
                    "Removed"
                };
                writeln!(out, "    {verb} '{tag}' tag from kept copy.")?;
            }
            if let Some(path) = entry.first_skipped_path() {
                writeln!(
                    out,
                    "      Note: skipped outside allow_roots (e.g., {})",
                    path.display()
                )?;
            }
        } else {
            writeln!(out, "    Outcome: (no prune decision)")?;
        }
    }
    Ok(())
}
