//! Per-set action sequencing and result aggregation.
//!
//! For every duplicate set the phases run in strict order: tag, decide,
//! file op, catalog delete, tag cleanup. Tag updates are queued across the
//! library's sets and submitted in a single batch before any prune phase
//! runs. The file op for an item always
//! executes before its catalog delete; the catalog runs its own
//! filesystem watcher and deleting the record first would let it
//! re-import a partially deleted item. A skipped or failed file op never
//! blocks the catalog delete; it is recorded and the run moves on.
//!
//! In dry-run mode every phase computes and records its outcome without
//! mutating the catalog or the filesystem.

use std::path::PathBuf;

use crate::catalog::{CatalogClient, Library, LibraryItem, TagUpdate};
use crate::config::Options;
use crate::duplicates::resolver::DuplicateSet;
use crate::duplicates::{resolve, resolve_format};
use crate::prune::decision::{decide, KeepPrompt};
use crate::prune::fileops::{FileOpResult, FileOps};
use crate::report::{LibraryReport, SetReport};

/// Sequences tagging, decisioning, file ops and catalog mutations for one
/// library at a time.
pub struct Orchestrator<'a, C: CatalogClient + ?Sized> {
    catalog: &'a C,
    options: &'a Options,
    fileops: FileOps,
}

impl<'a, C: CatalogClient + ?Sized> Orchestrator<'a, C> {
    /// Build an orchestrator over `catalog` with the run's options.
    pub fn new(catalog: &'a C, options: &'a Options) -> Self {
        let fileops = FileOps {
            mode: options.delete_files,
            trash_dir: options.trash_dir(),
            allow_roots: options.allow_roots.clone(),
            path_map: options.path_map.clone(),
            apply: options.apply,
        };
        Self {
            catalog,
            options,
            fileops,
        }
    }

    /// Process one library end to end and return its report.
    ///
    /// Never fails: remote errors, excluded items and failed file ops are
    /// recorded in the report and processing continues.
    pub fn process_library(
        &self,
        library: &Library,
        prompt: &mut dyn KeepPrompt,
    ) -> LibraryReport {
        let mut report = LibraryReport {
            library_id: library.id.clone(),
            name: library.name.clone(),
            ..Default::default()
        };

        log::info!("== Library: {} ({}) ==", library.name, library.id);
        let items = match self.catalog.list_items(&library.id) {
            Ok(items) => items,
            Err(e) => {
                log::error!("Failed to fetch items for {}: {e}", library.id);
                report.errors += 1;
                return report;
            }
        };
        report.items_scanned = items.len();

        let outcome = resolve(
            &items,
            self.options.by,
            self.options.ignore_prefix(),
            self.options.case_sensitive,
        );
        report.errors += outcome.skipped.len();

        // Tag pass over every set first; updates accumulate and go to the
        // batch endpoint in one submission per library.
        let mut entries: Vec<SetReport> = Vec::with_capacity(outcome.sets.len());
        let mut pending: Vec<TagUpdate> = Vec::new();
        for set in &outcome.sets {
            let mut entry = new_entry(set);
            self.tag_phase(set, &mut entry, &mut pending);
            entries.push(entry);
        }
        self.flush_tags(pending, &mut report.errors);

        if self.options.prune {
            for (set, entry) in outcome.sets.iter().zip(entries.iter_mut()) {
                self.prune_phases(set, entry, prompt, &mut report.errors);
            }
        }

        report.entries = entries;
        report
    }

    /// Phase 1: queue tag updates for candidates (and the keeper too, with
    /// `tag_all`).
    fn tag_phase(&self, set: &DuplicateSet, entry: &mut SetReport, updates: &mut Vec<TagUpdate>) {
        let tag = &self.options.tag;

        for item in &set.items {
            if !self.options.tag_all && item.id == set.keeper_id {
                continue;
            }
            if item.has_tag(tag) {
                log::debug!("skip {} (already has '{tag}')", item.id);
                entry.tag_skipped += 1;
                continue;
            }
            entry.tag_added += 1;
            let mut tags = item.tags.clone();
            tags.push(tag.clone());
            updates.push(TagUpdate {
                item_id: item.id.clone(),
                tags,
            });
        }
    }

    /// Submit the library's accumulated tag updates in one batch call.
    fn flush_tags(&self, pending: Vec<TagUpdate>, errors: &mut usize) {
        if !self.options.apply || pending.is_empty() {
            return;
        }
        for outcome in self.catalog.batch_tag(&pending) {
            if let Err(e) = outcome.result {
                log::error!("Tagging {} failed: {e}", outcome.item_id);
                *errors += 1;
            }
        }
    }

    /// Phases 2-5: decide, file op, catalog delete, tag cleanup.
    fn prune_phases(
        &self,
        set: &DuplicateSet,
        entry: &mut SetReport,
        prompt: &mut dyn KeepPrompt,
        errors: &mut usize,
    ) {
        let decision = match decide(
            set,
            &self.options.preferred_formats,
            self.options.assume_yes,
            prompt,
        ) {
            Ok(decision) => decision,
            Err(e) => {
                log::error!("No prune decision for '{}': {e}", entry.title);
                *errors += 1;
                return;
            }
        };

        entry.keep_format = Some(decision.keep_format.clone());
        entry.matched_preferred = decision.matched_format.clone();
        entry.to_delete = decision.remove_ids.len();

        // File phase: strictly before the catalog delete for each item.
        for item_id in &decision.remove_ids {
            let result = self.file_phase(set, item_id);
            if matches!(result, FileOpResult::Failed { .. }) {
                *errors += 1;
            }
            entry.file_results.push((item_id.clone(), result));
        }

        // Catalog-delete phase: runs regardless of file-phase outcomes.
        for item_id in &decision.remove_ids {
            if !self.options.apply {
                log::info!("[DRY-RUN] Would delete {item_id} from catalog");
                entry.catalog_deleted += 1;
                continue;
            }
            match self.catalog.delete_item(item_id) {
                Ok(()) => {
                    log::info!("Catalog delete {item_id}: OK");
                    entry.catalog_deleted += 1;
                }
                Err(e) => {
                    log::error!("Catalog delete {item_id}: {e}");
                    entry.catalog_delete_failed += 1;
                    *errors += 1;
                }
            }
        }

        // Cleanup phase: strip the duplicate tag from the kept copy.
        if self.options.assume_yes && self.options.clean_tags_after_prune {
            self.cleanup_phase(set, &decision.keep_id, entry, errors);
        }
    }

    fn file_phase(&self, set: &DuplicateSet, item_id: &str) -> FileOpResult {
        let Some(item) = set.items.iter().find(|it| it.id == *item_id) else {
            return FileOpResult::Failed {
                path: PathBuf::new(),
                reason: format!("item {item_id} not in set"),
            };
        };
        match item.folder() {
            Some(folder) => self.fileops.perform(&folder),
            None => {
                log::warn!("Could not determine folder for {item_id}; skipping file op");
                FileOpResult::Failed {
                    path: PathBuf::new(),
                    reason: "could not determine item folder".to_string(),
                }
            }
        }
    }

    fn cleanup_phase(
        &self,
        set: &DuplicateSet,
        keep_id: &str,
        entry: &mut SetReport,
        errors: &mut usize,
    ) {
        let Some(kept) = set.items.iter().find(|it| it.id == keep_id) else {
            return;
        };
        let tag = &self.options.tag;
        let tags: Vec<String> = kept
            .tags
            .iter()
            .filter(|t| *t != tag)
            .cloned()
            .collect();
        let update = TagUpdate {
            item_id: kept.id.clone(),
            tags,
        };

        if self.options.apply {
            for outcome in self.catalog.batch_tag(&[update]) {
                if let Err(e) = outcome.result {
                    log::error!("Tag cleanup for {} failed: {e}", outcome.item_id);
                    *errors += 1;
                    return;
                }
            }
        } else {
            log::info!("[DRY-RUN] Would remove '{tag}' from kept copy {keep_id}");
        }
        entry.kept_tag_removed = true;
    }
}

/// Seed a set report from the set's metadata.
fn new_entry(set: &DuplicateSet) -> SetReport {
    let first: &LibraryItem = &set.items[0];

    let mut format_counts: Vec<(String, usize)> = Vec::new();
    for item in &set.items {
        let label = resolve_format(item);
        match format_counts.iter_mut().find(|(l, _)| *l == label) {
            Some((_, n)) => *n += 1,
            None => format_counts.push((label, 1)),
        }
    }
    format_counts.sort_by(|a, b| a.0.cmp(&b.0));

    SetReport {
        title: first.title.clone(),
        author: first.author.clone(),
        format_counts,
        keeper_id: set.keeper_id.clone(),
        ..Default::default()
    }
}
