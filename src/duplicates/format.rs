//! Format resolution from item metadata.
//!
//! Pure functions, no I/O. An item's format label is inferred from its
//! audio files: the file extension wins, the MIME subtype is the fallback,
//! and the `"unknown"` sentinel covers items where the catalog reported
//! neither.

use crate::catalog::{LibraryItem, MediaFile};

/// Sentinel label for items with no extension or MIME information.
pub const UNKNOWN_FORMAT: &str = "unknown";

/// Fold a raw extension or MIME subtype into its canonical label.
///
/// Lowercases, strips a leading dot, and folds the `mp4` container alias
/// onto `m4a`.
#[must_use]
pub fn canonical_label(raw: &str) -> String {
    let label = raw.trim().trim_start_matches('.').to_lowercase();
    match label.as_str() {
        "mp4" => "m4a".to_string(),
        _ => label,
    }
}

fn file_label(file: &MediaFile) -> Option<String> {
    if let Some(ext) = &file.ext {
        if !ext.is_empty() {
            return Some(canonical_label(ext));
        }
    }
    let mime = file.mime.as_deref()?;
    let subtype = mime.strip_prefix("audio/")?;
    if subtype.is_empty() {
        None
    } else {
        Some(canonical_label(subtype))
    }
}

/// All distinct format labels of an item, in file order.
#[must_use]
pub fn item_formats(item: &LibraryItem) -> Vec<String> {
    let mut seen = Vec::new();
    for file in &item.files {
        if let Some(label) = file_label(file) {
            if !seen.contains(&label) {
                seen.push(label);
            }
        }
    }
    if seen.is_empty() {
        seen.push(UNKNOWN_FORMAT.to_string());
    }
    seen
}

/// Resolve the item's format label.
///
/// The dominant label across the item's files wins (most files carry it);
/// ties go to the label seen first. Items with no format information
/// resolve to [`UNKNOWN_FORMAT`].
#[must_use]
pub fn resolve_format(item: &LibraryItem) -> String {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for file in &item.files {
        if let Some(label) = file_label(file) {
            match counts.iter_mut().find(|(l, _)| *l == label) {
                Some((_, n)) => *n += 1,
                None => counts.push((label, 1)),
            }
        }
    }

    // Only a strictly greater count displaces the current best, so ties
    // stay with the label seen first.
    let mut best: Option<(String, usize)> = None;
    for (label, n) in counts {
        if best.as_ref().map_or(true, |(_, m)| n > *m) {
            best = Some((label, n));
        }
    }
    best.map_or_else(|| UNKNOWN_FORMAT.to_string(), |(label, _)| label)
}
