//! Typed catalog records.
//!
//! The catalog service reports items as deeply nested JSON with most fields
//! optional. The wire shapes live in [`crate::catalog::http`]; this module
//! holds the flattened records the engine works with. Presence/absence is
//! explicit (`Option`) rather than discovered by attribute probing.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A library as reported by the catalog service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Library {
    /// Opaque library id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Media type (`"book"`, `"podcast"`, ...). Only book libraries are
    /// processed.
    pub media_type: String,
}

impl Library {
    /// Whether this library holds books.
    #[must_use]
    pub fn is_book(&self) -> bool {
        self.media_type == "book"
    }
}

/// One media file belonging to a library item.
///
/// Only audio files are carried over from the wire payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaFile {
    /// File extension without the leading dot, lowercased (e.g. `"m4b"`).
    pub ext: Option<String>,
    /// MIME type (e.g. `"audio/mpeg"`).
    pub mime: Option<String>,
    /// Absolute file path as reported by the catalog.
    pub path: Option<PathBuf>,
}

/// A library item (one book) as the engine sees it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LibraryItem {
    /// Opaque item id. Used as the deterministic tie-breaker for keeper
    /// selection when `added_at` timestamps collide.
    pub id: String,
    /// Title. Required for every grouping mode.
    pub title: String,
    /// Catalog-provided title with the leading article stripped
    /// (e.g. "Hobbit, The" for "The Hobbit"). Used when prefix-ignoring
    /// grouping is enabled.
    pub title_ignore_prefix: Option<String>,
    /// Author display name.
    pub author: Option<String>,
    /// Series display name.
    pub series: Option<String>,
    /// Epoch-millisecond timestamp the item was added to the catalog.
    pub added_at: i64,
    /// Item folder as reported by the catalog.
    pub path: Option<PathBuf>,
    /// Audio files belonging to this item.
    pub files: Vec<MediaFile>,
    /// Tags currently on the item.
    pub tags: Vec<String>,
}

impl LibraryItem {
    /// The folder holding this item's files.
    ///
    /// Prefers the catalog-reported item path; otherwise derives the common
    /// parent directory of the item's audio file paths. Returns `None` when
    /// neither is available.
    #[must_use]
    pub fn folder(&self) -> Option<PathBuf> {
        if let Some(p) = &self.path {
            if !p.as_os_str().is_empty() {
                return Some(p.clone());
            }
        }

        let parents: Vec<&Path> = self
            .files
            .iter()
            .filter_map(|f| f.path.as_deref())
            .filter_map(Path::parent)
            .collect();
        let first = parents.first()?;

        let mut common = first.to_path_buf();
        for parent in &parents[1..] {
            while !parent.starts_with(&common) {
                if !common.pop() {
                    return Some(first.to_path_buf());
                }
            }
        }
        Some(common)
    }

    /// Whether the item currently carries `tag`.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}
