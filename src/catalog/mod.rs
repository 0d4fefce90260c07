//! Catalog service interface.
//!
//! The engine talks to the remote catalog exclusively through the
//! [`CatalogClient`] trait. [`http::HttpCatalog`] implements it against an
//! Audiobookshelf-compatible REST API; tests substitute an in-memory mock.
//!
//! All mutating calls return per-item outcomes instead of raising for
//! partial failure: a failed call for one item is recorded and processing
//! continues with the next.

pub mod http;
pub mod model;

pub use model::{Library, LibraryItem, MediaFile};

use crate::error::PruneError;

/// A tag mutation for one item.
///
/// The catalog's batch endpoint replaces the whole tag list, so the caller
/// computes the final list (current tags plus/minus the duplicate tag) and
/// submits it here.
#[derive(Debug, Clone)]
pub struct TagUpdate {
    /// Target item id.
    pub item_id: String,
    /// Full replacement tag list.
    pub tags: Vec<String>,
}

/// Per-item outcome of a fallible batch call.
#[derive(Debug)]
pub struct ItemOutcome {
    /// The item the outcome refers to.
    pub item_id: String,
    /// Success, or the recorded failure.
    pub result: Result<(), PruneError>,
}

/// Remote catalog operations used by the engine.
pub trait CatalogClient {
    /// List all libraries on the catalog.
    ///
    /// # Errors
    ///
    /// Returns [`PruneError::RemoteCall`] when the catalog is unreachable
    /// or responds with an error. This is the one call treated as run-fatal
    /// by the application shell.
    fn list_libraries(&self) -> Result<Vec<Library>, PruneError>;

    /// List all book items in a library.
    ///
    /// # Errors
    ///
    /// Returns [`PruneError::RemoteCall`] on failure; the caller records it
    /// against the library and continues with the next one.
    fn list_items(&self, library_id: &str) -> Result<Vec<LibraryItem>, PruneError>;

    /// Apply tag updates, returning one outcome per submitted item.
    fn batch_tag(&self, updates: &[TagUpdate]) -> Vec<ItemOutcome>;

    /// Delete an item from the catalog. The item's files are not touched
    /// by this call; file handling happens before it.
    ///
    /// # Errors
    ///
    /// Returns [`PruneError::RemoteCall`] on failure; recorded per item.
    fn delete_item(&self, item_id: &str) -> Result<(), PruneError>;
}

/// Select the book libraries a run should process.
///
/// `wanted` entries match a library id or its exact name. An empty list or
/// the keyword `ALL` selects every book library. Non-book libraries are
/// always excluded.
#[must_use]
pub fn select_libraries(all: &[Library], wanted: &[String]) -> Vec<Library> {
    let books = all.iter().filter(|l| l.is_book());

    if wanted.is_empty() || wanted.iter().any(|w| w.eq_ignore_ascii_case("all")) {
        return books.cloned().collect();
    }

    books
        .filter(|lib| wanted.iter().any(|w| *w == lib.id || *w == lib.name))
        .cloned()
        .collect()
}
