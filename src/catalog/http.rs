//! Blocking HTTP client for an Audiobookshelf-compatible catalog.
//!
//! Endpoints:
//!
//! - `GET  /api/libraries` - library listing
//! - `GET  /api/libraries/{id}/items?expanded=1` - item listing
//! - `POST /api/items/batch/update` - batch tag replacement
//! - `DELETE /api/items/{id}` - item removal
//!
//! Authentication is a bearer token. The wire payload is tolerant JSON:
//! everything except item ids is optional, and the listing endpoints wrap
//! their arrays in differently named envelopes across server versions.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::model::{Library, LibraryItem, MediaFile};
use crate::catalog::{CatalogClient, ItemOutcome, TagUpdate};
use crate::error::PruneError;

/// Batch size for tag updates. Matches the server's comfortable payload
/// limit for `/api/items/batch/update`.
const TAG_BATCH_SIZE: usize = 100;

/// Blocking catalog client backed by `reqwest`.
pub struct HttpCatalog {
    base_url: String,
    token: String,
    client: reqwest::blocking::Client,
}

impl HttpCatalog {
    /// Create a client for `base_url` authenticating with `token`.
    ///
    /// `insecure` disables TLS certificate verification (self-hosted
    /// catalogs frequently run on self-signed certificates).
    ///
    /// # Errors
    ///
    /// Returns [`PruneError::RemoteCall`] when the underlying HTTP client
    /// cannot be constructed.
    pub fn new(base_url: &str, token: &str, insecure: bool) -> Result<Self, PruneError> {
        let client = reqwest::blocking::Client::builder()
            .danger_accept_invalid_certs(insecure)
            .build()
            .map_err(|e| PruneError::RemoteCall(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            client,
        })
    }

    fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, PruneError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .map_err(|e| PruneError::RemoteCall(format!("GET {path}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PruneError::RemoteCall(format!("GET {path}: HTTP {status}")));
        }
        response
            .json()
            .map_err(|e| PruneError::RemoteCall(format!("GET {path}: invalid JSON: {e}")))
    }
}

impl CatalogClient for HttpCatalog {
    fn list_libraries(&self) -> Result<Vec<Library>, PruneError> {
        let body = self.get_json("/api/libraries", &[])?;
        let raw = unwrap_envelope(body, &["libraries"]);
        let wires: Vec<WireLibrary> = serde_json::from_value(raw)
            .map_err(|e| PruneError::RemoteCall(format!("library payload: {e}")))?;
        Ok(wires.into_iter().map(WireLibrary::into_library).collect())
    }

    fn list_items(&self, library_id: &str) -> Result<Vec<LibraryItem>, PruneError> {
        let path = format!("/api/libraries/{library_id}/items");
        let body = self.get_json(&path, &[("expanded", "1")])?;
        let raw = unwrap_envelope(body, &["libraryItems", "results"]);
        let wires: Vec<WireItem> = serde_json::from_value(raw)
            .map_err(|e| PruneError::RemoteCall(format!("item payload: {e}")))?;

        Ok(wires
            .into_iter()
            .filter(WireItem::is_book)
            .map(WireItem::into_item)
            .collect())
    }

    fn batch_tag(&self, updates: &[TagUpdate]) -> Vec<ItemOutcome> {
        let mut outcomes = Vec::with_capacity(updates.len());
        let url = format!("{}/api/items/batch/update", self.base_url);

        for chunk in updates.chunks(TAG_BATCH_SIZE) {
            let payload: Vec<Value> = chunk
                .iter()
                .map(|u| {
                    serde_json::json!({
                        "id": u.item_id,
                        "mediaPayload": { "tags": u.tags },
                    })
                })
                .collect();

            let result = self
                .client
                .post(&url)
                .bearer_auth(&self.token)
                .json(&payload)
                .send()
                .map_err(|e| e.to_string())
                .and_then(|r| {
                    let status = r.status();
                    if status.is_success() {
                        Ok(())
                    } else {
                        Err(format!("HTTP {status}"))
                    }
                });

            // The endpoint is all-or-nothing per chunk; fan the chunk
            // outcome out to its items.
            for update in chunk {
                outcomes.push(ItemOutcome {
                    item_id: update.item_id.clone(),
                    result: match &result {
                        Ok(()) => Ok(()),
                        Err(msg) => Err(PruneError::RemoteCall(format!(
                            "batch tag update: {msg}"
                        ))),
                    },
                });
            }
        }

        outcomes
    }

    fn delete_item(&self, item_id: &str) -> Result<(), PruneError> {
        let url = format!("{}/api/items/{item_id}", self.base_url);
        let response = self
            .client
            .delete(&url)
            .bearer_auth(&self.token)
            .send()
            .map_err(|e| PruneError::RemoteCall(format!("DELETE {item_id}: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        // Already absent counts as deleted.
        if status == reqwest::StatusCode::NOT_FOUND {
            log::warn!("Item {item_id} already absent in catalog");
            return Ok(());
        }
        Err(PruneError::RemoteCall(format!(
            "DELETE {item_id}: HTTP {status}"
        )))
    }
}

/// Pull the payload array out of an envelope object, trying the known
/// field names in order. A bare array passes through unchanged.
fn unwrap_envelope(body: Value, fields: &[&str]) -> Value {
    if body.is_array() {
        return body;
    }
    if let Value::Object(map) = &body {
        for field in fields {
            if let Some(inner) = map.get(*field) {
                if inner.is_array() {
                    return inner.clone();
                }
            }
        }
    }
    body
}

// ---- wire shapes ----------------------------------------------------------

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireLibrary {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    media_type: Option<String>,
    // Older servers report the media type as `type`.
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

impl WireLibrary {
    fn into_library(self) -> Library {
        let media_type = self.media_type.or(self.kind).unwrap_or_default();
        Library {
            name: self.name.unwrap_or_else(|| self.id.clone()),
            id: self.id,
            media_type,
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireItem {
    id: String,
    #[serde(default)]
    media_type: Option<String>,
    #[serde(default)]
    added_at: Option<i64>,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    media: Option<WireMedia>,
    #[serde(default)]
    library_files: Vec<WireFile>,
    #[serde(default)]
    tags: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireMedia {
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    metadata: Option<WireMetadata>,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    added_at: Option<i64>,
    #[serde(default)]
    tracks: Vec<WireTrack>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireMetadata {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    title_ignore_prefix: Option<String>,
    #[serde(default)]
    author_name: Option<String>,
    #[serde(default)]
    series_name: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireFile {
    #[serde(default)]
    file_type: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    metadata: Option<WireFileMetadata>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireFileMetadata {
    #[serde(default)]
    ext: Option<String>,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    rel_path: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireTrack {
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

impl WireItem {
    fn is_book(&self) -> bool {
        if self.media_type.as_deref() == Some("book") {
            return true;
        }
        self.media
            .as_ref()
            .and_then(|m| m.kind.as_deref())
            .map_or(false, |k| k == "book")
    }

    fn into_item(self) -> LibraryItem {
        let media = self.media.unwrap_or_default();
        let metadata = media.metadata.unwrap_or_default();

        let added_at = self.added_at.or(media.added_at).unwrap_or(0);
        let tags = media.tags.or(self.tags).unwrap_or_default();

        let mut files: Vec<MediaFile> = self
            .library_files
            .into_iter()
            .filter(|f| {
                f.file_type
                    .as_deref()
                    .map_or(false, |t| t.eq_ignore_ascii_case("audio"))
            })
            .map(WireFile::into_media_file)
            .collect();

        // Some servers only expose playable tracks, not library files.
        if files.is_empty() {
            files = media.tracks.into_iter().map(WireTrack::into_media_file).collect();
        }

        LibraryItem {
            id: self.id,
            title: metadata.title.unwrap_or_default(),
            title_ignore_prefix: metadata.title_ignore_prefix.filter(|t| !t.is_empty()),
            author: metadata.author_name.filter(|a| !a.is_empty()),
            series: metadata.series_name.filter(|s| !s.is_empty()),
            added_at,
            path: self.path.filter(|p| !p.is_empty()).map(PathBuf::from),
            files,
            tags,
        }
    }
}

impl WireFile {
    fn into_media_file(self) -> MediaFile {
        let metadata = self.metadata.unwrap_or_default();
        let path = metadata
            .path
            .or(self.path)
            .or(metadata.rel_path)
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);

        let ext = metadata
            .ext
            .map(|e| e.trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .or_else(|| extension_of(path.as_deref()));

        MediaFile {
            ext,
            mime: self.mime_type.map(|m| m.to_lowercase()),
            path,
        }
    }
}

impl WireTrack {
    fn into_media_file(self) -> MediaFile {
        let title_path = self.title.filter(|t| t.contains('.')).map(PathBuf::from);
        MediaFile {
            ext: extension_of(title_path.as_deref()),
            mime: self.mime_type.map(|m| m.to_lowercase()),
            path: None,
        }
    }
}

fn extension_of(path: Option<&std::path::Path>) -> Option<String> {
    path?
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
}
