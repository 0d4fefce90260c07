//! Error taxonomy and process exit codes.
//!
//! The engine never aborts a run for a per-item failure: every variant of
//! [`PruneError`] is recorded against the item that produced it and
//! processing continues with the next item. Only configuration and
//! connectivity failures (handled in the application shell with `anyhow`)
//! terminate the process early.

use std::path::PathBuf;

use thiserror::Error;

/// Per-item failures recorded during a run.
#[derive(Debug, Error)]
pub enum PruneError {
    /// Item data is incomplete for the requested grouping mode.
    /// The item is excluded from grouping and counted; the run continues.
    #[error("item {item_id}: missing {field} required for grouping")]
    Input {
        item_id: String,
        field: &'static str,
    },

    /// Path falls outside `allow_roots` after path-map translation.
    /// Always downgraded to a recorded skip, never fatal.
    #[error("path outside allow_roots: {0}")]
    PathSafety(PathBuf),

    /// Catalog HTTP/API call failed. Recorded per item.
    #[error("catalog call failed: {0}")]
    RemoteCall(String),

    /// Trash/remove operation failed (permissions, missing source, ...).
    /// Recorded as a failed file op; the catalog-delete phase still runs.
    #[error("file operation failed for {path}: {message}")]
    FileSystem { path: PathBuf, message: String },
}

/// Exit codes for the shelfprune process.
///
/// - 0: Success (completed normally, duplicates found)
/// - 1: General error (configuration or connectivity failure)
/// - 2: No duplicates found (completed normally)
/// - 3: Partial success (completed with recorded per-item errors)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Run completed and duplicates were found.
    Success = 0,
    /// An unexpected error occurred before or outside the engine.
    GeneralError = 1,
    /// Run completed but no duplicate sets were found.
    NoDuplicates = 2,
    /// Run completed but some per-item operations failed or were skipped.
    PartialSuccess = 3,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}
