//! Duplicate detection over catalog metadata.
//!
//! Grouping is metadata-key based only: normalized title plus an optional
//! author or series component. No content hashing or fingerprinting is
//! performed.

pub mod format;
pub mod key;
pub mod normalize;
pub mod resolver;

pub use format::{item_formats, resolve_format, UNKNOWN_FORMAT};
pub use key::{build_key, GroupKey, GroupMode, Secondary};
pub use normalize::normalize;
pub use resolver::{choose_keeper, resolve, DuplicateSet, ResolveOutcome};
