//! Grouping-key construction.
//!
//! A [`GroupKey`] is the normalized tuple that defines duplicate
//! membership: two items belong to the same duplicate set iff their keys
//! compare equal. Construction is pure and deterministic given the item,
//! the grouping mode, and the normalization flags.

use serde::{Deserialize, Serialize};

use crate::catalog::LibraryItem;
use crate::duplicates::normalize::normalize;
use crate::error::PruneError;

/// Which metadata fields participate in the grouping key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupMode {
    /// Group on normalized title only.
    #[default]
    #[serde(rename = "title")]
    Title,
    /// Group on normalized (title, author).
    #[serde(rename = "title+author")]
    TitleAuthor,
    /// Group on normalized (title, series).
    #[serde(rename = "title+series")]
    TitleSeries,
}

impl std::str::FromStr for GroupMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "title" => Ok(Self::Title),
            "title+author" => Ok(Self::TitleAuthor),
            "title+series" => Ok(Self::TitleSeries),
            other => Err(format!(
                "invalid grouping mode '{other}' (expected title, title+author or title+series)"
            )),
        }
    }
}

impl std::fmt::Display for GroupMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Title => write!(f, "title"),
            Self::TitleAuthor => write!(f, "title+author"),
            Self::TitleSeries => write!(f, "title+series"),
        }
    }
}

/// The secondary component of a grouping key.
///
/// `Missing` is distinct from `Value("")`: two items both lacking a series
/// still group together under `title+series` without colliding with items
/// whose series is present but empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Secondary {
    /// The grouping mode uses no secondary field.
    NotUsed,
    /// The field is absent on the item.
    Missing,
    /// The normalized field value.
    Value(String),
}

/// Normalized grouping key. Equality defines duplicate membership.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey {
    /// Normalized title (prefix-stripped when configured).
    pub title: String,
    /// Normalized secondary field per the grouping mode.
    pub secondary: Secondary,
}

/// Derive the grouping key for `item`.
///
/// When `ignore_prefix` is set and the catalog marked a prefix-stripped
/// title, that variant is used instead of the display title.
///
/// # Errors
///
/// Returns [`PruneError::Input`] when the item has no usable title; title
/// is required for every mode.
pub fn build_key(
    item: &LibraryItem,
    mode: GroupMode,
    ignore_prefix: bool,
    case_sensitive: bool,
) -> Result<GroupKey, PruneError> {
    let raw_title = if ignore_prefix {
        item.title_ignore_prefix.as_deref().unwrap_or(&item.title)
    } else {
        &item.title
    };

    let title = normalize(raw_title, case_sensitive);
    if title.is_empty() {
        return Err(PruneError::Input {
            item_id: item.id.clone(),
            field: "title",
        });
    }

    let secondary = match mode {
        GroupMode::Title => Secondary::NotUsed,
        GroupMode::TitleAuthor => secondary_of(item.author.as_deref(), case_sensitive),
        GroupMode::TitleSeries => secondary_of(item.series.as_deref(), case_sensitive),
    };

    Ok(GroupKey { title, secondary })
}

fn secondary_of(field: Option<&str>, case_sensitive: bool) -> Secondary {
    match field {
        None => Secondary::Missing,
        Some(value) => Secondary::Value(normalize(value, case_sensitive)),
    }
}
