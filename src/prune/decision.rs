//! Keep/delete decisioning within a duplicate set.
//!
//! Two strategies behind one contract: automatic mode scans the configured
//! preferred-format list, interactive mode defers to an injected
//! [`KeepPrompt`]. Either way the decision keeps exactly one item and
//! removes the other `|set| - 1`.

use crate::duplicates::resolver::{choose_keeper, DuplicateSet};
use crate::duplicates::{resolve_format, UNKNOWN_FORMAT};
use crate::error::PruneError;

/// How a decision was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionMode {
    /// Preferred-format scan, no operator involved.
    Automatic,
    /// Operator chose the keep target through a [`KeepPrompt`].
    Interactive,
}

/// The resolved keep/remove split for one duplicate set.
#[derive(Debug, Clone)]
pub struct PruneDecision {
    /// Item retained.
    pub keep_id: String,
    /// Items to remove, in set order. Always `set.len() - 1` entries.
    pub remove_ids: Vec<String>,
    /// Resolved format of the kept item.
    pub keep_format: String,
    /// How the decision was made.
    pub mode: DecisionMode,
    /// Which preferred-format entry matched in automatic mode. `None` in
    /// automatic mode records the explicit keep-the-oldest fallback;
    /// always `None` in interactive mode.
    pub matched_format: Option<String>,
}

/// Operator-facing prompt for interactive mode.
///
/// Implementations block until answered; the engine never reads stdin
/// itself. The keeper-by-date is passed as the suggested default but the
/// returned choice is authoritative.
pub trait KeepPrompt {
    /// Choose the item to keep from `set`.
    ///
    /// `formats` pairs each member id with its resolved format label, in
    /// set order. The returned id must be a member of the set.
    ///
    /// # Errors
    ///
    /// Returns [`PruneError::Input`] when no valid choice can be obtained.
    fn choose(
        &mut self,
        set: &DuplicateSet,
        formats: &[(String, String)],
        default_id: &str,
    ) -> Result<String, PruneError>;
}

/// Decide which copy of `set` to keep.
///
/// Automatic mode (`assume_yes`): the first entry of `preferred_formats`
/// present among the set's resolved formats wins, and the oldest item
/// carrying it becomes the keep target. When none is present the existing
/// keeper (oldest item) is kept and the fallback is recorded via
/// `matched_format = None`.
///
/// Interactive mode: `prompt` picks the keep target; the keeper-by-date is
/// offered as the default but not enforced.
///
/// # Errors
///
/// Returns [`PruneError::Input`] when an interactive prompt yields an id
/// outside the set, or fails outright.
pub fn decide(
    set: &DuplicateSet,
    preferred_formats: &[String],
    assume_yes: bool,
    prompt: &mut dyn KeepPrompt,
) -> Result<PruneDecision, PruneError> {
    let formats: Vec<(String, String)> = set
        .items
        .iter()
        .map(|it| (it.id.clone(), resolve_format(it)))
        .collect();

    let (keep_id, mode, matched_format) = if assume_yes {
        automatic_keep(set, &formats, preferred_formats)
    } else {
        let chosen = prompt.choose(set, &formats, &set.keeper_id)?;
        if !set.items.iter().any(|it| it.id == chosen) {
            return Err(PruneError::Input {
                item_id: chosen,
                field: "keep choice",
            });
        }
        (chosen, DecisionMode::Interactive, None)
    };

    let keep_format = formats
        .iter()
        .find(|(id, _)| *id == keep_id)
        .map_or_else(|| UNKNOWN_FORMAT.to_string(), |(_, f)| f.clone());

    let remove_ids: Vec<String> = set
        .items
        .iter()
        .filter(|it| it.id != keep_id)
        .map(|it| it.id.clone())
        .collect();
    debug_assert_eq!(remove_ids.len() + 1, set.len());

    Ok(PruneDecision {
        keep_id,
        remove_ids,
        keep_format,
        mode,
        matched_format,
    })
}

fn automatic_keep(
    set: &DuplicateSet,
    formats: &[(String, String)],
    preferred: &[String],
) -> (String, DecisionMode, Option<String>) {
    for wanted in preferred {
        let matching: Vec<_> = set
            .items
            .iter()
            .zip(formats.iter())
            .filter(|(_, (_, fmt))| fmt == wanted)
            .map(|(item, _)| item.clone())
            .collect();
        if !matching.is_empty() {
            let keep = choose_keeper(&matching).id.clone();
            log::info!(
                "Keeping {wanted} (auto) for '{}': {keep}",
                set.key.title
            );
            return (keep, DecisionMode::Automatic, Some(wanted.clone()));
        }
    }

    // No preferred format present: keep the oldest item. Recorded, not
    // silent.
    log::info!(
        "No preferred format present for '{}': keeping oldest ({})",
        set.key.title,
        set.keeper_id
    );
    (set.keeper_id.clone(), DecisionMode::Automatic, None)
}
