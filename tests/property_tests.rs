use proptest::prelude::*;
use shelfprune::catalog::{LibraryItem, MediaFile};
use shelfprune::duplicates::{normalize, resolve, GroupMode};
use shelfprune::prune::decision::{decide, KeepPrompt, PruneDecision};
use shelfprune::prune::fileops::{apply_path_map, is_allowed, PathMapRule};
use std::collections::HashSet;
use std::path::PathBuf;

/// Prompt that must never fire: all decisions below run in automatic mode.
struct PanicPrompt;

impl KeepPrompt for PanicPrompt {
    fn choose(
        &mut self,
        _set: &shelfprune::duplicates::DuplicateSet,
        _formats: &[(String, String)],
        _default_id: &str,
    ) -> Result<String, shelfprune::error::PruneError> {
        panic!("prompt must not run in automatic mode");
    }
}

fn arb_item() -> impl Strategy<Value = LibraryItem> {
    // A small title pool so generated libraries actually contain duplicates.
    let title = prop::sample::select(vec!["Dune", "Hyperion", "Solaris", "Contact"]);
    let ext = prop::option::of(prop::sample::select(vec!["m4b", "mp3", "flac", "mp4"]));
    (title, ext, 0i64..10_000).prop_map(|(title, ext, added_at)| LibraryItem {
        title: title.to_string(),
        added_at,
        files: ext
            .into_iter()
            .map(|e| MediaFile {
                ext: Some(e.to_string()),
                mime: None,
                path: None,
            })
            .collect(),
        ..Default::default()
    })
}

fn arb_library() -> impl Strategy<Value = Vec<LibraryItem>> {
    prop::collection::vec(arb_item(), 0..30).prop_map(|mut items| {
        for (i, item) in items.iter_mut().enumerate() {
            item.id = format!("item-{i:03}");
        }
        items
    })
}

proptest! {
    #[test]
    fn test_resolve_determinism(items in arb_library()) {
        let first = resolve(&items, GroupMode::Title, false, false);
        let second = resolve(&items, GroupMode::Title, false, false);

        prop_assert_eq!(first.sets.len(), second.sets.len());
        for (a, b) in first.sets.iter().zip(second.sets.iter()) {
            prop_assert_eq!(&a.key, &b.key);
            prop_assert_eq!(&a.keeper_id, &b.keeper_id);
            let ids_a: Vec<&str> = a.items.iter().map(|it| it.id.as_str()).collect();
            let ids_b: Vec<&str> = b.items.iter().map(|it| it.id.as_str()).collect();
            prop_assert_eq!(ids_a, ids_b);
        }
    }

    #[test]
    fn test_resolve_partition_invariants(items in arb_library()) {
        let outcome = resolve(&items, GroupMode::Title, false, false);

        let mut seen_keys = HashSet::new();
        let mut seen_ids = HashSet::new();
        for set in &outcome.sets {
            // Invariant: a duplicate set holds at least two members
            prop_assert!(set.len() >= 2);
            // Invariant: exactly one key per set, never repeated
            prop_assert!(seen_keys.insert(set.key.clone()));
            // Invariant: the keeper is a member, and no item appears twice
            prop_assert!(set.items.iter().any(|it| it.id == set.keeper_id));
            for item in &set.items {
                prop_assert!(seen_ids.insert(item.id.clone()));
            }
            // Invariant: the keeper is minimal by (added_at, id)
            let keeper = set.keeper();
            for item in &set.items {
                prop_assert!(
                    (keeper.added_at, keeper.id.as_str())
                        <= (item.added_at, item.id.as_str())
                );
            }
        }

        // Invariant: grouped + skipped never exceeds the input
        let grouped: usize = outcome.sets.iter().map(|s| s.len()).sum();
        prop_assert!(grouped + outcome.skipped.len() <= items.len());
    }

    #[test]
    fn test_decision_exhaustive_and_disjoint(items in arb_library()) {
        let preferred = vec!["m4b".to_string(), "mp3".to_string()];
        for set in resolve(&items, GroupMode::Title, false, false).sets {
            let PruneDecision { keep_id, remove_ids, .. } =
                decide(&set, &preferred, true, &mut PanicPrompt).unwrap();

            // Invariant: keep + remove covers the whole set, disjointly
            prop_assert_eq!(remove_ids.len() + 1, set.len());
            prop_assert!(!remove_ids.contains(&keep_id));
            prop_assert!(set.items.iter().any(|it| it.id == keep_id));
            for id in &remove_ids {
                prop_assert!(set.items.iter().any(|it| &it.id == id));
            }
        }
    }

    #[test]
    fn test_normalize_idempotent(text in "[a-zA-ZÀ-ÿ0-9 ',.:-]{0,60}") {
        let once = normalize(&text, false);
        let twice = normalize(&once, false);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn test_normalize_whitespace_insensitive(words in prop::collection::vec("[a-zA-Z]{1,8}", 1..6)) {
        let single = words.join(" ");
        let sloppy = words.join("   ");
        prop_assert_eq!(normalize(&single, false), normalize(&sloppy, false));
    }

    #[test]
    fn test_path_map_unmatched_is_identity(tail in "[a-z]{1,10}(/[a-z]{1,10}){0,3}") {
        let rules = vec![PathMapRule {
            src: PathBuf::from("/audiobooks"),
            dest: PathBuf::from("/mnt/user/audiobooks"),
        }];
        let path = PathBuf::from("/elsewhere").join(&tail);
        prop_assert_eq!(apply_path_map(&path, &rules), path);
    }

    #[test]
    fn test_path_map_lands_under_dest(tail in "[a-z]{1,10}(/[a-z]{1,10}){0,3}") {
        let dest = PathBuf::from("/mnt/user/audiobooks");
        let rules = vec![PathMapRule {
            src: PathBuf::from("/audiobooks"),
            dest: dest.clone(),
        }];
        let mapped = apply_path_map(&PathBuf::from("/audiobooks").join(&tail), &rules);
        prop_assert!(mapped.starts_with(&dest));
        prop_assert!(is_allowed(&mapped, &[dest]));
    }

    #[test]
    fn test_empty_roots_allow_nothing(tail in "[a-z]{1,10}(/[a-z]{1,10}){0,3}") {
        prop_assert!(!is_allowed(&PathBuf::from("/").join(tail), &[]));
    }
}
