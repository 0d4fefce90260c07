//! Filesystem safety rails and ordered deletion primitives.
//!
//! Every file operation runs through the same pipeline: path-map
//! translation first, allow-root containment second, then the configured
//! action. Containment is componentwise (`/data2` never matches root
//! `/data`), an empty allow-root list permits nothing, and trash placement
//! never overwrites an existing destination.
//!
//! In dry-run mode (`apply = false`) every operation computes and reports
//! what it would do without mutating the filesystem.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::PruneError;

/// What to do with the files of removed items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeleteFilesMode {
    /// Leave files in place.
    #[default]
    Off,
    /// Relocate the item folder under the trash root.
    Trash,
    /// Permanently delete the item folder. Irreversible.
    Remove,
}

impl std::str::FromStr for DeleteFilesMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "trash" => Ok(Self::Trash),
            "remove" => Ok(Self::Remove),
            other => Err(format!(
                "invalid delete_files mode '{other}' (expected off, trash or remove)"
            )),
        }
    }
}

impl std::fmt::Display for DeleteFilesMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Off => write!(f, "off"),
            Self::Trash => write!(f, "trash"),
            Self::Remove => write!(f, "remove"),
        }
    }
}

/// One prefix-rewrite rule: paths under `src` are re-rooted under `dest`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathMapRule {
    /// Source prefix as the catalog reports paths (e.g. a container mount).
    pub src: PathBuf,
    /// Replacement prefix on the host running this tool.
    pub dest: PathBuf,
}

impl std::str::FromStr for PathMapRule {
    type Err = String;

    /// Parse a `src=dest` pair.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (src, dest) = s
            .split_once('=')
            .ok_or_else(|| format!("invalid path map rule '{s}' (expected src=dest)"))?;
        if src.trim().is_empty() || dest.trim().is_empty() {
            return Err(format!("invalid path map rule '{s}' (empty side)"));
        }
        Ok(Self {
            src: PathBuf::from(src.trim()),
            dest: PathBuf::from(dest.trim()),
        })
    }
}

/// Outcome of one file operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOpResult {
    /// `delete_files = off`: nothing done by design.
    SkippedDisabled,
    /// Path is outside every allow-root; nothing touched.
    SkippedOutsideRoots { path: PathBuf },
    /// Folder relocated (or, in dry-run, would be relocated) to `dest`.
    MovedToTrash { src: PathBuf, dest: PathBuf },
    /// Folder permanently removed (or would be, in dry-run).
    Removed { path: PathBuf },
    /// The operation was attempted and failed.
    Failed { path: PathBuf, reason: String },
}

/// Translate `path` through the path map.
///
/// Among the rules whose `src` is a componentwise prefix of `path`, the
/// longest prefix wins; list order breaks ties. An unmatched path is
/// returned unchanged. Must run before any containment check.
#[must_use]
pub fn apply_path_map(path: &Path, rules: &[PathMapRule]) -> PathBuf {
    // Strictly-longer only, so the first rule wins among equal prefixes.
    let mut best: Option<&PathMapRule> = None;
    for rule in rules.iter().filter(|r| path.starts_with(&r.src)) {
        let len = rule.src.components().count();
        if best.map_or(true, |b| len > b.src.components().count()) {
            best = Some(rule);
        }
    }

    match best {
        Some(rule) => {
            // starts_with above guarantees the strip succeeds
            let tail = path.strip_prefix(&rule.src).unwrap_or(path);
            rule.dest.join(tail)
        }
        None => path.to_path_buf(),
    }
}

/// Whether `path` is contained in one of `roots`.
///
/// Componentwise containment: `/data2/x` is not under root `/data`.
/// An empty root list allows nothing.
#[must_use]
pub fn is_allowed(path: &Path, roots: &[PathBuf]) -> bool {
    !roots.is_empty() && roots.iter().any(|root| path.starts_with(root))
}

/// Configured file-operation executor.
#[derive(Debug, Clone)]
pub struct FileOps {
    /// The configured action.
    pub mode: DeleteFilesMode,
    /// Root directory trash moves land under.
    pub trash_dir: PathBuf,
    /// Directories filesystem mutation is permitted under.
    pub allow_roots: Vec<PathBuf>,
    /// Prefix-rewrite rules applied before the containment check.
    pub path_map: Vec<PathMapRule>,
    /// False = dry-run: compute and report, mutate nothing.
    pub apply: bool,
}

impl FileOps {
    /// Run the configured action against `path` (already catalog-reported;
    /// the path map is applied here, before the containment check).
    #[must_use]
    pub fn perform(&self, path: &Path) -> FileOpResult {
        if self.mode == DeleteFilesMode::Off {
            return FileOpResult::SkippedDisabled;
        }

        let mapped = apply_path_map(path, &self.path_map);
        if !is_allowed(&mapped, &self.allow_roots) {
            let err = PruneError::PathSafety(mapped.clone());
            log::warn!("Skipping file op: {err}");
            return FileOpResult::SkippedOutsideRoots { path: mapped };
        }

        match self.mode {
            DeleteFilesMode::Off => unreachable!("handled above"),
            DeleteFilesMode::Trash => self.trash(&mapped),
            DeleteFilesMode::Remove => self.remove(&mapped),
        }
    }

    fn trash(&self, src: &Path) -> FileOpResult {
        let dest = self.trash_destination(src);

        if !self.apply {
            log::info!(
                "[DRY-RUN] Would move to trash: {} -> {}",
                src.display(),
                dest.display()
            );
            return FileOpResult::MovedToTrash {
                src: src.to_path_buf(),
                dest,
            };
        }

        let moved = dest
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|()| move_path(src, &dest));

        match moved {
            Ok(()) => {
                log::info!("Moved to trash: {} -> {}", src.display(), dest.display());
                FileOpResult::MovedToTrash {
                    src: src.to_path_buf(),
                    dest,
                }
            }
            Err(e) => {
                let err = PruneError::FileSystem {
                    path: src.to_path_buf(),
                    message: format!("move to {} failed: {e}", dest.display()),
                };
                log::error!("{err}");
                FileOpResult::Failed {
                    path: src.to_path_buf(),
                    reason: err.to_string(),
                }
            }
        }
    }

    fn remove(&self, path: &Path) -> FileOpResult {
        if !self.apply {
            log::info!("[DRY-RUN] Would delete: {}", path.display());
            return FileOpResult::Removed {
                path: path.to_path_buf(),
            };
        }

        let removed = if path.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        };

        match removed {
            Ok(()) => {
                log::info!("Deleted: {}", path.display());
                FileOpResult::Removed {
                    path: path.to_path_buf(),
                }
            }
            Err(e) => {
                let err = PruneError::FileSystem {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                };
                log::error!("{err}");
                FileOpResult::Failed {
                    path: path.to_path_buf(),
                    reason: err.to_string(),
                }
            }
        }
    }

    /// Compute the collision-free trash destination for `src`.
    ///
    /// The destination mirrors the source's relative structure below the
    /// nearest (longest) containing allow-root; sources outside every root
    /// fall back to their leaf name. If the destination exists, a
    /// timestamp suffix is appended, then a numeric counter until the path
    /// is unused. Never overwrites.
    #[must_use]
    pub fn trash_destination(&self, src: &Path) -> PathBuf {
        let rel: PathBuf = self
            .allow_roots
            .iter()
            .filter(|root| src.starts_with(root))
            .max_by_key(|root| root.components().count())
            .and_then(|root| src.strip_prefix(root).ok())
            .map(Path::to_path_buf)
            .or_else(|| src.file_name().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("item"));

        let dest = self.trash_dir.join(rel);
        if !dest.exists() {
            return dest;
        }

        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        let stamped = append_suffix(&dest, &stamp.to_string());
        if !stamped.exists() {
            return stamped;
        }

        let mut n = 1u32;
        loop {
            let numbered = append_suffix(&stamped, &n.to_string());
            if !numbered.exists() {
                return numbered;
            }
            n += 1;
        }
    }
}

/// Append `.suffix` to the leaf name of `path`.
fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    let name = path
        .file_name()
        .map_or_else(|| suffix.to_string(), |n| {
            format!("{}.{suffix}", n.to_string_lossy())
        });
    path.with_file_name(name)
}

/// Move a path, falling back to copy+remove when rename crosses a device
/// boundary (path-mapped mounts commonly do).
fn move_path(src: &Path, dest: &Path) -> io::Result<()> {
    match fs::rename(src, dest) {
        Ok(()) => Ok(()),
        Err(_) => {
            copy_recursive(src, dest)?;
            if src.is_dir() {
                fs::remove_dir_all(src)
            } else {
                fs::remove_file(src)
            }
        }
    }
}

fn copy_recursive(src: &Path, dest: &Path) -> io::Result<()> {
    if src.is_dir() {
        fs::create_dir_all(dest)?;
        for entry in fs::read_dir(src)? {
            let entry = entry?;
            copy_recursive(&entry.path(), &dest.join(entry.file_name()))?;
        }
        Ok(())
    } else {
        fs::copy(src, dest).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn rule(src: &str, dest: &str) -> PathMapRule {
        PathMapRule {
            src: PathBuf::from(src),
            dest: PathBuf::from(dest),
        }
    }

    fn fileops(mode: DeleteFilesMode, trash: &Path, roots: &[&Path], apply: bool) -> FileOps {
        FileOps {
            mode,
            trash_dir: trash.to_path_buf(),
            allow_roots: roots.iter().map(|r| r.to_path_buf()).collect(),
            path_map: Vec::new(),
            apply,
        }
    }

    // ==================== apply_path_map ====================

    #[test]
    fn test_path_map_basic() {
        let rules = vec![rule("/audiobooks", "/mnt/user/audiobooks")];
        assert_eq!(
            apply_path_map(Path::new("/audiobooks/Dune"), &rules),
            PathBuf::from("/mnt/user/audiobooks/Dune")
        );
    }

    #[test]
    fn test_path_map_unmatched_unchanged() {
        let rules = vec![rule("/audiobooks", "/mnt/user/audiobooks")];
        assert_eq!(
            apply_path_map(Path::new("/podcasts/Serial"), &rules),
            PathBuf::from("/podcasts/Serial")
        );
    }

    #[test]
    fn test_path_map_longest_prefix_wins() {
        let rules = vec![
            rule("/data", "/mnt/a"),
            rule("/data/books", "/mnt/b"),
        ];
        assert_eq!(
            apply_path_map(Path::new("/data/books/Dune"), &rules),
            PathBuf::from("/mnt/b/Dune")
        );
        assert_eq!(
            apply_path_map(Path::new("/data/other"), &rules),
            PathBuf::from("/mnt/a/other")
        );
    }

    #[test]
    fn test_path_map_componentwise_not_string_prefix() {
        let rules = vec![rule("/data", "/mnt/a")];
        assert_eq!(
            apply_path_map(Path::new("/data2/Dune"), &rules),
            PathBuf::from("/data2/Dune")
        );
    }

    #[test]
    fn test_path_map_equal_prefix_first_rule_wins() {
        let rules = vec![rule("/data", "/mnt/a"), rule("/data", "/mnt/b")];
        assert_eq!(
            apply_path_map(Path::new("/data/Dune"), &rules),
            PathBuf::from("/mnt/a/Dune")
        );
    }

    #[test]
    fn test_path_map_rule_parse() {
        let r: PathMapRule = "/audiobooks=/mnt/user/audiobooks".parse().unwrap();
        assert_eq!(r.src, PathBuf::from("/audiobooks"));
        assert_eq!(r.dest, PathBuf::from("/mnt/user/audiobooks"));

        assert!("no-equals".parse::<PathMapRule>().is_err());
        assert!("=dest".parse::<PathMapRule>().is_err());
    }

    // ==================== is_allowed ====================

    #[test]
    fn test_is_allowed_empty_roots_allows_nothing() {
        assert!(!is_allowed(Path::new("/anywhere"), &[]));
    }

    #[test]
    fn test_is_allowed_containment() {
        let roots = vec![PathBuf::from("/mnt/user/audiobooks")];
        assert!(is_allowed(Path::new("/mnt/user/audiobooks/Dune"), &roots));
        assert!(is_allowed(Path::new("/mnt/user/audiobooks"), &roots));
        assert!(!is_allowed(Path::new("/mnt/user/music/Dune"), &roots));
    }

    #[test]
    fn test_is_allowed_no_naive_string_prefix() {
        let roots = vec![PathBuf::from("/data")];
        assert!(is_allowed(Path::new("/data/book"), &roots));
        assert!(!is_allowed(Path::new("/data2/book"), &roots));
    }

    #[test]
    fn test_path_map_changes_allowed_outcome() {
        // A container path maps into an allow-root.
        let rules = vec![rule("/audiobooks", "/mnt/user/audiobooks")];
        let roots = vec![PathBuf::from("/mnt/user/audiobooks")];
        let original = Path::new("/audiobooks/Dune");

        assert!(!is_allowed(original, &roots));
        let mapped = apply_path_map(original, &rules);
        assert_eq!(mapped, PathBuf::from("/mnt/user/audiobooks/Dune"));
        assert!(is_allowed(&mapped, &roots));
    }

    // ==================== trash destination ====================

    #[test]
    fn test_trash_destination_mirrors_root_relative_path() {
        let tmp = TempDir::new().unwrap();
        let trash = tmp.path().join("trash");
        let root = tmp.path().join("library");
        let ops = fileops(DeleteFilesMode::Trash, &trash, &[&root], false);

        let src = root.join("Herbert/Dune");
        assert_eq!(ops.trash_destination(&src), trash.join("Herbert/Dune"));
    }

    #[test]
    fn test_trash_destination_basename_fallback() {
        let tmp = TempDir::new().unwrap();
        let trash = tmp.path().join("trash");
        let root = tmp.path().join("library");
        let ops = fileops(DeleteFilesMode::Trash, &trash, &[&root], false);

        let src = Path::new("/elsewhere/Dune");
        assert_eq!(ops.trash_destination(src), trash.join("Dune"));
    }

    #[test]
    fn test_trash_destination_never_collides() {
        let tmp = TempDir::new().unwrap();
        let trash = tmp.path().join("trash");
        let root = tmp.path().join("library");
        let ops = fileops(DeleteFilesMode::Trash, &trash, &[&root], true);

        // Occupy the natural destination.
        fs::create_dir_all(trash.join("Dune")).unwrap();

        let src = root.join("Dune");
        let dest = ops.trash_destination(&src);
        assert_ne!(dest, trash.join("Dune"));
        assert!(!dest.exists());
        assert!(dest
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("Dune."));
    }

    // ==================== perform ====================

    #[test]
    fn test_perform_off_is_noop() {
        let tmp = TempDir::new().unwrap();
        let ops = fileops(DeleteFilesMode::Off, tmp.path(), &[tmp.path()], true);
        assert_eq!(
            ops.perform(Path::new("/anything")),
            FileOpResult::SkippedDisabled
        );
    }

    #[test]
    fn test_perform_outside_roots_skipped_in_all_modes() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("library");
        for mode in [DeleteFilesMode::Trash, DeleteFilesMode::Remove] {
            let ops = fileops(mode, tmp.path(), &[&root], true);
            let result = ops.perform(Path::new("/outside/Dune"));
            assert!(matches!(result, FileOpResult::SkippedOutsideRoots { .. }));
        }
    }

    #[test]
    fn test_perform_trash_dry_run_reports_without_mutating() {
        // Trash + dry-run computes the destination, touches nothing.
        let tmp = TempDir::new().unwrap();
        let trash = tmp.path().join("trash");
        let root = tmp.path().join("library");
        let src = root.join("Dune");
        fs::create_dir_all(&src).unwrap();

        let ops = fileops(DeleteFilesMode::Trash, &trash, &[&root], false);
        let result = ops.perform(&src);

        match result {
            FileOpResult::MovedToTrash { dest, .. } => {
                assert_eq!(dest, trash.join("Dune"));
                assert!(!dest.exists(), "dry-run must not create the destination");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(src.exists(), "dry-run must not move the source");
    }

    #[test]
    fn test_perform_trash_apply_moves_folder() {
        let tmp = TempDir::new().unwrap();
        let trash = tmp.path().join("trash");
        let root = tmp.path().join("library");
        let src = root.join("Herbert/Dune");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("book.m4b"), b"audio").unwrap();

        let ops = fileops(DeleteFilesMode::Trash, &trash, &[&root], true);
        let result = ops.perform(&src);

        let dest = trash.join("Herbert/Dune");
        assert_eq!(
            result,
            FileOpResult::MovedToTrash {
                src: src.clone(),
                dest: dest.clone(),
            }
        );
        assert!(!src.exists());
        assert!(dest.join("book.m4b").exists());
    }

    #[test]
    fn test_perform_trash_collision_preserves_existing() {
        let tmp = TempDir::new().unwrap();
        let trash = tmp.path().join("trash");
        let root = tmp.path().join("library");
        let src = root.join("Dune");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("new.m4b"), b"new").unwrap();

        // Pre-existing trash entry with the same relative path.
        fs::create_dir_all(trash.join("Dune")).unwrap();
        fs::write(trash.join("Dune/old.m4b"), b"old").unwrap();

        let ops = fileops(DeleteFilesMode::Trash, &trash, &[&root], true);
        let result = ops.perform(&src);

        match result {
            FileOpResult::MovedToTrash { dest, .. } => {
                assert_ne!(dest, trash.join("Dune"));
                assert!(dest.join("new.m4b").exists());
            }
            other => panic!("unexpected result: {other:?}"),
        }
        // The occupant was not overwritten.
        assert!(trash.join("Dune/old.m4b").exists());
    }

    #[test]
    fn test_perform_remove_dry_run_and_apply() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("library");
        let src = root.join("Dune");
        fs::create_dir_all(&src).unwrap();

        let dry = fileops(DeleteFilesMode::Remove, tmp.path(), &[&root], false);
        assert_eq!(
            dry.perform(&src),
            FileOpResult::Removed { path: src.clone() }
        );
        assert!(src.exists());

        let wet = fileops(DeleteFilesMode::Remove, tmp.path(), &[&root], true);
        assert_eq!(
            wet.perform(&src),
            FileOpResult::Removed { path: src.clone() }
        );
        assert!(!src.exists());
    }

    #[test]
    fn test_perform_remove_missing_source_fails() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("library");
        fs::create_dir_all(&root).unwrap();

        let ops = fileops(DeleteFilesMode::Remove, tmp.path(), &[&root], true);
        let result = ops.perform(&root.join("Ghost"));
        assert!(matches!(result, FileOpResult::Failed { .. }));
    }

    #[test]
    fn test_failed_op_reason_carries_filesystem_error() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("library");
        fs::create_dir_all(&root).unwrap();
        let missing = root.join("Ghost");

        let ops = fileops(DeleteFilesMode::Remove, tmp.path(), &[&root], true);
        match ops.perform(&missing) {
            FileOpResult::Failed { path, reason } => {
                assert_eq!(path, missing);
                // The recorded reason is the FileSystem error's display text.
                assert!(reason.contains("file operation failed for"), "reason: {reason}");
                assert!(reason.contains("Ghost"), "reason: {reason}");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_move_path_copy_fallback_shape() {
        // Same filesystem here, but exercise the copy path directly.
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir_all(src.join("sub")).unwrap();
        fs::write(src.join("sub/a.txt"), b"a").unwrap();

        let dest = tmp.path().join("dest");
        copy_recursive(&src, &dest).unwrap();
        assert!(dest.join("sub/a.txt").exists());
        assert!(src.exists());
    }
}
