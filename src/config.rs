//! Layered run configuration.
//!
//! Options merge in precedence order: built-in defaults < TOML config file
//! < `SHELFPRUNE_*` environment variables < CLI flags. The merged value is
//! immutable for the rest of the run and threaded explicitly into each
//! component; nothing reads ambient state after loading.
//!
//! The config file is looked up from `--config`, then `$SHELFPRUNE_CONFIG`,
//! then the platform config dir (e.g. `~/.config/shelfprune/config.toml`).

use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::cli::Cli;
use crate::duplicates::GroupMode;
use crate::prune::fileops::{DeleteFilesMode, PathMapRule};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "SHELFPRUNE_CONFIG";

/// Fully resolved run options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Catalog base URL (e.g. `https://abs.example.org`). Required.
    pub base_url: Option<String>,
    /// Catalog API token. Required.
    pub token: Option<String>,
    /// Libraries to process: ids, exact names, or `ALL`. Empty = all book
    /// libraries.
    pub libraries: Vec<String>,
    /// Skip TLS certificate verification.
    pub insecure: bool,

    /// Grouping mode.
    pub by: GroupMode,
    /// Compare titles/authors/series case-sensitively.
    pub case_sensitive: bool,
    /// Do not use the catalog's prefix-stripped title when grouping.
    pub no_ignore_prefixes: bool,

    /// Duplicate tag text.
    pub tag: String,
    /// Tag every copy, including the keeper.
    pub tag_all: bool,

    /// Enable the deletion workflow.
    pub prune: bool,
    /// Skip prompts; decide from `preferred_formats`.
    pub assume_yes: bool,
    /// Format priority for automatic decisions.
    pub preferred_formats: Vec<String>,
    /// Remove the duplicate tag from the kept copy after pruning.
    pub clean_tags_after_prune: bool,

    /// Write changes. False = dry run.
    pub apply: bool,
    /// What to do with files of removed items.
    pub delete_files: DeleteFilesMode,
    /// Where trashed items land. Defaults to the platform data dir.
    pub trash_dir: Option<PathBuf>,
    /// Absolute directories file mutation is permitted under.
    pub allow_roots: Vec<PathBuf>,
    /// Prefix-rewrite rules applied before safety checks.
    pub path_map: Vec<PathMapRule>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            base_url: None,
            token: None,
            libraries: Vec::new(),
            insecure: false,
            by: GroupMode::Title,
            case_sensitive: false,
            no_ignore_prefixes: false,
            tag: "Duplicate".to_string(),
            tag_all: false,
            prune: false,
            assume_yes: false,
            preferred_formats: vec!["m4b".to_string(), "mp3".to_string()],
            clean_tags_after_prune: true,
            apply: false,
            delete_files: DeleteFilesMode::Off,
            trash_dir: None,
            allow_roots: Vec::new(),
            path_map: Vec::new(),
        }
    }
}

impl Options {
    /// Load options for this invocation.
    ///
    /// # Errors
    ///
    /// Fails when the config file is malformed or a required option
    /// (`base_url`, `token`) is missing after merging all layers.
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(path) = config_file_path(cli) {
            log::debug!("Loading config file: {}", path.display());
            figment = figment.merge(Toml::file(path));
        }
        figment = figment.merge(Env::prefixed("SHELFPRUNE_").ignore(&["config"]));

        let mut options: Self = figment
            .extract()
            .context("failed to load configuration")?;
        options.merge_cli(cli);
        options.finalize()?;
        Ok(options)
    }

    /// Overlay CLI flags. Value flags override when present; boolean
    /// flags only ever enable.
    fn merge_cli(&mut self, cli: &Cli) {
        if let Some(v) = &cli.base_url {
            self.base_url = Some(v.clone());
        }
        if let Some(v) = &cli.token {
            self.token = Some(v.clone());
        }
        if !cli.libraries.is_empty() {
            self.libraries = cli.libraries.clone();
        }
        if let Some(v) = cli.by {
            self.by = v;
        }
        if let Some(v) = &cli.tag {
            self.tag = v.clone();
        }
        if !cli.preferred_formats.is_empty() {
            self.preferred_formats = cli.preferred_formats.clone();
        }
        if let Some(v) = cli.delete_files {
            self.delete_files = v;
        }
        if let Some(v) = &cli.trash_dir {
            self.trash_dir = Some(v.clone());
        }
        if !cli.allow_roots.is_empty() {
            self.allow_roots = cli.allow_roots.clone();
        }
        if !cli.path_map.is_empty() {
            self.path_map = cli.path_map.clone();
        }

        self.insecure |= cli.insecure;
        self.case_sensitive |= cli.case_sensitive;
        self.no_ignore_prefixes |= cli.no_ignore_prefixes;
        self.tag_all |= cli.tag_all;
        self.prune |= cli.prune;
        self.assume_yes |= cli.assume_yes;
        self.apply |= cli.apply;
        self.clean_tags_after_prune |= cli.clean_tags_after_prune;
    }

    /// Normalize and validate the merged options.
    fn finalize(&mut self) -> Result<()> {
        let mut missing = Vec::new();
        if self.base_url.as_deref().map_or(true, str::is_empty) {
            missing.push("base_url (--base-url or config)");
        }
        if self.token.as_deref().map_or(true, str::is_empty) {
            missing.push("token (--token, $SHELFPRUNE_TOKEN or config)");
        }
        if !missing.is_empty() {
            bail!("missing required option(s): {}", missing.join(", "));
        }

        self.preferred_formats = self
            .preferred_formats
            .iter()
            .map(|f| f.trim().to_lowercase())
            .filter(|f| !f.is_empty())
            .collect();
        if self.preferred_formats.is_empty() {
            self.preferred_formats = vec!["m4b".to_string(), "mp3".to_string()];
        }

        if self.trash_dir.is_none() {
            self.trash_dir = Some(default_trash_dir());
        }
        Ok(())
    }

    /// Whether the catalog's prefix-stripped title is used for grouping.
    #[must_use]
    pub fn ignore_prefix(&self) -> bool {
        !self.no_ignore_prefixes
    }

    /// The resolved trash directory. `finalize` guarantees presence.
    #[must_use]
    pub fn trash_dir(&self) -> PathBuf {
        self.trash_dir
            .clone()
            .unwrap_or_else(default_trash_dir)
    }
}

fn config_file_path(cli: &Cli) -> Option<PathBuf> {
    if let Some(path) = &cli.config {
        return Some(path.clone());
    }
    if let Ok(path) = env::var(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    let default = ProjectDirs::from("org", "shelfprune", "shelfprune")?
        .config_dir()
        .join("config.toml");
    default.exists().then_some(default)
}

fn default_trash_dir() -> PathBuf {
    ProjectDirs::from("org", "shelfprune", "shelfprune").map_or_else(
        || PathBuf::from(".shelfprune-trash"),
        |dirs| dirs.data_dir().join("trash"),
    )
}
