//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/rsinvoke/rsinvoke.toml`
//! 3. Project config: nearest `rsinvoke.toml`, or `[package.metadata.rsinvoke]`
//!    / `[workspace.metadata.rsinvoke]` in a `Cargo.toml`, searched upward
//! 4. Environment variables: `RSINVOKE_*` prefix
//! 5. Command line overrides (applied by the caller)

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::{ApplicationError, ApplicationResult, ConfigResultExt};
use crate::util::path::resolve_against;

/// File name of the dedicated project config.
pub const PROJECT_CONFIG_FILE: &str = "rsinvoke.toml";
/// Table name below `package.metadata` / `workspace.metadata` in `Cargo.toml`.
pub const CARGO_METADATA_KEY: &str = "rsinvoke";
const ENV_PREFIX: &str = "RSINVOKE";

/// Raw settings for intermediate parsing (every field optional).
///
/// Used during layered config merging to distinguish between:
/// - `None` → field not specified, inherit from base
/// - `Some([])` → explicit empty array
/// - `Some([...])` → explicit values to merge
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct RawSettings {
    pub root: Option<String>,
    pub recursive: Option<bool>,
    pub extensions: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
    pub shell: Option<String>,
    pub shell_args: Option<Vec<String>>,
}

/// Unified configuration for rsinvoke.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Discovery root; relative paths are anchored at the project directory
    pub root: PathBuf,
    /// Descend into sub-directories of the root
    pub recursive: bool,
    /// File extensions (without dot) that mark script files
    pub extensions: Vec<String>,
    /// File or directory names skipped during discovery
    pub exclude: Vec<String>,
    /// Program running command bodies
    pub shell: String,
    /// Arguments placed before the rendered command body
    pub shell_args: Vec<String>,
    /// Directory relative paths are resolved against
    #[serde(skip)]
    pub project_dir: PathBuf,
    /// Project config file that contributed, if any
    #[serde(skip)]
    pub project_config: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("tasks"),
            recursive: true,
            extensions: vec!["toml".into()],
            exclude: vec![],
            shell: "sh".into(),
            shell_args: vec!["-c".into()],
            project_dir: PathBuf::from("."),
            project_config: None,
        }
    }
}

/// Get the XDG config directory for rsinvoke.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "rsinvoke").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join(PROJECT_CONFIG_FILE))
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> ApplicationResult<RawSettings> {
    let content = std::fs::read_to_string(path).config_context("read", path)?;
    toml::from_str(&content).config_context("parse", path)
}

/// Read the `rsinvoke` metadata table of a `Cargo.toml`, if it has one.
fn load_cargo_metadata(path: &Path) -> ApplicationResult<Option<RawSettings>> {
    let content = std::fs::read_to_string(path).config_context("read", path)?;
    let manifest: toml::Table = toml::from_str(&content).config_context("parse", path)?;

    let section = ["package", "workspace"].iter().find_map(|key| {
        manifest
            .get(*key)?
            .get("metadata")?
            .get(CARGO_METADATA_KEY)
            .cloned()
    });
    match section {
        Some(value) => value
            .try_into::<RawSettings>()
            .config_context("parse metadata in", path)
            .map(Some),
        None => Ok(None),
    }
}

/// Walk up from `start` to the first directory carrying project config.
///
/// `rsinvoke.toml` wins over `Cargo.toml` in the same directory; a
/// `Cargo.toml` without an `rsinvoke` metadata table does not stop the search.
pub fn find_project_config(start: &Path) -> ApplicationResult<Option<(PathBuf, RawSettings)>> {
    for dir in start.ancestors() {
        let dedicated = dir.join(PROJECT_CONFIG_FILE);
        if dedicated.is_file() {
            let raw = load_raw_settings(&dedicated)?;
            return Ok(Some((dedicated, raw)));
        }

        let cargo = dir.join("Cargo.toml");
        if cargo.is_file() {
            if let Some(raw) = load_cargo_metadata(&cargo)? {
                return Ok(Some((cargo, raw)));
            }
        }
    }
    Ok(None)
}

impl Settings {
    /// Merge arrays with union semantics and negation support.
    ///
    /// - Items from overlay are added to base
    /// - Items prefixed with `!` remove the corresponding item from the result
    /// - Duplicates are de-duplicated
    ///
    /// # Examples
    /// ```ignore
    /// merge_array(&["a", "b"], &["c"])       // → ["a", "b", "c"]
    /// merge_array(&["a", "b"], &["!a", "c"]) // → ["b", "c"]
    /// ```
    pub fn merge_array(base: &[String], overlay: &[String]) -> Vec<String> {
        let mut result: HashSet<String> = base.iter().cloned().collect();

        for pattern in overlay {
            if let Some(negated) = pattern.strip_prefix('!') {
                result.remove(negated);
            } else {
                result.insert(pattern.clone());
            }
        }

        // Convert to sorted Vec for deterministic output
        let mut vec: Vec<String> = result.into_iter().collect();
        vec.sort();
        vec
    }

    /// Merge project config onto self (base).
    ///
    /// - Scalar options: overlay wins if Some, otherwise keep base
    /// - `extensions`, `exclude`: union merge with negation support
    /// - `shell_args`: replaced, argument order matters
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            root: overlay
                .root
                .as_ref()
                .map(PathBuf::from)
                .unwrap_or_else(|| self.root.clone()),
            recursive: overlay.recursive.unwrap_or(self.recursive),
            extensions: overlay
                .extensions
                .as_ref()
                .map(|o| Self::merge_array(&self.extensions, o))
                .unwrap_or_else(|| self.extensions.clone()),
            exclude: overlay
                .exclude
                .as_ref()
                .map(|o| Self::merge_array(&self.exclude, o))
                .unwrap_or_else(|| self.exclude.clone()),
            shell: overlay.shell.clone().unwrap_or_else(|| self.shell.clone()),
            shell_args: overlay
                .shell_args
                .clone()
                .unwrap_or_else(|| self.shell_args.clone()),
            project_dir: self.project_dir.clone(),
            project_config: self.project_config.clone(),
        }
    }

    /// Apply global config onto defaults.
    ///
    /// Unlike `merge_with()`, arrays use REPLACE semantics: global config
    /// defines the baseline, project config adds to it.
    fn apply_global(&self, global: &RawSettings) -> Self {
        Self {
            root: global
                .root
                .as_ref()
                .map(PathBuf::from)
                .unwrap_or_else(|| self.root.clone()),
            recursive: global.recursive.unwrap_or(self.recursive),
            extensions: global
                .extensions
                .clone()
                .unwrap_or_else(|| self.extensions.clone()),
            exclude: global.exclude.clone().unwrap_or_else(|| self.exclude.clone()),
            shell: global.shell.clone().unwrap_or_else(|| self.shell.clone()),
            shell_args: global
                .shell_args
                .clone()
                .unwrap_or_else(|| self.shell_args.clone()),
            project_dir: self.project_dir.clone(),
            project_config: self.project_config.clone(),
        }
    }

    /// Load settings with layered precedence, searching project config from `start`.
    ///
    /// # Array Merge Semantics
    /// - Defaults → Global: REPLACE
    /// - Global → Project: UNION with negation support (`shell_args` replaces)
    /// - Any → Env vars: REPLACE
    pub fn load(start: &Path) -> ApplicationResult<Self> {
        let global = match global_config_path() {
            Some(path) if path.is_file() => Some(load_raw_settings(&path)?),
            _ => None,
        };
        let project = find_project_config(start)?;
        let mut settings = Self::from_layers(start, global.as_ref(), project)?;
        settings = Self::apply_env_overrides(settings, None)?;
        settings.resolve_root()?;
        debug!(
            "Settings::load: root={} project_config={:?}",
            settings.root.display(),
            settings.project_config
        );
        Ok(settings)
    }

    /// Combine defaults, global and project layers without touching the environment.
    pub fn from_layers(
        start: &Path,
        global: Option<&RawSettings>,
        project: Option<(PathBuf, RawSettings)>,
    ) -> ApplicationResult<Self> {
        let mut current = Self {
            project_dir: start.to_path_buf(),
            ..Self::default()
        };

        if let Some(raw) = global {
            current = current.apply_global(raw);
        }

        if let Some((path, raw)) = project {
            current = current.merge_with(&raw);
            current.project_dir = path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| start.to_path_buf());
            current.project_config = Some(path);
        }
        Ok(current)
    }

    /// Apply RSINVOKE_* environment variables as explicit overrides.
    ///
    /// Lists are comma separated: `RSINVOKE_EXCLUDE=target,node_modules`.
    /// `vars` replaces the process environment when given.
    pub fn apply_env_overrides(
        mut settings: Self,
        vars: Option<HashMap<String, String>>,
    ) -> ApplicationResult<Self> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .source(vars)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("extensions")
                    .with_list_parse_key("exclude")
                    .with_list_parse_key("shell_args"),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("root") {
            settings.root = PathBuf::from(val);
        }
        if let Ok(val) = config.get_bool("recursive") {
            settings.recursive = val;
        }
        if let Ok(val) = config.get::<Vec<String>>("extensions") {
            settings.extensions = val;
        }
        if let Ok(val) = config.get::<Vec<String>>("exclude") {
            settings.exclude = val;
        }
        if let Ok(val) = config.get_string("shell") {
            settings.shell = val;
        }
        if let Ok(val) = config.get::<Vec<String>>("shell_args") {
            settings.shell_args = val;
        }

        Ok(settings)
    }

    /// Anchor `root` at the project directory, expanding `~` and `$VAR`.
    pub fn resolve_root(&mut self) -> ApplicationResult<()> {
        let raw = self.root.to_string_lossy().into_owned();
        self.root = resolve_against(&self.project_dir, &raw)
            .map_err(|e| ApplicationError::config(format!("expand root `{raw}`: {e}")))?;
        Ok(())
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> ApplicationResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| ApplicationError::config(format!("serialize config: {e}")))
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# rsinvoke configuration
#
# Locations (by precedence, lowest to highest):
#   Global:  ~/.config/rsinvoke/rsinvoke.toml     (defines your baseline)
#   Project: nearest rsinvoke.toml, or [package.metadata.rsinvoke] in Cargo.toml
#   Env:     RSINVOKE_* environment variables     (explicit overrides)
#
# Array Merge Semantics:
#   Global config REPLACES compiled defaults.
#   Project config UNIONS with global; "!item" removes an inherited item:
#     exclude = ["target", "!fixtures"]

# Directory scanned for script files, relative to the project directory
# root = "tasks"

# Descend into sub-directories (nested directories become nested groups)
# recursive = true

# File extensions of script files
# extensions = ["toml"]

# File or directory names never scanned
# exclude = []

# Program and leading arguments used to run command bodies
# shell = "sh"
# shell_args = ["-c"]
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::config(e.to_string())
}
