//! Configuration management for splice.
//!
//! Parses `splice.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories. Hosts embedding the
//! engine can build the same [`IncludeConfig`] from an in-memory TOML table
//! with [`IncludeConfig::from_table`].
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! Unknown keys and values of the wrong type are rejected while
//! deserializing. Recursion policy fields are tri-state and accept either a
//! boolean or `"neutral"` (see [`RecursionPolicy`]); every other field only
//! accepts values of its own type.

mod policy;

pub use policy::RecursionPolicy;

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override base path for relative includes.
    pub base_path: Option<PathBuf>,
    /// Override default encoding.
    pub encoding: Option<String>,
    /// Override local inclusion flag.
    pub allow_local: Option<bool>,
    /// Override remote inclusion flag.
    pub allow_remote: Option<bool>,
    /// Override failure policy.
    pub truncate_on_failure: Option<bool>,
}

/// Configuration filename to search for.
pub const CONFIG_FILENAME: &str = "splice.toml";

/// Options governing directive syntax, fetching, caching and recursion.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IncludeConfig {
    /// Base path from which relative local targets are resolved.
    pub base_path: PathBuf,
    /// Default encoding of included content.
    pub encoding: String,
    /// Allow including local files.
    pub allow_local: bool,
    /// Allow including remote URLs.
    pub allow_remote: bool,
    /// Replace a failed directive with nothing instead of leaving it in place.
    pub truncate_on_failure: bool,
    /// Recursion policy for local content.
    pub recurs_local: RecursionPolicy,
    /// Recursion policy for remote content.
    pub recurs_remote: RecursionPolicy,
    /// Token opening a directive.
    pub syntax_left: String,
    /// Token closing a directive.
    pub syntax_right: String,
    /// Token separating the target from an encoding.
    pub syntax_delim: String,
    /// Marker forcing recursion for one directive.
    pub syntax_recurs_on: String,
    /// Marker preventing recursion for one directive.
    pub syntax_recurs_off: String,
    /// Marker requesting common indentation to be stripped.
    pub syntax_strip_indent: String,
    /// Cache local file content.
    pub content_cache_local: bool,
    /// Cache remote content.
    pub content_cache_remote: bool,
    /// Clear the local cache after each document.
    pub content_cache_clean_local: bool,
    /// Clear the remote cache after each document.
    pub content_cache_clean_remote: bool,
    /// Tolerate a target including itself, directly or transitively.
    pub allow_circular_inclusion: bool,
    /// Lines inserted between the parts of a multi-range line slice.
    pub line_slice_separator: Vec<String>,
    /// Resolve targets inside included content relative to the including file.
    pub recursive_relative_path: bool,
    /// Maximum include nesting depth.
    ///
    /// With `allow_circular_inclusion`, a file that includes itself `n` times
    /// expands into `n^max_depth` copies. Keep the depth small when circular
    /// content is expected.
    pub max_depth: usize,
    /// Timeout in seconds for one remote fetch.
    pub remote_timeout_secs: u64,
}

impl Default for IncludeConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("."),
            encoding: "utf-8".to_owned(),
            allow_local: true,
            allow_remote: true,
            truncate_on_failure: true,
            recurs_local: RecursionPolicy::On,
            recurs_remote: RecursionPolicy::Off,
            syntax_left: "{!".to_owned(),
            syntax_right: "!}".to_owned(),
            syntax_delim: "|".to_owned(),
            syntax_recurs_on: "+".to_owned(),
            syntax_recurs_off: "-".to_owned(),
            syntax_strip_indent: "<".to_owned(),
            content_cache_local: true,
            content_cache_remote: true,
            content_cache_clean_local: false,
            content_cache_clean_remote: false,
            allow_circular_inclusion: false,
            line_slice_separator: Vec::new(),
            recursive_relative_path: false,
            max_depth: 32,
            remote_timeout_secs: 30,
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error, including unknown keys and type mismatches.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require two tokens to differ.
fn require_distinct(a: (&str, &str), b: (&str, &str)) -> Result<(), ConfigError> {
    if a.0 == b.0 {
        return Err(ConfigError::Validation(format!(
            "{} and {} cannot both be '{}'",
            a.1, b.1, a.0
        )));
    }
    Ok(())
}

/// Expand a leading `~` in a path.
fn expand_tilde(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(s) => PathBuf::from(shellexpand::tilde(s).as_ref()),
        None => path.to_path_buf(),
    }
}

impl IncludeConfig {
    /// Build a configuration from a mapping of option names to values.
    ///
    /// Options missing from `table` keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for unknown keys or mismatched types and
    /// `ConfigError::Validation` if the resulting configuration is invalid.
    pub fn from_table(table: toml::Table) -> Result<Self, ConfigError> {
        let config: Self = toml::Value::Table(table).try_into()?;
        config.finish()
    }

    /// Parse a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Same as [`from_table`](Self::from_table).
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.finish()
    }

    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `splice.toml` in current directory and parents,
    /// falling back to defaults when none is found.
    ///
    /// A relative `base_path` in the file is resolved against the directory
    /// containing the file. CLI settings are applied afterwards and take
    /// precedence over file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or the final configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(base_path) = &settings.base_path {
            self.base_path = expand_tilde(base_path);
        }
        if let Some(encoding) = &settings.encoding {
            self.encoding.clone_from(encoding);
        }
        if let Some(allow_local) = settings.allow_local {
            self.allow_local = allow_local;
        }
        if let Some(allow_remote) = settings.allow_remote {
            self.allow_remote = allow_remote;
        }
        if let Some(truncate) = settings.truncate_on_failure {
            self.truncate_on_failure = truncate;
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);

        config.validate()?;
        Ok(config)
    }

    /// Expand `~` and validate.
    fn finish(mut self) -> Result<Self, ConfigError> {
        self.base_path = expand_tilde(&self.base_path);
        self.validate()?;
        Ok(self)
    }

    /// Resolve a relative base path against the config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let base = expand_tilde(&self.base_path);
        self.base_path = if base.is_relative() {
            config_dir.join(base)
        } else {
            base
        };
    }

    /// Validate configuration values.
    ///
    /// Called automatically by every constructor except `Default`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_syntax()?;
        require_non_empty(&self.encoding, "encoding")?;

        if self.max_depth == 0 {
            return Err(ConfigError::Validation(
                "max_depth must be greater than 0".to_owned(),
            ));
        }
        if self.remote_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "remote_timeout_secs must be greater than 0".to_owned(),
            ));
        }

        Ok(())
    }

    /// Validate directive syntax tokens.
    fn validate_syntax(&self) -> Result<(), ConfigError> {
        let left = (self.syntax_left.as_str(), "syntax_left");
        let right = (self.syntax_right.as_str(), "syntax_right");
        let delim = (self.syntax_delim.as_str(), "syntax_delim");
        let on = (self.syntax_recurs_on.as_str(), "syntax_recurs_on");
        let off = (self.syntax_recurs_off.as_str(), "syntax_recurs_off");
        let strip = (self.syntax_strip_indent.as_str(), "syntax_strip_indent");

        for (value, field) in [left, right, delim, on, off, strip] {
            require_non_empty(value, field)?;
        }

        require_distinct(left, right)?;
        require_distinct(delim, right)?;
        require_distinct(on, off)?;
        require_distinct(on, strip)?;
        require_distinct(off, strip)?;
        Ok(())
    }

    /// Timeout applied to each remote fetch.
    #[must_use]
    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.remote_timeout_secs)
    }
}
