//! Configuration management for Folio.
//!
//! Parses `folio.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ```toml
//! [render]
//! smart_punctuation = true
//! gfm = true
//! line_breaks = true
//! suppress_vars = false
//!
//! [modifiers]
//! builtin = true
//! disabled = ["css"]
//!
//! [state]
//! path = "state.json"
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override variable suppression.
    pub suppress_vars: Option<bool>,
    /// Override smart punctuation in the final pass.
    pub smart_punctuation: Option<bool>,
    /// Override the state file.
    pub state_path: Option<PathBuf>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "folio.toml";

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Render configuration.
    pub render: RenderConfig,
    /// Modifier configuration.
    pub modifiers: ModifiersConfig,
    /// Variable state configuration (path is a relative string from TOML).
    state: StateConfigRaw,

    /// Resolved state file (set after loading).
    #[serde(skip)]
    pub state_path: Option<PathBuf>,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Render configuration.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// Curly quotes, dashes and ellipses in the final pass.
    pub smart_punctuation: bool,
    /// Tables, strikethrough and task lists.
    pub gfm: bool,
    /// Render single newlines as line breaks.
    pub line_breaks: bool,
    /// Skip variable directives.
    pub suppress_vars: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            smart_punctuation: true,
            gfm: true,
            line_breaks: true,
            suppress_vars: false,
        }
    }
}

/// Modifier configuration.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModifiersConfig {
    /// Whether built-in modifiers are registered.
    pub builtin: bool,
    /// Built-in modifier names to leave out.
    pub disabled: Vec<String>,
}

impl Default for ModifiersConfig {
    fn default() -> Self {
        Self {
            builtin: true,
            disabled: Vec::new(),
        }
    }
}

/// Raw state configuration as parsed from TOML.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct StateConfigRaw {
    path: Option<String>,
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
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `folio.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails or
    /// validation fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = std::env::current_dir()
            .ok()
            .and_then(|cwd| Self::discover_config(&cwd))
        {
            Self::load_from_file(&discovered)?
        } else {
            Self::default()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(suppress_vars) = settings.suppress_vars {
            self.render.suppress_vars = suppress_vars;
        }
        if let Some(smart_punctuation) = settings.smart_punctuation {
            self.render.smart_punctuation = smart_punctuation;
        }
        if let Some(state_path) = &settings.state_path {
            self.state_path = Some(state_path.clone());
        }
    }

    /// Search for config file in `start` and its parents.
    fn discover_config(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();
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
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Resolve relative paths against the config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        self.state_path = self.state.path.as_deref().map(|path| config_dir.join(path));
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file. Whether disabled names
    /// refer to real modifiers is left to the caller, which knows the registry.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_modifiers()?;
        if let Some(path) = &self.state.path {
            require_non_empty(path, "state.path")?;
        }
        Ok(())
    }

    /// Validate modifiers configuration.
    fn validate_modifiers(&self) -> Result<(), ConfigError> {
        for (idx, name) in self.modifiers.disabled.iter().enumerate() {
            require_non_empty(name, "modifiers.disabled entry")?;

            let duplicate = self.modifiers.disabled[..idx]
                .iter()
                .any(|earlier| earlier.eq_ignore_ascii_case(name));
            if duplicate {
                return Err(ConfigError::Validation(format!(
                    "modifiers.disabled lists \"{name}\" more than once"
                )));
            }
        }

        if !self.modifiers.builtin && !self.modifiers.disabled.is_empty() {
            return Err(ConfigError::Validation(
                "modifiers.disabled has no effect when modifiers.builtin is false".to_owned(),
            ));
        }

        Ok(())
    }

    /// Names of disabled built-in modifiers.
    #[must_use]
    pub fn disabled_modifiers(&self) -> Vec<&str> {
        self.modifiers.disabled.iter().map(String::as_str).collect()
    }
}
