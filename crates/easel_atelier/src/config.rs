//! Runtime configuration.
//!
//! Configuration is layered, later sources win:
//!
//! 1. built-in defaults
//! 2. an `easel.toml` file
//! 3. `<meta name="easel.<path>" content="...">` tags of the page document
//!
//! ```toml
//! [core]
//! debug = "verbose"
//!
//! [inject]
//! name = "$"
//!
//! [components]
//! require_separator = true
//! strict_placeholders = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "easel.toml";

/// Errors raised while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value `{value}` for `{key}`")]
    InvalidValue { key: String, value: String },
}

/// Diagnostic verbosity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DebugLevel {
    #[default]
    Off,
    On,
    Verbose,
}

impl DebugLevel {
    /// `tracing` filter directive for this level.
    pub const fn filter_directive(self) -> &'static str {
        match self {
            DebugLevel::Off => "error",
            DebugLevel::On => "warn",
            DebugLevel::Verbose => "debug",
        }
    }

    pub const fn is_enabled(self) -> bool {
        !matches!(self, DebugLevel::Off)
    }
}

impl FromStr for DebugLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "false" | "" => Ok(DebugLevel::Off),
            "on" | "true" => Ok(DebugLevel::On),
            "verbose" => Ok(DebugLevel::Verbose),
            _ => Err(()),
        }
    }
}

/// `[core]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CoreConfig {
    pub debug: DebugLevel,
}

/// `[inject]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct InjectConfig {
    /// Key the merged extension capabilities are injected under
    pub name: String,
}

impl Default for InjectConfig {
    fn default() -> Self {
        Self { name: "$".into() }
    }
}

/// `[components]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ComponentsConfig {
    /// Tag names must contain `-`
    pub require_separator: bool,
    /// Placeholders must name a declared property
    pub strict_placeholders: bool,
}

impl Default for ComponentsConfig {
    fn default() -> Self {
        Self {
            require_separator: true,
            strict_placeholders: true,
        }
    }
}

/// Top-level Easel configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct EaselConfig {
    pub core: CoreConfig,
    pub inject: InjectConfig,
    pub components: ComponentsConfig,
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim() {
        "true" | "" => Ok(true),
        "false" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.into(),
            value: value.into(),
        }),
    }
}

impl EaselConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Load `easel.toml` from `dir` when present, defaults otherwise.
    pub fn discover(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(CONFIG_FILE_NAME);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Set one value by its dotted path. Both `_` and `-` separate words.
    ///
    /// Returns `Ok(false)` for unknown paths.
    pub fn set(&mut self, path: &str, value: &str) -> Result<bool, ConfigError> {
        let key = path.trim().replace('-', "_");
        match key.as_str() {
            "core.debug" => {
                self.core.debug = value.parse().map_err(|()| ConfigError::InvalidValue {
                    key: key.clone(),
                    value: value.into(),
                })?;
            }
            "inject.name" => self.inject.name = value.trim().into(),
            "components.require_separator" => {
                self.components.require_separator = parse_bool(&key, value)?;
            }
            "components.strict_placeholders" => {
                self.components.strict_placeholders = parse_bool(&key, value)?;
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Apply `(path, value)` pairs extracted from page meta tags.
    pub fn apply_meta<'a>(
        &mut self,
        pairs: impl IntoIterator<Item = &'a (String, String)>,
    ) -> Result<(), ConfigError> {
        for (path, value) in pairs {
            if !self.set(path, value)? {
                tracing::warn!(path = %path, "unknown configuration meta tag ignored");
            }
        }
        Ok(())
    }
}
