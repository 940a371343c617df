//! Error types for the component runtime.

use easel_carton::CompactString;
use easel_relief::TreeError;
use thiserror::Error;

use crate::config::ConfigError;
use crate::fetch::FetchError;

/// Authoring mistakes. These fail fast and are never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("component `{tag}` requires the `{property}` attribute")]
    MissingRequiredAttribute {
        tag: CompactString,
        property: CompactString,
    },

    #[error("component `{tag}` uses placeholder `{{{{{key}}}}}` but declares no property `{key}`")]
    UndeclaredPlaceholder {
        tag: CompactString,
        key: CompactString,
    },

    #[error("component name `{tag}` must contain a hyphen")]
    MissingSeparator { tag: CompactString },

    #[error("required extension `{name}` is not loaded")]
    MissingExtension { name: CompactString },
}

/// Errors surfaced by the runtime
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("component `{tag}` is already registered from {existing}, refusing {requested}")]
    RegistrationConflict {
        tag: CompactString,
        existing: String,
        requested: String,
    },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("component `{0}` is not registered")]
    UnknownComponent(CompactString),

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failure reported by an extension hook. Caught at the dispatch boundary and
/// logged, never propagated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HookError {
    pub message: String,
}

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<&str> for HookError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for HookError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}
