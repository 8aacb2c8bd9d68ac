//! Configuration errors shared across crates

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or validating local settings
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// A settings source could not be read or merged
    #[error("Failed to load settings: {0}")]
    Load(#[from] Box<figment::Error>),

    /// A settings value is outside its allowed range
    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    /// A platform directory could not be determined
    #[error("Cannot determine {what} directory")]
    MissingDirectory { what: &'static str },

    /// A path given on the command line could not be used
    #[error("Invalid path {path}: {reason}")]
    InvalidPath { path: PathBuf, reason: String },
}

impl From<figment::Error> for ConfigurationError {
    fn from(err: figment::Error) -> Self {
        Self::Load(Box::new(err))
    }
}

impl ConfigurationError {
    /// Shorthand for [`ConfigurationError::InvalidValue`]
    pub fn invalid_value(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            reason: reason.into(),
        }
    }
}
