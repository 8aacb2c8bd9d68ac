//! Error types for the proxctl CLI

use proxctl_sdk::{ApiError, AuthError, ErrorKind};
use thiserror::Error;

/// CLI error type with minimal variants
#[derive(Debug, Error)]
pub enum CliError {
    /// Settings file issues
    #[error("Configuration error: {0}")]
    Config(#[from] proxctl_common::ConfigurationError),

    /// Cluster API errors
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Credential, gate and login failures
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Local file system errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON output errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CliError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CliError::Config(_) => ErrorKind::Configuration,
            CliError::Api(e) => e.kind(),
            CliError::Auth(e) => e.kind(),
            CliError::Io(_) | CliError::Serialization(_) => ErrorKind::Other,
        }
    }

    /// Local storage or settings failures end the process with a report;
    /// everything else is printed as a command result
    pub fn is_fatal(&self) -> bool {
        match self {
            CliError::Config(_) | CliError::Io(_) => true,
            CliError::Auth(e) => e.is_storage_failure(),
            CliError::Api(_) | CliError::Serialization(_) => false,
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_errors_are_not_fatal() {
        assert!(!CliError::from(AuthError::NotConfigured).is_fatal());
        assert!(!CliError::from(AuthError::NotAuthenticated).is_fatal());
    }

    #[test]
    fn test_storage_errors_are_fatal() {
        let err = CliError::from(AuthError::StorageError("bad json".into()));
        assert!(err.is_fatal());
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_bad_config_path_is_fatal() {
        let err = CliError::from(proxctl_common::ConfigurationError::InvalidPath {
            path: "/tmp".into(),
            reason: "is a directory".into(),
        });
        assert!(err.is_fatal());
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_api_kind_passes_through() {
        let err = CliError::from(ApiError::Timeout {
            upid: "UPID:pve:1".into(),
            seconds: 60,
        });
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(!err.is_fatal());
    }
}
