//! Authentication-related types and data structures
//!
//! This module defines the session and credential types used throughout
//! the auth module, together with its error type.

use crate::error::{ApiError, ErrorKind};
use std::fmt;

/// Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;

/// Session issued by the cluster in exchange for a username and password
///
/// No expiry is tracked locally; an expired ticket surfaces as an
/// authentication error on the next call.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionTicket {
    /// Sent as the `PVEAuthCookie` cookie
    pub ticket: String,
    /// Sent as the `CSRFPreventionToken` header on mutating requests
    pub csrf_token: String,
    /// User the ticket was issued to, when known
    pub username: Option<String>,
}

impl SessionTicket {
    pub fn new(ticket: impl Into<String>, csrf_token: impl Into<String>) -> Self {
        Self {
            ticket: ticket.into(),
            csrf_token: csrf_token.into(),
            username: None,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Both halves present
    pub fn is_complete(&self) -> bool {
        !self.ticket.is_empty() && !self.csrf_token.is_empty()
    }

    /// Ticket shortened for display, e.g. `PVE:root@…a1b2`
    pub fn masked(&self) -> String {
        mask_secret(&self.ticket)
    }
}

impl fmt::Debug for SessionTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTicket")
            .field("ticket", &self.masked())
            .field("csrf_token", &"<redacted>")
            .field("username", &self.username)
            .finish()
    }
}

/// Username and password for a login; never persisted
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Reject empty fields before anything goes over the network
    pub fn validate(&self) -> AuthResult<()> {
        if self.username.trim().is_empty() {
            return Err(AuthError::InvalidCredentials(
                "username must not be empty".into(),
            ));
        }
        if self.password.is_empty() {
            return Err(AuthError::InvalidCredentials(
                "password must not be empty".into(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Flat view of the credential document
///
/// Every missing field reads as an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialSnapshot {
    pub server_url: String,
    pub ticket: String,
    pub csrf_token: String,
    pub username: String,
}

impl CredentialSnapshot {
    pub fn is_configured(&self) -> bool {
        !self.server_url.is_empty()
    }

    /// The stored session, if both halves are present
    pub fn session(&self) -> Option<SessionTicket> {
        let session = SessionTicket {
            ticket: self.ticket.clone(),
            csrf_token: self.csrf_token.clone(),
            username: (!self.username.is_empty()).then(|| self.username.clone()),
        };
        session.is_complete().then_some(session)
    }
}

/// Authentication errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No server URL stored
    #[error("Not configured. Please run 'proxctl init' or 'proxctl auth login -u <username>' to set up")]
    NotConfigured,

    /// Server URL stored but no usable session
    #[error("Not authenticated. Please run 'proxctl auth login -u <username>' to log in")]
    NotAuthenticated,

    /// Username or password missing
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Server URL rejected during normalisation
    #[error("Invalid server URL '{url}': {reason}")]
    InvalidServerUrl { url: String, reason: String },

    /// The server could not be reached
    #[error("Cannot connect to {server}: {source}")]
    Connectivity {
        server: String,
        #[source]
        source: ApiError,
    },

    /// The server refused to issue a ticket
    #[error("Login failed: {source}")]
    Authentication {
        #[source]
        source: ApiError,
    },

    /// Credential document could not be written or parsed
    #[error("Credential storage error: {0}")]
    StorageError(String),

    /// Interactive prompt failed
    #[error("Prompt failed: {0}")]
    Prompt(String),

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::NotConfigured
            | AuthError::InvalidServerUrl { .. }
            | AuthError::StorageError(_)
            | AuthError::IoError(_)
            | AuthError::SerdeError(_) => ErrorKind::Configuration,
            AuthError::NotAuthenticated
            | AuthError::InvalidCredentials(_)
            | AuthError::Authentication { .. } => ErrorKind::Authentication,
            AuthError::Connectivity { .. } => ErrorKind::Connectivity,
            AuthError::Prompt(_) => ErrorKind::Other,
        }
    }

    /// Local storage failures that should end the process
    pub fn is_storage_failure(&self) -> bool {
        matches!(
            self,
            AuthError::StorageError(_) | AuthError::IoError(_) | AuthError::SerdeError(_)
        )
    }
}

fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 12 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}…{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_validation() {
        assert!(Credentials::new("root@pam", "secret").validate().is_ok());
        assert!(matches!(
            Credentials::new("", "secret").validate(),
            Err(AuthError::InvalidCredentials(_))
        ));
        assert!(matches!(
            Credentials::new("root@pam", "").validate(),
            Err(AuthError::InvalidCredentials(_))
        ));
    }

    #[test]
    fn test_debug_never_prints_secrets() {
        let credentials = Credentials::new("root@pam", "hunter2");
        assert!(!format!("{credentials:?}").contains("hunter2"));

        let session = SessionTicket::new("PVE:root@pam:65000000::SIGNATURE", "CSRF-SECRET");
        let debug = format!("{session:?}");
        assert!(!debug.contains("SIGNATURE"));
        assert!(!debug.contains("CSRF-SECRET"));
    }

    #[test]
    fn test_masked_ticket() {
        let session = SessionTicket::new("PVE:root@pam:65000000::abcd", "csrf");
        assert_eq!(session.masked(), "PVE:root…abcd");
        assert_eq!(SessionTicket::new("short", "csrf").masked(), "*****");
    }

    #[test]
    fn test_snapshot_session_requires_both_halves() {
        let mut snapshot = CredentialSnapshot {
            server_url: "https://pve:8006".into(),
            ticket: "t".into(),
            csrf_token: String::new(),
            username: String::new(),
        };
        assert!(snapshot.session().is_none());

        snapshot.csrf_token = "c".into();
        let session = snapshot.session().unwrap();
        assert_eq!(session.ticket, "t");
        assert_eq!(session.username, None);
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(AuthError::NotConfigured.kind(), ErrorKind::Configuration);
        assert_eq!(AuthError::NotAuthenticated.kind(), ErrorKind::Authentication);
        let connectivity = AuthError::Connectivity {
            server: "https://pve:8006".into(),
            source: ApiError::InvalidResponse {
                message: "not json".into(),
            },
        };
        assert_eq!(connectivity.kind(), ErrorKind::Connectivity);
    }
}
