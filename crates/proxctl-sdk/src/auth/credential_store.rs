//! File-backed storage for the server URL and session ticket
//!
//! The document is a small JSON object:
//!
//! ```json
//! {
//!   "server_url": "https://pve.example.com:8006",
//!   "auth_ticket": {
//!     "ticket": "PVE:root@pam:...",
//!     "CSRFPreventionToken": "...",
//!     "username": "root@pam"
//!   }
//! }
//! ```
//!
//! Every write replaces the file atomically, so readers never observe a
//! partially written document.

use super::types::{AuthError, AuthResult, CredentialSnapshot, SessionTicket};
use etcetera::home_dir;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Directory below the home directory holding the credential document
pub const CREDENTIAL_DIR: &str = ".proxctl";

/// File name of the credential document
pub const CREDENTIAL_FILE: &str = "config.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    server_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    auth_ticket: Option<StoredTicket>,

    /// Keys written by other tools are carried through rewrites
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

/// Every field may be absent or `null`
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredTicket {
    #[serde(default)]
    ticket: Option<String>,

    #[serde(rename = "CSRFPreventionToken", default)]
    csrf_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    username: Option<String>,
}

/// Reads and writes the credential document
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Store backed by the given file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `~/.proxctl/config.json`
    pub fn default_location() -> AuthResult<Self> {
        Ok(Self::new(Self::default_path()?))
    }

    pub fn default_path() -> AuthResult<PathBuf> {
        let home = home_dir().map_err(|e| {
            AuthError::StorageError(format!("Failed to determine home directory: {e}"))
        })?;
        Ok(home.join(CREDENTIAL_DIR).join(CREDENTIAL_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current values; missing fields read as empty strings
    pub fn load(&self) -> AuthResult<CredentialSnapshot> {
        let document = self.read_document()?;
        let ticket = document.auth_ticket.unwrap_or_default();

        Ok(CredentialSnapshot {
            server_url: document.server_url.unwrap_or_default(),
            ticket: ticket.ticket.unwrap_or_default(),
            csrf_token: ticket.csrf_token.unwrap_or_default(),
            username: ticket.username.unwrap_or_default(),
        })
    }

    /// Store the server URL; the session is left untouched
    pub fn save_server_url(&self, server_url: &str) -> AuthResult<()> {
        let mut document = self.read_document()?;
        document.server_url = Some(server_url.to_string());
        self.write_document(&document)?;
        info!("Saved server URL {} to {}", server_url, self.path.display());
        Ok(())
    }

    /// Store a ticket and CSRF token, replacing any previous session
    pub fn save_session_ticket(&self, ticket: &str, csrf_token: &str) -> AuthResult<()> {
        self.save_session(&SessionTicket::new(ticket, csrf_token))
    }

    /// Store a full session including the username it was issued to
    pub fn save_session(&self, session: &SessionTicket) -> AuthResult<()> {
        let mut document = self.read_document()?;
        document.auth_ticket = Some(StoredTicket {
            ticket: Some(session.ticket.clone()),
            csrf_token: Some(session.csrf_token.clone()),
            username: session.username.clone(),
        });
        self.write_document(&document)?;
        info!("Saved session ticket to {}", self.path.display());
        Ok(())
    }

    /// Remove the stored session; a no-op when none is stored
    pub fn clear_session_ticket(&self) -> AuthResult<()> {
        let mut document = self.read_document()?;
        if document.auth_ticket.take().is_none() {
            debug!("No session ticket stored, nothing to clear");
            return Ok(());
        }
        self.write_document(&document)?;
        info!("Cleared session ticket from {}", self.path.display());
        Ok(())
    }

    fn read_document(&self) -> AuthResult<StoredDocument> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(
                    "Credential document not found, using empty values: {}",
                    self.path.display()
                );
                return Ok(StoredDocument::default());
            }
            Err(e) => return Err(AuthError::IoError(e)),
        };

        if content.trim().is_empty() {
            return Ok(StoredDocument::default());
        }

        serde_json::from_str(&content).map_err(|e| {
            AuthError::StorageError(format!(
                "Failed to parse credential document {}: {e}",
                self.path.display()
            ))
        })
    }

    /// Write to a temporary sibling, flush to disk, then rename over the target
    fn write_document(&self, document: &StoredDocument) -> AuthResult<()> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let mut file = NamedTempFile::new_in(&dir)?;
        serde_json::to_writer_pretty(&mut file, document)?;
        file.write_all(b"\n")?;
        file.as_file().sync_all()?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.as_file()
                .set_permissions(std::fs::Permissions::from_mode(0o600))?;
        }

        file.persist(&self.path)
            .map_err(|e| AuthError::IoError(e.error))?;
        Ok(())
    }
}
