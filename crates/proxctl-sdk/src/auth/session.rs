//! Username/password login against the cluster
//!
//! A login probes the server first so that an unreachable server and
//! rejected credentials produce different errors.

use super::credential_store::CredentialStore;
use super::types::{AuthError, AuthResult, Credentials, SessionTicket};
use crate::client::{ClientBuilder, ProxmoxClient};
use crate::error::{ApiError, ErrorKind};
use crate::types::VersionInfo;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Default bound for the connectivity probe
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default bound for the ticket request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const API_SUFFIX: &str = "/api2/json";

/// Asks the user for a server URL when none is stored
pub trait ServerUrlPrompt: Send + Sync {
    fn prompt_server_url(&self) -> AuthResult<String>;
}

/// Result of a successful login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    pub server_url: String,
    pub username: String,
    /// Server version, when it could be read
    pub version: Option<String>,
}

/// Exchanges credentials for a session ticket and stores it
#[derive(Debug, Clone)]
pub struct SessionAuthenticator {
    store: CredentialStore,
    probe_timeout: Duration,
    request_timeout: Duration,
    accept_invalid_certs: bool,
}

impl SessionAuthenticator {
    pub fn new(store: CredentialStore) -> Self {
        Self {
            store,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            accept_invalid_certs: true,
        }
    }

    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Whether self-signed server certificates are accepted
    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    /// Log in and persist the issued session
    ///
    /// When no server URL is stored and `prompt` is given, the user is asked
    /// for one; it is normalised and stored before the probe.
    pub async fn login(
        &self,
        credentials: &Credentials,
        prompt: Option<&dyn ServerUrlPrompt>,
    ) -> AuthResult<LoginOutcome> {
        credentials.validate()?;

        let server_url = self.resolve_server_url(prompt)?;
        info!("Logging in to {} as {}", server_url, credentials.username);

        let mut version = self.probe(&server_url).await?;

        let client = self.client(&server_url, None)?;
        let session = client
            .request_ticket(credentials)
            .await
            .map_err(|source| AuthError::Authentication { source })?;

        self.store.save_session(&session)?;

        if version.is_none() {
            version = self.read_version(&server_url, &session).await;
        }

        Ok(LoginOutcome {
            username: session
                .username
                .clone()
                .unwrap_or_else(|| credentials.username.clone()),
            server_url,
            version: version.map(|v| v.version),
        })
    }

    /// Check that the server answers like a cluster API
    ///
    /// Returns the version when the server reveals it without a session. A
    /// `401` still proves the server is reachable.
    pub async fn probe(&self, server_url: &str) -> AuthResult<Option<VersionInfo>> {
        let client = self.client(server_url, None)?;
        debug!("Probing {} (timeout {:?})", server_url, self.probe_timeout);

        match tokio::time::timeout(self.probe_timeout, client.version()).await {
            Ok(Ok(version)) => Ok(Some(version)),
            Ok(Err(e)) if e.kind() == ErrorKind::Authentication => {
                debug!("Probe answered {e}; server is reachable");
                Ok(None)
            }
            Ok(Err(source)) => Err(AuthError::Connectivity {
                server: server_url.to_string(),
                source,
            }),
            Err(_) => Err(AuthError::Connectivity {
                server: server_url.to_string(),
                source: ApiError::Connectivity {
                    url: server_url.to_string(),
                    message: format!(
                        "no response within {}s",
                        self.probe_timeout.as_secs_f64()
                    ),
                },
            }),
        }
    }

    fn resolve_server_url(&self, prompt: Option<&dyn ServerUrlPrompt>) -> AuthResult<String> {
        let snapshot = self.store.load()?;
        if snapshot.is_configured() {
            return Ok(snapshot.server_url);
        }

        let prompt = prompt.ok_or(AuthError::NotConfigured)?;
        let server_url = normalize_server_url(&prompt.prompt_server_url()?)?;
        self.store.save_server_url(&server_url)?;
        Ok(server_url)
    }

    async fn read_version(&self, server_url: &str, session: &SessionTicket) -> Option<VersionInfo> {
        let client = self.client(server_url, Some(session.clone())).ok()?;
        match tokio::time::timeout(self.probe_timeout, client.version()).await {
            Ok(Ok(version)) => Some(version),
            Ok(Err(e)) => {
                debug!("Could not read server version after login: {e}");
                None
            }
            Err(_) => {
                debug!("Timed out reading server version after login");
                None
            }
        }
    }

    fn client(&self, server_url: &str, session: Option<SessionTicket>) -> AuthResult<ProxmoxClient> {
        let mut builder = ClientBuilder::new()
            .server_url(server_url)
            .timeout(self.request_timeout)
            .connect_timeout(self.probe_timeout)
            .danger_accept_invalid_certs(self.accept_invalid_certs);
        if let Some(session) = session {
            builder = builder.session(session);
        }
        builder.build().map_err(|e| AuthError::InvalidServerUrl {
            url: server_url.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Turn user input into the stored server URL form
///
/// `pve.local:8006/` becomes `https://pve.local:8006`; a pasted
/// `/api2/json` suffix is dropped. No default port is added.
pub fn normalize_server_url(input: &str) -> AuthResult<String> {
    let invalid = |reason: &str| AuthError::InvalidServerUrl {
        url: input.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(invalid("server URL must not be empty"));
    }

    let mut url = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    loop {
        let before = url.len();
        url = url.trim_end_matches('/').to_string();
        if let Some(stripped) = url.strip_suffix(API_SUFFIX) {
            url = stripped.to_string();
        }
        if url.len() == before {
            break;
        }
    }

    let parsed = Url::parse(&url).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid("only http and https are supported"));
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host"));
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize_adds_scheme_and_strips_suffix() {
        assert_eq!(
            normalize_server_url("pve.local:8006").unwrap(),
            "https://pve.local:8006"
        );
        assert_eq!(
            normalize_server_url("  https://pve.local:8006/api2/json/ ").unwrap(),
            "https://pve.local:8006"
        );
        assert_eq!(
            normalize_server_url("http://10.0.0.5:8006///").unwrap(),
            "http://10.0.0.5:8006"
        );
    }

    #[test]
    fn test_normalize_keeps_port_absent() {
        assert_eq!(
            normalize_server_url("pve.example.com").unwrap(),
            "https://pve.example.com"
        );
    }

    #[test]
    fn test_normalize_rejects_garbage() {
        assert!(matches!(
            normalize_server_url("   "),
            Err(AuthError::InvalidServerUrl { .. })
        ));
        assert!(normalize_server_url("ftp://pve.local").is_err());
        assert!(normalize_server_url("https://").is_err());
    }
}
