//! Everything a command handler needs, assembled once per invocation

use crate::client::{global_selector, BackendSelector};
use crate::config::CliConfig;
use crate::error::Result;
use proxctl_sdk::{auth, Backend, CredentialStore, SessionAuthenticator};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Composition root for command handlers
#[derive(Debug, Clone)]
pub struct CliContext {
    pub store: CredentialStore,
    pub config: CliConfig,
    pub selector: Arc<BackendSelector>,
    /// Emit JSON instead of tables
    pub json: bool,
    /// Cancelled on Ctrl-C; aborts task waits
    pub cancel: CancellationToken,
}

impl CliContext {
    /// Context using the process-wide backend selector
    pub fn new(store: CredentialStore, config: CliConfig) -> Self {
        Self {
            store,
            config,
            selector: global_selector(),
            json: false,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_selector(mut self, selector: Arc<BackendSelector>) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// Run the local auth gate, then ask the selector for a backend
    ///
    /// No backend is requested when the gate fails.
    pub fn authenticated_backend(&self) -> Result<Backend> {
        let snapshot = self.store.load()?;
        auth::check(&snapshot)?;
        debug!("Auth gate passed for {}", snapshot.server_url);
        self.selector.get_client(&self.store, &self.config)
    }

    /// Authenticator configured from the settings
    pub fn authenticator(&self) -> SessionAuthenticator {
        SessionAuthenticator::new(self.store.clone())
            .probe_timeout(self.config.probe_timeout())
            .request_timeout(self.config.request_timeout())
            .accept_invalid_certs(self.config.api.accept_invalid_certs)
    }
}
