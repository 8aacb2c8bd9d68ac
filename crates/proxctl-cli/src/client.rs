//! Backend selection for CLI commands
//!
//! Every command gets its [`Backend`] from a [`BackendSelector`]. The
//! selector builds the live HTTP client from the credential document unless
//! a factory has been installed, in which case the factory's implementation
//! is used instead. Test harnesses construct their own selector with
//! [`BackendSelector::with_factory`]; the process-wide instance used by the
//! binary only accepts overrides in test builds.

use crate::config::CliConfig;
use crate::error::Result;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use proxctl_sdk::{AuthError, Backend, ClientBuilder, ClusterApi, CredentialStore};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Produces the implementation handed to commands instead of the live client
pub type ClientFactory = Arc<dyn Fn() -> Arc<dyn ClusterApi> + Send + Sync>;

static GLOBAL_SELECTOR: Lazy<Arc<BackendSelector>> =
    Lazy::new(|| Arc::new(BackendSelector::new()));

/// Chooses between the live client and an injected implementation
#[derive(Default)]
pub struct BackendSelector {
    factory: RwLock<Option<ClientFactory>>,
}

impl fmt::Debug for BackendSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendSelector")
            .field("has_override", &self.has_override())
            .finish()
    }
}

impl BackendSelector {
    /// Selector that always builds the live client
    pub fn new() -> Self {
        Self::default()
    }

    /// Selector that hands out `factory`'s implementation
    pub fn with_factory<F>(factory: F) -> Self
    where
        F: Fn() -> Arc<dyn ClusterApi> + Send + Sync + 'static,
    {
        Self {
            factory: RwLock::new(Some(Arc::new(factory))),
        }
    }

    /// Install an override, replacing any previous one
    #[cfg(any(test, feature = "test-support"))]
    pub fn set_factory<F>(&self, factory: F)
    where
        F: Fn() -> Arc<dyn ClusterApi> + Send + Sync + 'static,
    {
        *self.factory.write() = Some(Arc::new(factory));
    }

    /// Remove the override; later calls build the live client
    #[cfg(any(test, feature = "test-support"))]
    pub fn reset_factory(&self) {
        self.factory.write().take();
    }

    pub fn has_override(&self) -> bool {
        self.factory.read().is_some()
    }

    /// Backend for one command invocation
    ///
    /// The override wins; otherwise a live client is built from the stored
    /// server URL, with the stored session when there is one.
    pub fn get_client(&self, store: &CredentialStore, config: &CliConfig) -> Result<Backend> {
        let factory = self.factory.read().clone();
        if let Some(factory) = factory {
            debug!("Using injected backend");
            return Ok(Backend::Injected(factory()));
        }

        let snapshot = store.load()?;
        if !snapshot.is_configured() {
            return Err(AuthError::NotConfigured.into());
        }

        let mut builder = ClientBuilder::new()
            .server_url(&snapshot.server_url)
            .timeout(config.request_timeout())
            .connect_timeout(config.probe_timeout())
            .danger_accept_invalid_certs(config.api.accept_invalid_certs);
        if let Some(session) = snapshot.session() {
            builder = builder.session(session);
        }

        debug!("Using live backend for {}", snapshot.server_url);
        Ok(Backend::Live(builder.build()?))
    }
}

/// The selector shared by the running binary
pub fn global_selector() -> Arc<BackendSelector> {
    Arc::clone(&GLOBAL_SELECTOR)
}

/// Install an override on the process-wide selector
///
/// The returned guard removes it again when dropped.
#[cfg(any(test, feature = "test-support"))]
#[must_use = "the override is removed when the guard is dropped"]
pub fn set_global_factory<F>(factory: F) -> FactoryGuard
where
    F: Fn() -> Arc<dyn ClusterApi> + Send + Sync + 'static,
{
    GLOBAL_SELECTOR.set_factory(factory);
    FactoryGuard { _private: () }
}

/// Remove any override from the process-wide selector
#[cfg(any(test, feature = "test-support"))]
pub fn reset_global_factory() {
    GLOBAL_SELECTOR.reset_factory();
}

/// Resets the process-wide override on drop
#[cfg(any(test, feature = "test-support"))]
#[derive(Debug)]
pub struct FactoryGuard {
    _private: (),
}

#[cfg(any(test, feature = "test-support"))]
impl Drop for FactoryGuard {
    fn drop(&mut self) {
        reset_global_factory();
    }
}
