//! Settings for the proxctl CLI
//!
//! Settings are tunables only. The server URL and session live in the
//! credential document managed by [`proxctl_sdk::CredentialStore`].
//!
//! Sources, later ones winning:
//! 1. built-in defaults
//! 2. `<config_dir>/proxctl/settings.toml`
//! 3. `PROXCTL_` environment variables, `__` separating sections
//!    (`PROXCTL_TASKS__WAIT_TIMEOUT_SECS=120`)

use crate::error::Result;
use etcetera::{choose_base_strategy, BaseStrategy};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use proxctl_common::ConfigurationError;
use proxctl_sdk::WaitOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Prefix of environment overrides
pub const ENV_PREFIX: &str = "PROXCTL_";

/// CLI configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CliConfig {
    /// API client configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Task wait configuration
    #[serde(default)]
    pub tasks: TaskConfig,
}

/// API client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Timeout for a single API request
    pub request_timeout_secs: u64,

    /// Timeout for the connectivity probe run by login and `status --check`
    pub probe_timeout_secs: u64,

    /// Accept self-signed server certificates
    pub accept_invalid_certs: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            probe_timeout_secs: 10,
            accept_invalid_certs: true,
        }
    }
}

/// Task wait configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Default bound for `--wait`
    pub wait_timeout_secs: u64,

    /// Delay between task status polls
    pub poll_interval_ms: u64,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            wait_timeout_secs: 60,
            poll_interval_ms: 1000,
        }
    }
}

impl CliConfig {
    /// Load settings from the default location
    pub fn load_default() -> Result<Self> {
        Self::load_from_path(&Self::settings_path()?)
    }

    /// Load settings from a specific file; a missing file means defaults
    pub fn load_from_path(path: &Path) -> Result<Self> {
        debug!("Loading settings from: {}", path.display());

        let config: Self = Self::figment(path)
            .extract()
            .map_err(ConfigurationError::from)?;
        config.validate()?;

        debug!("Successfully loaded settings");
        Ok(config)
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    fn validate(&self) -> std::result::Result<(), ConfigurationError> {
        if self.api.request_timeout_secs == 0 {
            return Err(ConfigurationError::invalid_value(
                "api.request_timeout_secs",
                "must be greater than 0",
            ));
        }
        if self.api.probe_timeout_secs == 0 {
            return Err(ConfigurationError::invalid_value(
                "api.probe_timeout_secs",
                "must be greater than 0",
            ));
        }
        if self.tasks.poll_interval_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "tasks.poll_interval_ms",
                "must be greater than 0",
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.request_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.api.probe_timeout_secs)
    }

    /// Wait options for `--wait`, with an optional `--timeout` override
    pub fn wait_options(&self, timeout_secs: Option<u64>) -> WaitOptions {
        let timeout = timeout_secs.unwrap_or(self.tasks.wait_timeout_secs);
        WaitOptions::new(Duration::from_secs(timeout))
            .poll_interval(Duration::from_millis(self.tasks.poll_interval_ms))
    }

    /// Get configuration directory
    pub fn config_dir() -> Result<PathBuf> {
        let strategy = choose_base_strategy()
            .map_err(|_| ConfigurationError::MissingDirectory { what: "config" })?;
        Ok(strategy.config_dir().join("proxctl"))
    }

    /// Get settings file path
    pub fn settings_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("settings.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliError;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    #[serial]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = CliConfig::load_from_path(&dir.path().join("settings.toml")).unwrap();
        assert_eq!(config, CliConfig::default());
        assert!(config.api.accept_invalid_certs);
    }

    #[test]
    #[serial]
    fn test_file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(
            &path,
            "[api]\naccept_invalid_certs = false\n\n[tasks]\nwait_timeout_secs = 300\n",
        )
        .unwrap();

        let config = CliConfig::load_from_path(&path).unwrap();
        assert!(!config.api.accept_invalid_certs);
        assert_eq!(config.api.request_timeout_secs, 30);
        assert_eq!(config.tasks.wait_timeout_secs, 300);
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "[tasks]\npoll_interval_ms = 250\n").unwrap();

        std::env::set_var("PROXCTL_TASKS__POLL_INTERVAL_MS", "50");
        let config = CliConfig::load_from_path(&path);
        std::env::remove_var("PROXCTL_TASKS__POLL_INTERVAL_MS");

        assert_eq!(config.unwrap().tasks.poll_interval_ms, 50);
    }

    #[test]
    #[serial]
    fn test_zero_poll_interval_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "[tasks]\npoll_interval_ms = 0\n").unwrap();

        let err = CliConfig::load_from_path(&path).unwrap_err();
        assert!(matches!(
            err,
            CliError::Config(ConfigurationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_wait_options_override() {
        let config = CliConfig::default();
        assert_eq!(config.wait_options(None).timeout, Duration::from_secs(60));

        let options = config.wait_options(Some(5));
        assert_eq!(options.timeout, Duration::from_secs(5));
        assert_eq!(options.poll_interval, Duration::from_millis(1000));
    }
}
