use crate::cli::{commands::Commands, handlers};
use crate::config::CliConfig;
use crate::context::CliContext;
use crate::error::Result;
use clap::Parser;
use clap_verbosity_flag::{OffLevel, Verbosity};
use proxctl_common::ConfigurationError;
use proxctl_sdk::CredentialStore;
use std::path::{Path, PathBuf};

/// proxctl - command-line client for virtualization clusters
#[derive(Parser, Debug)]
#[command(
    name = "proxctl",
    version,
    about = "proxctl - manage virtualization cluster nodes, VMs and containers",
    long_about = "Command-line client for virtualization cluster management APIs.

QUICK START:
  proxctl init --server pve.example.com:8006   # Store the server URL
  proxctl auth login -u root@pam               # Log in
  proxctl nodes get                            # List nodes

GUESTS:
  proxctl vm get                               # List VMs on every node
  proxctl lxc start -n pve -i 200 --wait       # Start a container and wait
  proxctl vm create -n pve -i 105 -o memory=2048 -o cores=2

SESSION:
  proxctl status --check                       # Show state, test the connection
  proxctl auth view                            # Show the stored session
  proxctl auth logout                          # Forget the session"
)]
pub struct Args {
    /// Credential file path
    #[arg(
        short,
        long,
        global = true,
        env = "PROXCTL_CONFIG",
        default_value = "~/.proxctl/config.json"
    )]
    pub config: PathBuf,

    /// Output format as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(flatten)]
    pub verbosity: Verbosity<OffLevel>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Args {
    /// Execute the CLI command, writing results to stdout
    pub async fn run(self) -> Result<()> {
        let store = credential_store(&self.config)?;
        let config = CliConfig::load_default()?;
        let ctx = CliContext::new(store, config).with_json(self.json);

        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        handlers::run_command(&ctx, self.command, &mut out).await
    }
}

/// Store for `--config`, which must name a file
fn credential_store(path: &Path) -> Result<CredentialStore> {
    let path = expand_tilde(path);
    if path.is_dir() {
        return Err(ConfigurationError::InvalidPath {
            path,
            reason: "is a directory, expected a credential file".to_string(),
        }
        .into());
    }
    Ok(CredentialStore::new(path))
}

/// Expand tilde (~) in file paths to home directory
fn expand_tilde(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(path_str) => PathBuf::from(shellexpand::tilde(path_str).as_ref()),
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands::{AuthAction, ContainerAction, GuestAction};
    use clap::CommandFactory;

    #[test]
    fn test_args_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_container_start_with_wait() {
        let args = Args::parse_from(["proxctl", "lxc", "start", "-n", "pve", "-i", "200", "--timeout", "30"]);
        match args.command {
            Commands::Lxc {
                action: ContainerAction::Guest(GuestAction::Start { guest, wait }),
            } => {
                assert_eq!(guest.node, "pve");
                assert_eq!(guest.vmid, 200);
                assert!(wait.enabled());
                assert_eq!(wait.timeout, Some(30));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_create_options() {
        let args = Args::parse_from([
            "proxctl", "vm", "create", "-n", "pve", "-i", "105", "-o", "memory=2048", "-o",
            "net0=virtio,bridge=vmbr0",
        ]);
        match args.command {
            Commands::Vm {
                action: GuestAction::Create { options, wait, .. },
            } => {
                assert_eq!(options.len(), 2);
                assert_eq!(options[1].name, "net0");
                assert_eq!(options[1].value, "virtio,bridge=vmbr0");
                assert!(!wait.enabled());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_malformed_option_is_rejected() {
        let result = Args::try_parse_from(["proxctl", "vm", "create", "-n", "pve", "-i", "105", "-o", "memory"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::parse_from(["proxctl", "auth", "login", "-u", "root@pam", "--json", "-c", "/tmp/proxctl.json"]);
        assert!(args.json);
        assert_eq!(args.config, PathBuf::from("/tmp/proxctl.json"));
        assert!(matches!(
            args.command,
            Commands::Auth {
                action: AuthAction::Login { ref username, .. }
            } if username == "root@pam"
        ));
    }

    #[test]
    fn test_config_directory_is_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = credential_store(dir.path()).unwrap_err();
        assert!(matches!(
            err,
            crate::error::CliError::Config(ConfigurationError::InvalidPath { .. })
        ));
        assert!(err.is_fatal());

        let store = credential_store(&dir.path().join("config.json")).unwrap();
        assert_eq!(store.path(), dir.path().join("config.json"));
    }

    #[test]
    fn test_expand_tilde_leaves_absolute_paths() {
        assert_eq!(
            expand_tilde(Path::new("/etc/proxctl.json")),
            PathBuf::from("/etc/proxctl.json")
        );
        assert!(!expand_tilde(Path::new("~/.proxctl/config.json"))
            .to_string_lossy()
            .starts_with('~'));
    }
}
