use clap::{Args as ClapArgs, Subcommand};
use proxctl_sdk::ResourceOption;

/// Main CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Configure the cluster server URL
    Init {
        /// Server URL, e.g. https://pve.example.com:8006 (prompted when omitted)
        #[arg(long)]
        server: Option<String>,

        /// Overwrite an existing configuration
        #[arg(long)]
        force: bool,
    },

    /// Show configuration and session state
    Status {
        /// Also test the connection to the server
        #[arg(long)]
        check: bool,
    },

    /// Log in, log out and inspect the stored session
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },

    /// Inspect cluster nodes
    Nodes {
        #[command(subcommand)]
        action: NodeAction,
    },

    /// Manage QEMU virtual machines
    Vm {
        #[command(subcommand)]
        action: GuestAction,
    },

    /// Manage LXC containers
    Lxc {
        #[command(subcommand)]
        action: ContainerAction,
    },
}

/// Session management actions
#[derive(Subcommand, Debug)]
pub enum AuthAction {
    /// Log in with username and password
    Login {
        /// User including realm, e.g. root@pam
        #[arg(short, long)]
        username: String,

        /// Read the password from stdin instead of prompting
        #[arg(long)]
        password_stdin: bool,

        /// Server URL to store before logging in
        #[arg(long)]
        server: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// Show the stored session
    View,
}

/// Node actions
#[derive(Subcommand, Debug)]
pub enum NodeAction {
    /// List cluster nodes
    Get,

    /// Show details of one node
    Describe {
        /// Node name
        #[arg(short, long)]
        name: String,
    },
}

/// Identifies one guest
#[derive(ClapArgs, Debug, Clone)]
pub struct GuestTarget {
    /// Node the guest lives on
    #[arg(short, long)]
    pub node: String,

    /// Guest id
    #[arg(short = 'i', long = "id", value_name = "VMID")]
    pub vmid: u32,
}

/// Wait flags shared by mutating commands
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct WaitArgs {
    /// Wait for the task to finish
    #[arg(long)]
    pub wait: bool,

    /// Seconds to wait before giving up (implies --wait)
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,
}

impl WaitArgs {
    pub fn enabled(&self) -> bool {
        self.wait || self.timeout.is_some()
    }
}

/// Actions shared by virtual machines and containers
#[derive(Subcommand, Debug)]
pub enum GuestAction {
    /// List guests, on one node or across the cluster
    Get {
        /// Only list guests on this node
        #[arg(short, long)]
        node: Option<String>,
    },

    /// Show details of one guest
    Describe {
        #[command(flatten)]
        guest: GuestTarget,
    },

    /// Create a guest
    Create {
        #[command(flatten)]
        guest: GuestTarget,

        /// Creation parameter, repeatable (e.g. -o memory=2048 -o cores=2)
        #[arg(short = 'o', long = "option", value_name = "KEY=VALUE")]
        options: Vec<ResourceOption>,

        #[command(flatten)]
        wait: WaitArgs,
    },

    /// Start a guest
    Start {
        #[command(flatten)]
        guest: GuestTarget,

        #[command(flatten)]
        wait: WaitArgs,
    },

    /// Stop a guest immediately
    Stop {
        #[command(flatten)]
        guest: GuestTarget,

        #[command(flatten)]
        wait: WaitArgs,
    },

    /// Shut a guest down cleanly
    Shutdown {
        #[command(flatten)]
        guest: GuestTarget,

        /// Hard-stop the guest if it has not shut down in time
        #[arg(long)]
        force: bool,

        /// Seconds the guest gets to shut down
        #[arg(long, value_name = "SECONDS")]
        shutdown_timeout: Option<u32>,

        #[command(flatten)]
        wait: WaitArgs,
    },

    /// Reboot a guest
    Reboot {
        #[command(flatten)]
        guest: GuestTarget,

        #[command(flatten)]
        wait: WaitArgs,
    },

    /// Delete a guest
    Delete {
        #[command(flatten)]
        guest: GuestTarget,

        #[command(flatten)]
        wait: WaitArgs,
    },

    /// Clone a guest
    Clone {
        #[command(flatten)]
        guest: GuestTarget,

        /// Id of the copy (next free id when omitted)
        #[arg(long, value_name = "VMID")]
        new_id: Option<u32>,

        /// Name or hostname of the copy
        #[arg(long)]
        name: Option<String>,

        /// Node to place the copy on
        #[arg(long, value_name = "NODE")]
        target: Option<String>,

        /// Full copy instead of a linked clone
        #[arg(long)]
        full: bool,

        /// Description of the copy
        #[arg(long)]
        description: Option<String>,

        #[command(flatten)]
        wait: WaitArgs,
    },
}

/// Container actions: the shared guest actions plus snapshots
#[derive(Subcommand, Debug)]
pub enum ContainerAction {
    #[command(flatten)]
    Guest(GuestAction),

    /// List snapshots of a container
    Snapshots {
        #[command(flatten)]
        guest: GuestTarget,
    },
}
