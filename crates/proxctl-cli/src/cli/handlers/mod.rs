//! Command handlers for the proxctl CLI

pub mod auth;
pub mod guest;
pub mod init;
pub mod lxc;
pub mod nodes;
pub mod status;
pub mod vm;

use crate::cli::commands::Commands;
use crate::context::CliContext;
use crate::error::Result;
use crate::output::print_error;
use std::io::Write;
use tracing::debug;

/// Dispatch one command and render its outcome to `out`
///
/// Command failures are printed to `out`. Only fatal errors (local storage
/// or settings problems) are returned.
pub async fn run_command(ctx: &CliContext, command: Commands, out: &mut dyn Write) -> Result<()> {
    let result = match command {
        Commands::Init { server, force } => init::handle_init(ctx, server, force, out).await,
        Commands::Status { check } => status::handle_status(ctx, check, out).await,
        Commands::Auth { action } => auth::handle_auth(ctx, action, out).await,
        Commands::Nodes { action } => nodes::handle_nodes(ctx, action, out).await,
        Commands::Vm { action } => vm::handle_vm(ctx, action, out).await,
        Commands::Lxc { action } => lxc::handle_lxc(ctx, action, out).await,
    };

    match result {
        Err(e) if !e.is_fatal() => {
            debug!("Command failed ({:?}): {}", e.kind(), e);
            print_error(out, &e.to_string())
        }
        other => other,
    }
}
