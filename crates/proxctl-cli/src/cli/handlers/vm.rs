//! `vm` command handlers

use crate::cli::commands::GuestAction;
use crate::cli::handlers::guest::handle_guest_action;
use crate::context::CliContext;
use crate::error::Result;
use proxctl_sdk::GuestKind;
use std::io::Write;

/// Dispatch `vm` subcommands
pub async fn handle_vm(ctx: &CliContext, action: GuestAction, out: &mut dyn Write) -> Result<()> {
    handle_guest_action(ctx, GuestKind::VirtualMachine, action, out).await
}
