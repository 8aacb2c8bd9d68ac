//! `lxc` command handlers

use crate::cli::commands::{ContainerAction, GuestTarget};
use crate::cli::handlers::guest::handle_guest_action;
use crate::context::CliContext;
use crate::error::Result;
use crate::output::{json_output, print_info, table_output::display_snapshots};
use proxctl_sdk::{ClusterApi, GuestKind, NodeApi};
use std::io::Write;
use tracing::debug;

/// Dispatch `lxc` subcommands
pub async fn handle_lxc(
    ctx: &CliContext,
    action: ContainerAction,
    out: &mut dyn Write,
) -> Result<()> {
    match action {
        ContainerAction::Guest(action) => {
            handle_guest_action(ctx, GuestKind::Container, action, out).await
        }
        ContainerAction::Snapshots { guest } => handle_snapshots(ctx, &guest, out).await,
    }
}

/// List snapshots of one container
pub async fn handle_snapshots(
    ctx: &CliContext,
    target: &GuestTarget,
    out: &mut dyn Write,
) -> Result<()> {
    let backend = ctx.authenticated_backend()?;
    let container = backend
        .node(&target.node)
        .await?
        .container(target.vmid)
        .await?;

    let snapshots = container.snapshots().await?;
    debug!(
        "Container {} has {} snapshot entries",
        target.vmid,
        snapshots.len()
    );

    if ctx.json {
        return json_output(out, &snapshots);
    }
    if snapshots.is_empty() {
        return print_info(out, &format!("Container {} has no snapshots", target.vmid));
    }
    display_snapshots(out, &snapshots)
}
