//! Node command handlers

use crate::cli::commands::NodeAction;
use crate::context::CliContext;
use crate::error::Result;
use crate::output::{
    json_output, print_info,
    table_output::{describe_node, display_fields, display_nodes},
};
use proxctl_sdk::{ApiError, ClusterApi};
use serde::Serialize;
use std::io::Write;
use tracing::{debug, warn};

/// Dispatch `nodes` subcommands
pub async fn handle_nodes(ctx: &CliContext, action: NodeAction, out: &mut dyn Write) -> Result<()> {
    match action {
        NodeAction::Get => handle_list_nodes(ctx, out).await,
        NodeAction::Describe { name } => handle_describe_node(ctx, &name, out).await,
    }
}

/// List nodes in the order the cluster returns them
pub async fn handle_list_nodes(ctx: &CliContext, out: &mut dyn Write) -> Result<()> {
    let backend = ctx.authenticated_backend()?;
    debug!("Listing nodes");
    let nodes = backend.nodes().await?;

    if ctx.json {
        return json_output(out, &nodes);
    }
    if nodes.is_empty() {
        return print_info(out, "No nodes found");
    }
    display_nodes(out, &nodes)
}

pub async fn handle_describe_node(ctx: &CliContext, name: &str, out: &mut dyn Write) -> Result<()> {
    #[derive(Serialize)]
    struct NodeDescription<'a> {
        #[serde(flatten)]
        status: &'a proxctl_sdk::NodeStatus,
        virtual_machines: usize,
        containers: usize,
    }

    let backend = ctx.authenticated_backend()?;
    let nodes = backend.nodes().await?;
    let status = nodes
        .iter()
        .find(|node| node.node == name)
        .ok_or_else(|| ApiError::NotFound {
            resource: format!("node {name}"),
        })?;

    let (virtual_machines, containers) = if status.is_online() {
        let node = backend.node(name).await?;
        let vms = node.virtual_machines().await.map(|v| v.len());
        let cts = node.containers().await.map(|c| c.len());
        match (vms, cts) {
            (Ok(vms), Ok(cts)) => (vms, cts),
            (vms, cts) => {
                warn!("Could not count guests on {}", name);
                (vms.unwrap_or(0), cts.unwrap_or(0))
            }
        }
    } else {
        (0, 0)
    };

    if ctx.json {
        return json_output(
            out,
            &NodeDescription {
                status,
                virtual_machines,
                containers,
            },
        );
    }
    display_fields(out, describe_node(status, virtual_machines, containers))
}
