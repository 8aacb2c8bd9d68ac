//! `status` command handler

use crate::context::CliContext;
use crate::error::Result;
use crate::output::{compress_path, json_output, print_error, print_info, print_success};
use proxctl_sdk::ClusterApi;
use serde::Serialize;
use std::io::Write;
use tracing::debug;

#[derive(Debug, Serialize)]
struct StatusReport {
    config_path: String,
    server_url: Option<String>,
    authenticated: bool,
    username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    connection: Option<ConnectionReport>,
}

#[derive(Debug, Serialize)]
struct ConnectionReport {
    reachable: bool,
    version: Option<String>,
    error: Option<String>,
    /// Cluster members, only read with a session
    #[serde(skip_serializing_if = "Vec::is_empty")]
    nodes: Vec<NodeLine>,
}

#[derive(Debug, Serialize)]
struct NodeLine {
    node: String,
    online: bool,
}

/// Handle the `status` command - show local state, optionally test the connection
pub async fn handle_status(ctx: &CliContext, check: bool, out: &mut dyn Write) -> Result<()> {
    let snapshot = ctx.store.load()?;
    let session = snapshot.session();

    let connection = if check && snapshot.is_configured() {
        Some(check_connection(ctx, session.is_some(), &snapshot.server_url).await)
    } else {
        None
    };

    let report = StatusReport {
        config_path: compress_path(ctx.store.path()),
        server_url: snapshot
            .is_configured()
            .then(|| snapshot.server_url.clone()),
        authenticated: session.is_some(),
        username: session.and_then(|s| s.username),
        connection,
    };

    if ctx.json {
        return json_output(out, &report);
    }

    print_info(out, &format!("Config file: {}", report.config_path))?;
    match &report.server_url {
        Some(url) => print_info(out, &format!("Server: {url}"))?,
        None => {
            print_error(
                out,
                "Not configured. Run 'proxctl init' or 'proxctl auth login -u <username>'",
            )?;
            return Ok(());
        }
    }

    if report.authenticated {
        let who = report.username.as_deref().unwrap_or("unknown user");
        print_success(out, &format!("Authenticated as {who}"))?;
    } else {
        print_error(
            out,
            "Not authenticated. Run 'proxctl auth login -u <username>'",
        )?;
    }

    if let Some(connection) = &report.connection {
        if connection.reachable {
            let version = connection.version.as_deref().unwrap_or("unknown");
            print_success(out, &format!("Connection OK (server version {version})"))?;
            for line in &connection.nodes {
                let state = if line.online { "online" } else { "offline" };
                print_info(out, &format!("  {}: {}", line.node, state))?;
            }
        } else {
            let error = connection.error.as_deref().unwrap_or("unknown error");
            print_error(out, &format!("Connection failed: {error}"))?;
        }
    }

    Ok(())
}

/// With a session, read the version and node list through the selected
/// backend; without one, fall back to the anonymous probe
async fn check_connection(
    ctx: &CliContext,
    authenticated: bool,
    server_url: &str,
) -> ConnectionReport {
    debug!("Checking connection to {}", server_url);

    if authenticated {
        let backend = match ctx.authenticated_backend() {
            Ok(backend) => backend,
            Err(e) => return ConnectionReport::failed(e.to_string()),
        };
        let timeout = ctx.config.probe_timeout();
        let no_response = || format!("no response within {}s", timeout.as_secs());

        let version = match tokio::time::timeout(timeout, backend.version()).await {
            Ok(Ok(version)) => version,
            Ok(Err(e)) => return ConnectionReport::failed(e.to_string()),
            Err(_) => return ConnectionReport::failed(no_response()),
        };

        let nodes = match tokio::time::timeout(timeout, backend.nodes()).await {
            Ok(Ok(nodes)) => nodes
                .into_iter()
                .map(|node| NodeLine {
                    online: node.is_online(),
                    node: node.node,
                })
                .collect(),
            Ok(Err(e)) => {
                debug!("Could not list nodes: {}", e);
                Vec::new()
            }
            Err(_) => {
                debug!("Could not list nodes: {}", no_response());
                Vec::new()
            }
        };

        return ConnectionReport {
            reachable: true,
            version: Some(version.version),
            error: None,
            nodes,
        };
    }

    match ctx.authenticator().probe(server_url).await {
        Ok(version) => ConnectionReport {
            reachable: true,
            version: version.map(|v| v.version),
            error: None,
            nodes: Vec::new(),
        },
        Err(e) => ConnectionReport::failed(e.to_string()),
    }
}

impl ConnectionReport {
    fn failed(error: String) -> Self {
        Self {
            reachable: false,
            version: None,
            error: Some(error),
            nodes: Vec::new(),
        }
    }
}
