//! Initialization and setup command handlers

use crate::context::CliContext;
use crate::error::Result;
use crate::output::{compress_path, print_info, print_success};
use dialoguer::{theme::ColorfulTheme, Input};
use proxctl_sdk::auth::{normalize_server_url, AuthError, AuthResult, ServerUrlPrompt};
use std::io::Write;
use tracing::{debug, info};

/// Asks for the server URL on the terminal
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalServerPrompt;

impl ServerUrlPrompt for TerminalServerPrompt {
    fn prompt_server_url(&self) -> AuthResult<String> {
        Input::<String>::with_theme(&ColorfulTheme::default())
            .with_prompt("Server URL (e.g. https://pve.example.com:8006)")
            .interact_text()
            .map_err(|e| AuthError::Prompt(e.to_string()))
    }
}

/// Handle the `init` command - store the server URL
pub async fn handle_init(
    ctx: &CliContext,
    server: Option<String>,
    force: bool,
    out: &mut dyn Write,
) -> Result<()> {
    debug!("Initializing proxctl");

    let current = ctx.store.load()?;
    if current.is_configured() && !force {
        print_info(
            out,
            &format!(
                "Already configured for {}. Use --force to overwrite.",
                current.server_url
            ),
        )?;
        return Ok(());
    }

    let input = match server {
        Some(server) => server,
        None => TerminalServerPrompt.prompt_server_url()?,
    };
    let server_url = normalize_server_url(&input)?;

    let server_changed = current.is_configured() && current.server_url != server_url;
    if server_changed && current.session().is_some() {
        info!(
            "Server changed from {} to {}, dropping session",
            current.server_url, server_url
        );
        ctx.store.clear_session_ticket()?;
        print_info(out, "Server changed; the stored session was cleared.")?;
    }

    ctx.store.save_server_url(&server_url)?;

    print_success(
        out,
        &format!(
            "Configured {} (saved to {})",
            server_url,
            compress_path(ctx.store.path())
        ),
    )?;
    print_info(out, "Next: run 'proxctl auth login -u <username>' to log in")?;
    Ok(())
}
