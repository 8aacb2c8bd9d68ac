//! Authentication command handlers

use crate::cli::commands::AuthAction;
use crate::cli::handlers::init::TerminalServerPrompt;
use crate::context::CliContext;
use crate::error::Result;
use crate::output::{json_output, print_auth, print_info, print_success};
use dialoguer::{theme::ColorfulTheme, Password};
use proxctl_sdk::auth::{normalize_server_url, AuthError, ServerUrlPrompt};
use proxctl_sdk::Credentials;
use serde::Serialize;
use std::io::{BufRead, Write};
use tracing::{debug, info};

/// Dispatch `auth` subcommands
pub async fn handle_auth(ctx: &CliContext, action: AuthAction, out: &mut dyn Write) -> Result<()> {
    match action {
        AuthAction::Login {
            username,
            password_stdin,
            server,
        } => {
            let password = if password_stdin {
                read_password_from_stdin()?
            } else {
                prompt_password(&username)?
            };
            handle_login(ctx, &username, &password, server, out).await
        }
        AuthAction::Logout => handle_logout(ctx, out).await,
        AuthAction::View => handle_view(ctx, out).await,
    }
}

/// Handle login command
pub async fn handle_login(
    ctx: &CliContext,
    username: &str,
    password: &str,
    server: Option<String>,
    out: &mut dyn Write,
) -> Result<()> {
    debug!("Starting login for {}", username);

    if let Some(server) = server {
        let server_url = normalize_server_url(&server)?;
        let current = ctx.store.load()?;
        if current.server_url != server_url {
            if current.session().is_some() {
                ctx.store.clear_session_ticket()?;
            }
            ctx.store.save_server_url(&server_url)?;
        }
    }

    let credentials = Credentials::new(username, password);
    let prompt: &dyn ServerUrlPrompt = &TerminalServerPrompt;
    let outcome = ctx.authenticator().login(&credentials, Some(prompt)).await?;

    info!("Logged in to {} as {}", outcome.server_url, outcome.username);
    print_success(
        out,
        &format!(
            "Logged in to {} as {}",
            outcome.server_url, outcome.username
        ),
    )?;
    if let Some(version) = &outcome.version {
        print_info(out, &format!("Server version: {version}"))?;
    }
    Ok(())
}

/// Handle logout command
pub async fn handle_logout(ctx: &CliContext, out: &mut dyn Write) -> Result<()> {
    let snapshot = ctx.store.load()?;
    if snapshot.ticket.is_empty() && snapshot.csrf_token.is_empty() {
        print_info(out, "Not currently logged in")?;
        return Ok(());
    }

    ctx.store.clear_session_ticket()?;
    info!("Session cleared");
    print_success(out, "Logged out")?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct SessionView {
    server_url: String,
    username: Option<String>,
    ticket: String,
}

/// Handle `auth view` - show the stored session with the ticket masked
pub async fn handle_view(ctx: &CliContext, out: &mut dyn Write) -> Result<()> {
    let snapshot = ctx.store.load()?;
    let passed = proxctl_sdk::auth::check(&snapshot)?;

    let view = SessionView {
        server_url: passed.server_url,
        username: passed.session.username.clone(),
        ticket: passed.session.masked(),
    };

    if ctx.json {
        return json_output(out, &view);
    }

    print_auth(out, &format!("Server:   {}", view.server_url))?;
    print_auth(
        out,
        &format!(
            "User:     {}",
            view.username.as_deref().unwrap_or("unknown")
        ),
    )?;
    print_auth(out, &format!("Ticket:   {}", view.ticket))?;
    Ok(())
}

fn prompt_password(username: &str) -> Result<String> {
    Password::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("Password for {username}"))
        .interact()
        .map_err(|e| AuthError::Prompt(format!("failed to read password: {e}")).into())
}

fn read_password_from_stdin() -> Result<String> {
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
