//! Main entry point for proxctl

use clap::{CommandFactory, Parser};
use clap_complete::env::CompleteEnv;
use clap_verbosity_flag::LevelFilter;
use color_eyre::eyre::{eyre, Result};
use proxctl_cli::cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Shell completions must be handled before argument parsing
    CompleteEnv::with_factory(Args::command).complete();

    let args = Args::parse();

    color_eyre::config::HookBuilder::default()
        .display_location_section(false)
        .display_env_section(false)
        .install()?;

    if args.verbosity.log_level_filter() >= LevelFilter::Debug {
        std::env::set_var("RUST_LIB_BACKTRACE", "1");
    }

    let binary_name = env!("CARGO_BIN_NAME").replace('-', "_");
    proxctl_common::logging::init_cli_logging(&args.verbosity, &format!("{binary_name}=info"))
        .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

    Ok(args.run().await?)
}
