//! Unified logging initialization for proxctl binaries
//!
//! This module provides a standardized logging setup that respects the following priority order:
//! 1. CLI flags (`-v/-q`) - highest priority
//! 2. RUST_LOG environment variable
//! 3. Binary-specific defaults - lowest priority
//!
//! Log lines always go to stderr so that command output on stdout stays
//! machine-readable.

use anyhow::Result;
use clap_verbosity_flag::{LogLevel, Verbosity};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize logging with the specified verbosity level and default filter.
///
/// # Arguments
///
/// * `verbosity` - The verbosity flags from clap (-v/-q)
/// * `default_filter` - The default filter string if no CLI flags or RUST_LOG are set
///
/// # Example
///
/// ```no_run
/// use clap::Parser;
/// use clap_verbosity_flag::{Verbosity, InfoLevel};
/// use proxctl_common::logging;
///
/// #[derive(Parser)]
/// struct Args {
///     #[clap(flatten)]
///     verbosity: Verbosity<InfoLevel>,
/// }
///
/// let args = Args::parse();
/// logging::init_logging(&args.verbosity, "proxctl=info").unwrap();
/// ```
pub fn init_logging<L: LogLevel>(verbosity: &Verbosity<L>, default_filter: &str) -> Result<()> {
    let filter = resolve_filter(verbosity, default_filter)?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_line_number(true)
                .compact(),
        )
        .try_init()?;

    Ok(())
}

/// Initialize logging for CLI tools that should have minimal output by default
///
/// User-facing commands print their results on stdout; tracing output is only
/// enabled when explicitly requested via flags or RUST_LOG.
///
/// # Returns
///
/// * `true` if logging was initialized
/// * `false` if logging was not initialized (no flags and no RUST_LOG)
pub fn init_cli_logging<L: LogLevel>(
    verbosity: &Verbosity<L>,
    default_filter: &str,
) -> Result<bool> {
    if logging_requested(verbosity, std::env::var_os("RUST_LOG").is_some()) {
        init_logging(verbosity, default_filter)?;
        Ok(true)
    } else {
        Ok(false)
    }
}

/// Build the filter: CLI flags first, then RUST_LOG, then the default
fn resolve_filter<L: LogLevel>(verbosity: &Verbosity<L>, default_filter: &str) -> Result<EnvFilter> {
    let filter = if let Some(log_level) = verbosity.log_level() {
        EnvFilter::try_new(format!("{}", log_level))?
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
    };
    Ok(filter)
}

fn logging_requested<L: LogLevel>(verbosity: &Verbosity<L>, rust_log_set: bool) -> bool {
    verbosity.log_level().is_some() || rust_log_set
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use clap_verbosity_flag::OffLevel;

    #[derive(Parser)]
    struct Args {
        #[command(flatten)]
        verbosity: Verbosity<OffLevel>,
    }

    #[test]
    fn test_quiet_cli_does_not_request_logging() {
        let args = Args::parse_from(["proxctl"]);
        assert!(!logging_requested(&args.verbosity, false));
    }

    #[test]
    fn test_verbose_flag_requests_logging() {
        let args = Args::parse_from(["proxctl", "-vv"]);
        assert!(logging_requested(&args.verbosity, false));
    }

    #[test]
    fn test_rust_log_requests_logging() {
        let args = Args::parse_from(["proxctl"]);
        assert!(logging_requested(&args.verbosity, true));
    }

    #[test]
    fn test_verbose_flag_builds_filter() {
        let args = Args::parse_from(["proxctl", "-vvv"]);
        let filter = resolve_filter(&args.verbosity, "proxctl=error").unwrap();
        assert!(filter.to_string().contains("info") || filter.to_string().contains("INFO"));
    }
}
