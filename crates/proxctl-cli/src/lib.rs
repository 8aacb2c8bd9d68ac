//! # proxctl
//!
//! Command-line client for virtualization cluster management.
//!
//! ## Architecture
//!
//! - Clap-based argument parsing with derive macros
//! - Handler-based command processing that renders into any writer
//! - A [`CliContext`](context::CliContext) carrying the credential store,
//!   settings and backend selector into every handler
//! - A swappable [`BackendSelector`](client::BackendSelector) so commands
//!   can run against an injected cluster facade

pub mod cli;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod output;

pub use cli::*;
pub use error::*;
