//! Shared building blocks for the proxctl workspace
//!
//! Holds the pieces every binary and library in the workspace agrees on:
//! logging initialisation and the configuration error type.

pub mod error;
pub mod logging;

pub use error::ConfigurationError;
