//! Authentication module for the proxctl SDK
//!
//! This module provides:
//! - Persistent storage of the server URL and session ticket
//! - The local gate every resource command passes before touching the network
//! - Username/password login with a connectivity probe

pub mod credential_store;
pub mod gate;
pub mod session;
pub mod types;

// Re-export commonly used types and functions
pub use credential_store::CredentialStore;
pub use gate::{check, Authenticated};
pub use session::{normalize_server_url, LoginOutcome, ServerUrlPrompt, SessionAuthenticator};
pub use types::{AuthError, AuthResult, CredentialSnapshot, Credentials, SessionTicket};
