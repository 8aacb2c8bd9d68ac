//! # proxctl SDK
//!
//! Client library for virtualization cluster management APIs.
//!
//! The crate is organised around a small set of capability traits
//! ([`ClusterApi`], [`NodeApi`], [`ContainerApi`], [`VirtualMachineApi`]).
//! [`ProxmoxClient`] implements them over HTTP; test harnesses supply their
//! own implementations through [`Backend::Injected`]. Enable the `mocks`
//! feature to get `mockall` doubles for every trait.
//!
//! Session handling lives in [`auth`]: the [`CredentialStore`] persists the
//! server URL and ticket, [`auth::check`] decides locally whether a command
//! may go to the network, and [`SessionAuthenticator`] performs the login.

pub mod auth;
pub mod client;
pub mod error;
pub mod facade;
pub mod task;
pub mod types;

pub use auth::{
    AuthError, AuthResult, CredentialSnapshot, CredentialStore, Credentials, LoginOutcome,
    SessionAuthenticator, SessionTicket,
};
pub use client::{ClientBuilder, GuestKind, ProxmoxClient};
pub use error::{ApiError, ErrorKind, Result};
pub use facade::{Backend, ClusterApi, ContainerApi, NodeApi, VirtualMachineApi};
pub use task::wait_for_task;
pub use types::*;

#[cfg(any(test, feature = "mocks"))]
pub use facade::{MockClusterApi, MockContainerApi, MockNodeApi, MockVirtualMachineApi};
