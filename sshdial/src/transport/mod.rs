//! SSH transport layer wrapping russh.
//!
//! This module parses SSH connection settings, authenticates a session,
//! and proxies dials over it as `direct-tcpip` channels.

pub(crate) mod addr;
mod auth;
mod builder;
pub mod config;
mod ssh;

pub use builder::SshDialerBuilder;
pub use config::{
    AuthMethod, DEFAULT_PORT, DEFAULT_USER, HostKeyCallback, HostKeyPolicy, SshConfig,
    fingerprint,
};
pub use ssh::SshDialer;
