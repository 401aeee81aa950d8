//! SSH transport layer wrapping russh.
//!
//! This module provides the low-level SSH connection management:
//! connection setup, authentication, host key checks, and creation of the
//! interactive PTY channel and one-shot exec channels.

pub mod config;
mod ssh;

pub use config::{AuthMethod, HostKeyVerification, SshConfig};
pub use ssh::{ExecOutput, SshTransport};
