//! Typed driver options.
//!
//! Every optional connection and staging parameter is a named field with a
//! documented default. Options can be built in code or deserialized from
//! any serde format; unknown keys are rejected.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use super::candidate::{CandidateConfig, DEFAULT_CANDIDATE_NAME};
use crate::channel::PtyConfig;
use crate::error::{DriverError, Result};
use crate::transfer::TransferConfig;
use crate::transport::{AuthMethod, HostKeyVerification, SshConfig};

/// Optional driver parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DriverOptions {
    /// SSH port (default: 22).
    pub port: u16,

    /// Connect, authenticate and session-preparation timeout (default: 30).
    pub connect_timeout_secs: u64,

    /// Per-command timeout (default: 60).
    pub command_timeout_secs: u64,

    /// SSH keepalive interval; disabled when unset.
    pub keepalive_interval_secs: Option<u64>,

    /// Bytes of output searched for the prompt (default: 1000).
    pub search_depth: usize,

    /// PTY width (default: 511).
    pub terminal_width: u32,

    /// PTY height (default: 24).
    pub terminal_height: u32,

    /// Host key checking (default: `accept_new`).
    pub host_key_verification: HostKeyVerification,

    /// known_hosts location (default: `~/.ssh/known_hosts`).
    pub known_hosts_path: Option<PathBuf>,

    /// Remote file name of the staged candidate (default: `candidate.conf`).
    pub candidate_name: String,

    /// Remote directory for the candidate; the login directory when unset.
    /// The staged path is passed to `load`, so it may not contain
    /// whitespace or quotes.
    pub remote_dir: Option<String>,

    /// Commands sent once per session after the prompt is known.
    pub on_open_commands: Vec<String>,

    /// Remote checksum helper, `{path}` is substituted.
    pub checksum_command: String,

    /// Remote free-space helper, `{dir}` is substituted.
    pub space_command: String,
}

impl Default for DriverOptions {
    fn default() -> Self {
        let pty = PtyConfig::default();
        let transfer = TransferConfig::default();
        Self {
            port: 22,
            connect_timeout_secs: 30,
            command_timeout_secs: 60,
            keepalive_interval_secs: None,
            search_depth: pty.search_depth,
            terminal_width: 511,
            terminal_height: 24,
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
            candidate_name: DEFAULT_CANDIDATE_NAME.to_string(),
            remote_dir: None,
            on_open_commands: pty.on_open_commands,
            checksum_command: transfer.checksum_command,
            space_command: transfer.space_command,
        }
    }
}

impl DriverOptions {
    /// Check field values.
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(invalid("port must be non-zero"));
        }
        if self.connect_timeout_secs == 0 || self.command_timeout_secs == 0 {
            return Err(invalid("timeouts must be non-zero"));
        }
        if self.keepalive_interval_secs == Some(0) {
            return Err(invalid("keepalive interval must be non-zero"));
        }
        if self.search_depth == 0 {
            return Err(invalid("search depth must be non-zero"));
        }
        if self.candidate_name.is_empty()
            || self
                .candidate_name
                .chars()
                .any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '/'))
        {
            return Err(invalid(&format!(
                "invalid candidate name '{}'",
                self.candidate_name
            )));
        }
        if let Some(dir) = &self.remote_dir {
            if dir.is_empty()
                || dir
                    .chars()
                    .any(|c| c.is_whitespace() || matches!(c, '"' | '\''))
            {
                return Err(invalid(&format!("invalid remote directory '{dir}'")));
            }
        }
        if !self.checksum_command.contains("{path}") {
            return Err(invalid("checksum command must contain {path}"));
        }
        if self.space_command.trim().is_empty() {
            return Err(invalid("space command must not be empty"));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    /// SSH settings for `host` as `username`.
    pub fn ssh_config(&self, host: &str, username: &str, auth: AuthMethod) -> SshConfig {
        SshConfig {
            host: host.to_string(),
            port: self.port,
            username: username.to_string(),
            auth,
            timeout: self.connect_timeout(),
            keepalive_interval: self.keepalive_interval_secs.map(Duration::from_secs),
            terminal_width: self.terminal_width,
            terminal_height: self.terminal_height,
            host_key_verification: self.host_key_verification.clone(),
            known_hosts_path: self.known_hosts_path.clone(),
        }
    }

    pub fn pty_config(&self) -> PtyConfig {
        PtyConfig {
            timeout: self.connect_timeout(),
            search_depth: self.search_depth,
            on_open_commands: self.on_open_commands.clone(),
        }
    }

    pub fn transfer_config(&self) -> TransferConfig {
        TransferConfig {
            checksum_command: self.checksum_command.clone(),
            space_command: self.space_command.clone(),
            timeout: self.command_timeout(),
        }
    }

    pub fn candidate_config(&self) -> CandidateConfig {
        CandidateConfig::new(self.candidate_name.clone(), self.remote_dir.as_deref())
    }
}

fn invalid(message: &str) -> crate::Error {
    DriverError::InvalidConfig {
        message: message.to_string(),
    }
    .into()
}
