//! Checksum-verified staging, with SCP over the session's SSH connection.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use russh::client::Msg;
use russh::{Channel, ChannelMsg};

use super::checksum::{
    parse_checksum_output, parse_df_available, render_command, sha256_hex, shell_quote,
};
use super::{FileTransfer, RemoteHost, TransferOutcome};
use crate::error::{Result, TransferError, TransportError};
use crate::transport::{ExecOutput, SshTransport};

/// Remote helper commands and limits for staging.
#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// Prints the SHA-256 of `{path}`; exits non-zero if it does not exist.
    pub checksum_command: String,

    /// Reports free space for `{dir}` in `df -k` format.
    pub space_command: String,

    /// Upper bound for the copy itself.
    pub timeout: Duration,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            checksum_command: "sha256sum {path}".to_string(),
            space_command: "df -k {dir}".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Checksum-verified uploader.
pub struct ScpTransfer<H = SshTransport> {
    host: Arc<H>,
    config: TransferConfig,
}

impl<H: RemoteHost> ScpTransfer<H> {
    /// Create an uploader on `host`.
    pub fn new(host: Arc<H>, config: TransferConfig) -> Self {
        Self { host, config }
    }

    /// SHA-256 of the remote file, or `None` if it does not exist.
    async fn remote_checksum(&self, remote_path: &str) -> Result<Option<String>> {
        let command = render_command(&self.config.checksum_command, remote_path);
        let output = self.host.exec(&command).await?;
        if !output.success() {
            return Ok(None);
        }
        Ok(parse_checksum_output(&output.stdout_lossy()))
    }

    async fn check_space(&self, remote_path: &str, required: u64) -> Result<()> {
        let command = render_command(&self.config.space_command, remote_path);
        let output = self.host.exec(&command).await?;
        if !output.success() {
            return Err(TransferError::Remote {
                command,
                message: output.stderr_lossy().trim().to_string(),
            }
            .into());
        }

        let Some(available) = parse_df_available(&output.stdout_lossy()) else {
            return Err(TransferError::Remote {
                command,
                message: "could not parse available space".to_string(),
            }
            .into());
        };

        if available < required {
            return Err(TransferError::InsufficientSpace {
                path: remote_path.to_string(),
                required,
                available,
            }
            .into());
        }
        Ok(())
    }
}

impl<H: RemoteHost> FileTransfer for ScpTransfer<H> {
    async fn stage(&mut self, local: &Path, remote_path: &str) -> Result<TransferOutcome> {
        let payload = tokio::fs::read(local).await.map_err(TransferError::Io)?;
        let expected = sha256_hex(&payload);

        if self.remote_checksum(remote_path).await?.as_deref() == Some(expected.as_str()) {
            debug!("{} already staged, skipping transfer", remote_path);
            return Ok(TransferOutcome::Skipped);
        }

        self.check_space(remote_path, payload.len() as u64).await?;

        let timeout = self.config.timeout;
        tokio::time::timeout(timeout, self.host.put(&payload, remote_path))
            .await
            .map_err(|_| TransportError::Timeout(timeout))??;

        match self.remote_checksum(remote_path).await? {
            Some(actual) if actual == expected => {
                info!("staged {} bytes at {}", payload.len(), remote_path);
                Ok(TransferOutcome::Transferred)
            }
            actual => Err(TransferError::ChecksumMismatch {
                path: remote_path.to_string(),
                expected,
                actual: actual.unwrap_or_else(|| "<missing>".to_string()),
            }
            .into()),
        }
    }
}

impl RemoteHost for SshTransport {
    async fn exec(&self, command: &str) -> Result<ExecOutput> {
        SshTransport::exec(self, command).await
    }

    /// Push `payload` with the SCP sink protocol (`scp -t`).
    async fn put(&self, payload: &[u8], remote_path: &str) -> Result<()> {
        let name = remote_path.rsplit('/').next().unwrap_or(remote_path);
        let mut channel = self
            .open_exec(&format!("scp -t {}", shell_quote(remote_path)))
            .await?;

        read_ack(&mut channel).await?;

        let header = format!("C0644 {} {}\n", payload.len(), name);
        channel
            .data(header.as_bytes())
            .await
            .map_err(TransferError::Ssh)?;
        read_ack(&mut channel).await?;

        channel.data(payload).await.map_err(TransferError::Ssh)?;
        channel
            .data(&[0u8][..])
            .await
            .map_err(TransferError::Ssh)?;
        read_ack(&mut channel).await?;

        channel.eof().await.map_err(TransferError::Ssh)?;
        Ok(())
    }
}

/// Wait for an SCP acknowledgement byte.
///
/// `0` is success; `1` (warning) and `2` (fatal) are followed by a message.
async fn read_ack(channel: &mut Channel<Msg>) -> Result<()> {
    loop {
        match channel.wait().await {
            Some(ChannelMsg::Data { ref data }) => match data.first() {
                None => continue,
                Some(0) => return Ok(()),
                Some(_) => {
                    let message = String::from_utf8_lossy(&data[1..]).trim().to_string();
                    return Err(TransferError::Protocol(message).into());
                }
            },
            Some(ChannelMsg::ExitStatus { exit_status }) if exit_status != 0 => {
                return Err(TransferError::Protocol(format!(
                    "scp exited with status {exit_status}"
                ))
                .into());
            }
            Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => {
                return Err(
                    TransferError::Protocol("scp sink closed the channel".to_string()).into(),
                );
            }
            Some(_) => {}
        }
    }
}
