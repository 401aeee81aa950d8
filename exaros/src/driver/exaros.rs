//! ExaROS device driver.

use std::sync::Arc;

use log::{debug, info, warn};

use super::Driver;
use super::candidate::CandidateSource;
use super::diff::DiffResult;
use super::options::DriverOptions;
use super::transaction::{
    CommitOptions, ConfigScope, DeviceConfig, OperationKind, TransactionManager, TransactionState,
};
use crate::channel::{CommandChannel, PtyChannel, Response};
use crate::error::{DriverError, Result};
use crate::transfer::ScpTransfer;
use crate::transport::{SshConfig, SshTransport};

type Manager = TransactionManager<PtyChannel, ScpTransfer>;

/// An open connection: the shared SSH transport and the transaction
/// manager driving its PTY channel.
struct Session {
    transport: Arc<SshTransport>,
    manager: Manager,
}

/// Driver for one ExaROS device.
///
/// The CLI session carries the configuration transaction; candidate files
/// are staged over SCP on the same SSH connection.
pub struct ExarosDriver {
    /// SSH configuration, shared with every transport opened from it.
    ssh_config: Arc<SshConfig>,

    options: DriverOptions,

    /// Live session (None when disconnected).
    session: Option<Session>,
}

impl ExarosDriver {
    /// Create a disconnected driver.
    pub fn new(ssh_config: SshConfig, options: DriverOptions) -> Self {
        Self {
            ssh_config: Arc::new(ssh_config),
            options,
            session: None,
        }
    }

    /// Get the SSH configuration.
    pub fn ssh_config(&self) -> &SshConfig {
        &self.ssh_config
    }

    /// Get the driver options.
    pub fn options(&self) -> &DriverOptions {
        &self.options
    }

    /// Base prompt learned when the session was opened.
    pub fn base_prompt(&self) -> Option<&str> {
        self.session
            .as_ref()
            .map(|s| s.manager.channel().prompts().base_prompt())
    }

    /// Commit check on the staged candidate without committing.
    pub async fn validate(&mut self) -> Result<()> {
        self.manager()?.validate().await
    }

    fn manager(&mut self) -> Result<&mut Manager> {
        self.session
            .as_mut()
            .map(|s| &mut s.manager)
            .ok_or_else(|| DriverError::NotConnected.into())
    }

    async fn load(&mut self, kind: OperationKind, source: CandidateSource) -> Result<Response> {
        self.manager()?.load(kind, source).await
    }
}

impl Driver for ExarosDriver {
    async fn open(&mut self) -> Result<()> {
        if self.session.is_some() {
            return Err(DriverError::AlreadyConnected.into());
        }

        let transport = Arc::new(SshTransport::connect(self.ssh_config.clone()).await?);
        let channel = match PtyChannel::open(transport.clone(), self.options.pty_config()).await {
            Ok(channel) => channel,
            Err(e) => {
                if let Err(close) = transport.close().await {
                    debug!("disconnect after failed session setup: {}", close);
                }
                return Err(e);
            }
        };
        info!(
            "connected to {} (prompt '{}')",
            self.ssh_config.socket_addr(),
            channel.prompts().base_prompt()
        );

        let transfer = ScpTransfer::new(transport.clone(), self.options.transfer_config());
        let manager = TransactionManager::new(
            channel,
            transfer,
            self.options.candidate_config(),
            self.options.command_timeout(),
        );
        self.session = Some(Session { transport, manager });
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut session) = self.session.take() {
            if let Err(e) = session.manager.shutdown().await {
                warn!("could not discard in-flight candidate: {}", e);
            }
            session.transport.close().await?;
            info!("disconnected from {}", self.ssh_config.socket_addr());
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.session.is_some()
    }

    async fn is_alive(&mut self) -> bool {
        match self.session.as_mut() {
            Some(session) => session.manager.channel_mut().is_alive().await,
            None => false,
        }
    }

    async fn send_command(&mut self, command: &str) -> Result<Response> {
        let timeout = self.options.command_timeout();
        self.manager()?
            .channel_mut()
            .send_command(command, timeout)
            .await
    }

    async fn load_replace(&mut self, source: CandidateSource) -> Result<Response> {
        self.load(OperationKind::Replace, source).await
    }

    async fn load_merge(&mut self, source: CandidateSource) -> Result<Response> {
        self.load(OperationKind::Merge, source).await
    }

    async fn compare(&mut self) -> Result<DiffResult> {
        self.manager()?.compare().await
    }

    async fn commit(&mut self, options: &CommitOptions) -> Result<Response> {
        self.manager()?.commit(options).await
    }

    async fn discard(&mut self) -> Result<()> {
        self.manager()?.discard().await
    }

    async fn rollback(&mut self) -> Result<Response> {
        self.manager()?.rollback().await
    }

    async fn get_config(&mut self, scope: ConfigScope) -> Result<DeviceConfig> {
        self.manager()?.get_config(scope).await
    }

    fn transaction_state(&self) -> TransactionState {
        self.session
            .as_ref()
            .map_or(TransactionState::Idle, |s| s.manager.state())
    }
}
