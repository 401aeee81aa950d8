//! Builder for creating device drivers.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use super::exaros::ExarosDriver;
use super::options::DriverOptions;
use crate::error::{DriverError, Result};
use crate::transport::{AuthMethod, HostKeyVerification};

/// Builder for constructing an [`ExarosDriver`].
///
/// # Example
///
/// ```rust,no_run
/// use exaros::{CandidateSource, CommitOptions, Driver, DriverBuilder};
///
/// # async fn example() -> Result<(), exaros::Error> {
/// let mut driver = DriverBuilder::new("edge1.lab")
///     .username("admin")
///     .password("secret")
///     .build()?;
/// driver.open().await?;
///
/// driver.load_merge(CandidateSource::text("ntp server 10.0.0.1\n")).await?;
/// println!("{}", driver.compare().await?.canonical());
/// driver.commit(&CommitOptions::new().comment("add ntp")).await?;
///
/// driver.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct DriverBuilder {
    host: String,
    username: Option<String>,
    auth: AuthMethod,
    options: DriverOptions,
}

impl DriverBuilder {
    /// Create a new driver builder for the specified host.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            username: None,
            auth: AuthMethod::None,
            options: DriverOptions::default(),
        }
    }

    /// Set the username for authentication.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set password authentication.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.auth = AuthMethod::Password(SecretString::from(password.into()));
        self
    }

    /// Set private key authentication.
    pub fn private_key(mut self, key_path: impl Into<PathBuf>) -> Self {
        self.auth = AuthMethod::PrivateKey {
            path: key_path.into(),
            passphrase: None,
        };
        self
    }

    /// Set private key authentication with passphrase.
    pub fn private_key_with_passphrase(
        mut self,
        key_path: impl Into<PathBuf>,
        passphrase: impl Into<String>,
    ) -> Self {
        self.auth = AuthMethod::PrivateKey {
            path: key_path.into(),
            passphrase: Some(SecretString::from(passphrase.into())),
        };
        self
    }

    /// Replace all optional parameters.
    pub fn options(mut self, options: DriverOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the SSH port (default: 22).
    pub fn port(mut self, port: u16) -> Self {
        self.options.port = port;
        self
    }

    /// Set the per-command timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.command_timeout_secs = timeout.as_secs();
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.options.connect_timeout_secs = timeout.as_secs();
        self
    }

    /// Set the host key verification mode.
    pub fn host_key_verification(mut self, mode: HostKeyVerification) -> Self {
        self.options.host_key_verification = mode;
        self
    }

    /// Set the remote directory the candidate is staged in.
    pub fn remote_dir(mut self, dir: impl Into<String>) -> Self {
        self.options.remote_dir = Some(dir.into());
        self
    }

    /// Build the driver.
    ///
    /// This creates the driver but does not connect. Call `open()` on the
    /// returned driver to establish the connection.
    pub fn build(self) -> Result<ExarosDriver> {
        if self.host.trim().is_empty() {
            return Err(DriverError::InvalidConfig {
                message: "Host is required".to_string(),
            }
            .into());
        }
        let username = self.username.ok_or_else(|| DriverError::InvalidConfig {
            message: "Username is required".to_string(),
        })?;
        self.options.validate()?;

        let ssh_config = self.options.ssh_config(&self.host, &username, self.auth);
        Ok(ExarosDriver::new(ssh_config, self.options))
    }
}
