//! High-level driver for ExaROS configuration transactions.
//!
//! The driver layer provides the main API: connection lifecycle, candidate
//! staging and loading, validation, comparison, commit and rollback.

mod builder;
mod candidate;
pub mod diff;
mod exaros;
pub mod markers;
mod options;
mod transaction;

#[cfg(test)]
pub(crate) mod testing;

pub use builder::DriverBuilder;
pub use candidate::{CandidateConfig, CandidateSource, DEFAULT_CANDIDATE_NAME};
pub use diff::{DiffOutcome, DiffResult, normalize};
pub use exaros::ExarosDriver;
pub use options::DriverOptions;
pub use transaction::{
    CommitOptions, ConfigScope, DeviceConfig, OperationKind, TransactionManager, TransactionState,
};

use std::future::Future;

use crate::channel::Response;
use crate::error::Result;

/// Trait for configuration drivers.
///
/// Calls are sequential: each one completes (prompt seen or timeout)
/// before the next can start.
pub trait Driver: Send {
    /// Open the connection to the device.
    fn open(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Close the connection, discarding any in-flight candidate first.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Check if the driver is connected.
    fn is_open(&self) -> bool;

    /// Check if the underlying session still answers.
    ///
    /// Returns `false` if the driver is not connected, the SSH keepalive
    /// timed out, or the server closed the session.
    ///
    /// ```rust,no_run
    /// # use exaros::driver::Driver;
    /// # async fn example(driver: &mut impl Driver) -> Result<(), exaros::Error> {
    /// if !driver.is_alive().await {
    ///     driver.close().await.ok();
    ///     driver.open().await?;
    /// }
    /// # Ok(())
    /// # }
    /// ```
    fn is_alive(&mut self) -> impl Future<Output = bool> + Send;

    /// Send a raw CLI command and wait for the prompt.
    ///
    /// Commands that change the CLI mode desynchronise the transaction
    /// state and should not be sent this way.
    fn send_command(&mut self, command: &str) -> impl Future<Output = Result<Response>> + Send;

    /// Send multiple commands sequentially.
    fn send_commands(
        &mut self,
        commands: &[&str],
    ) -> impl Future<Output = Result<Vec<Response>>> + Send {
        async move {
            let mut responses = Vec::with_capacity(commands.len());
            for cmd in commands {
                responses.push(self.send_command(cmd).await?);
            }
            Ok(responses)
        }
    }

    /// Stage a candidate and load it to replace the running configuration.
    fn load_replace(
        &mut self,
        source: CandidateSource,
    ) -> impl Future<Output = Result<Response>> + Send;

    /// Stage a candidate and load it to merge into the running configuration.
    fn load_merge(
        &mut self,
        source: CandidateSource,
    ) -> impl Future<Output = Result<Response>> + Send;

    /// Normalized difference between the loaded candidate and running.
    fn compare(&mut self) -> impl Future<Output = Result<DiffResult>> + Send;

    /// Commit the loaded candidate.
    fn commit(&mut self, options: &CommitOptions)
    -> impl Future<Output = Result<Response>> + Send;

    /// Discard the loaded candidate.
    fn discard(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Restore and commit the previous configuration.
    fn rollback(&mut self) -> impl Future<Output = Result<Response>> + Send;

    /// Retrieve configuration text.
    fn get_config(
        &mut self,
        scope: ConfigScope,
    ) -> impl Future<Output = Result<DeviceConfig>> + Send;

    /// Current transaction state; `Idle` when disconnected.
    fn transaction_state(&self) -> TransactionState;
}
