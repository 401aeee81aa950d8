//! Error types for exaros.

use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::driver::TransactionState;

/// Main error type for exaros operations.
#[derive(Error, Debug)]
pub enum Error {
    /// SSH transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Command channel errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Candidate staging errors
    #[error("Transfer error: {0}")]
    Transfer(#[from] TransferError),

    /// Configuration transaction errors
    #[error("Transaction error: {0}")]
    Transaction(#[from] TransactionError),

    /// Driver-level errors
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),
}

impl Error {
    /// Whether the session is no longer usable and must be reopened.
    ///
    /// Transport failures, channel closure and command timeouts all fall in
    /// this class: there is no partial-command abort in the protocol, so a
    /// timed-out session cannot be resynchronised.
    pub fn is_connection_error(&self) -> bool {
        match self {
            Error::Transport(_) => true,
            Error::Channel(e) => matches!(
                e,
                ChannelError::PatternTimeout(_) | ChannelError::Closed | ChannelError::Ssh(_)
            ),
            Error::Driver(DriverError::NotConnected) => true,
            _ => false,
        }
    }

    /// Device output carried verbatim by a transaction error, if any.
    pub fn device_output(&self) -> Option<&str> {
        match self {
            Error::Transaction(e) => e.device_output(),
            _ => None,
        }
    }
}

/// Transport layer errors (SSH connection, authentication).
#[derive(Error, Debug)]
pub enum TransportError {
    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// SSH key error
    #[error("SSH key error: {0}")]
    Key(String),

    /// The host presented a key different from the one in known_hosts
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// Strict verification is on and the host is not in known_hosts
    #[error("Host {host}:{port} is not in known_hosts")]
    HostKeyUnknown { host: String, port: u16 },

    /// known_hosts could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Command channel errors (prompt matching, mode changes).
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Prompt pattern not seen within the timeout
    #[error("Pattern not found within {0:?}")]
    PatternTimeout(Duration),

    /// Channel closed unexpectedly
    #[error("Channel closed")]
    Closed,

    /// SSH protocol error on the channel
    #[error("Channel SSH error: {0}")]
    Ssh(russh::Error),

    /// Invalid regex pattern
    #[error("Invalid regex pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// A mode command completed but the device is not in the expected mode
    #[error("'{command}' did not reach the expected mode (prompt: '{prompt}')")]
    ModeNotEntered { command: String, prompt: String },

    /// No usable prompt could be read at session start
    #[error("Could not determine the device prompt")]
    PromptNotFound,
}

/// Candidate staging errors (checksums, space, SCP).
#[derive(Error, Debug)]
pub enum TransferError {
    /// Local payload could not be read or materialised
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Remote content does not match the local payload after transfer
    #[error("Checksum mismatch for {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    /// Not enough free space on the remote filesystem
    #[error("Insufficient space for {path}: need {required} bytes, {available} available")]
    InsufficientSpace {
        path: String,
        required: u64,
        available: u64,
    },

    /// A remote helper command failed
    #[error("Remote command '{command}' failed: {message}")]
    Remote { command: String, message: String },

    /// The remote SCP sink rejected the transfer
    #[error("SCP protocol error: {0}")]
    Protocol(String),

    /// SSH error while transferring
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),
}

/// Configuration transaction errors.
///
/// Every variant produced by a device response carries that response
/// verbatim so operators can see what the device rejected.
#[derive(Error, Debug)]
pub enum TransactionError {
    /// The candidate was staged but `load` did not report success
    #[error("Load failed:\n\n{output}")]
    CandidateLoad { output: String },

    /// `commit check` did not report a clean validation
    #[error("Commit check failed:\n\n{output}")]
    Validation { output: String },

    /// Commit was refused, or its arguments could not be sent
    #[error("Commit failed: {message}\n\n{output}")]
    Commit { message: String, output: String },

    /// The device rejected a merge as invalid input; the candidate was discarded
    #[error("Merge rejected by device:\n\n{output}")]
    MergeConfig { output: String },

    /// The operation is not valid in the current transaction state
    #[error("Cannot {operation} while transaction is {state}")]
    InvalidState {
        operation: &'static str,
        state: TransactionState,
    },
}

impl TransactionError {
    /// Device output carried by this error, if any.
    pub fn device_output(&self) -> Option<&str> {
        match self {
            TransactionError::CandidateLoad { output }
            | TransactionError::Validation { output }
            | TransactionError::MergeConfig { output } => Some(output),
            TransactionError::Commit { output, .. } if !output.is_empty() => Some(output),
            _ => None,
        }
    }
}

/// Driver layer errors.
#[derive(Error, Debug)]
pub enum DriverError {
    /// Driver not connected
    #[error("Driver not connected - call open() first")]
    NotConnected,

    /// Driver already connected
    #[error("Driver already connected")]
    AlreadyConnected,

    /// Invalid configuration in the driver builder or options
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

/// Result type alias using exaros's Error.
pub type Result<T> = std::result::Result<T, Error>;
