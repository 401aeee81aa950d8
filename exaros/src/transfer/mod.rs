//! Candidate staging: checksum-verified file transfer to the device.
//!
//! [`FileTransfer`] is the staging interface the transaction manager uses.
//! [`ScpTransfer`] implements it on top of a [`RemoteHost`] (the session's
//! SSH connection in production): an existing remote file with a matching
//! SHA-256 short-circuits the copy, free space is checked before sending,
//! and the digest is verified after.

mod checksum;
mod scp;

use std::future::Future;
use std::path::Path;

pub use checksum::{parse_checksum_output, parse_df_available, render_command, sha256_hex, shell_quote};
pub use scp::{ScpTransfer, TransferConfig};

use crate::error::Result;
use crate::transport::ExecOutput;

/// What a staging call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    /// The payload was copied and verified.
    Transferred,

    /// The remote file already had the payload's checksum.
    Skipped,
}

/// Stages a local file at a path on the device.
pub trait FileTransfer: Send {
    /// Copy `local` to `remote_path`, skipping the copy when the remote
    /// content already matches.
    fn stage(
        &mut self,
        local: &Path,
        remote_path: &str,
    ) -> impl Future<Output = Result<TransferOutcome>> + Send;
}

/// Remote operations staging needs from the device.
pub trait RemoteHost: Send + Sync {
    /// Run a one-shot command.
    fn exec(&self, command: &str) -> impl Future<Output = Result<ExecOutput>> + Send;

    /// Write `payload` to `remote_path`.
    fn put(&self, payload: &[u8], remote_path: &str) -> impl Future<Output = Result<()>> + Send;
}
