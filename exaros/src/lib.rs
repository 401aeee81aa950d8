//! # Exaros
//!
//! Async configuration-transaction driver for ExaROS network devices.
//!
//! Exaros drives the device CLI over SSH and treats every configuration
//! change as a transaction: the candidate is staged on the device with a
//! checksum-verified copy, loaded into a private configuration session,
//! optionally validated and compared, then committed or discarded.
//!
//! ## Features
//!
//! - Async SSH connections via russh
//! - Prompt-driven PTY channel with mode patterns derived from the base prompt
//! - Candidate staging that skips the copy when the remote checksum matches
//! - Merge and replace transactions with explicit state and typed errors
//! - Diff normalization that is stable across runs
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use exaros::{CandidateSource, CommitOptions, Driver, DriverBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), exaros::Error> {
//!     let mut driver = DriverBuilder::new("192.168.1.1")
//!         .username("admin")
//!         .password("secret")
//!         .build()?;
//!
//!     driver.open().await?;
//!
//!     driver
//!         .load_replace(CandidateSource::file("edge1.conf"))
//!         .await?;
//!     let diff = driver.compare().await?;
//!     if diff.is_noop() {
//!         driver.discard().await?;
//!     } else {
//!         println!("{}", diff.canonical());
//!         driver.commit(&CommitOptions::new().label("nightly")).await?;
//!     }
//!
//!     driver.close().await?;
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod driver;
pub mod error;
pub mod transfer;
pub mod transport;

// Re-export main types for convenience
pub use channel::Response;
pub use driver::{
    CandidateSource, CommitOptions, ConfigScope, DeviceConfig, DiffOutcome, DiffResult, Driver,
    DriverBuilder, DriverOptions, ExarosDriver, OperationKind, TransactionState,
};
pub use error::Error;
pub use transport::{AuthMethod, HostKeyVerification, SshConfig};
