//! The configuration transaction state machine.
//!
//! One [`TransactionManager`] owns the command channel and the staging
//! transfer of a session and sequences
//! `stage → load → [validate] → [compare] → commit | discard`:
//!
//! ```text
//! Idle ──load──▶ Staged ──validate──▶ Validated ──commit──▶ Committed
//!                  │                      │
//!                  └───────discard────────┴──▶ Idle
//!   Staged(merge) ──commit check rejected──▶ Aborted
//!   Staged(merge) ──commit "Invalid input"──▶ Aborted
//! ```
//!
//! Replace transactions skip `commit check`: `validate()` marks them
//! validated without a device round-trip. `Committed` and `Aborted` are
//! resolved states and a new `load` may start from them.

use std::fmt;
use std::time::Duration;

use log::{debug, info, warn};

use super::candidate::{CandidateConfig, CandidateSource, LocalPayload};
use super::diff::DiffResult;
use super::markers::{CommandClass, Outcome, classify};
use crate::channel::{CommandChannel, Response};
use crate::error::{Result, TransactionError};
use crate::transfer::FileTransfer;

// =============================================================================
// Device commands
// =============================================================================

const CONFIGURE: &str = "configure private";
const ABORT: &str = "abort";
const COMMIT_CHECK: &str = "commit check";
const COMMIT: &str = "commit";
const REPLACE_DIFF: &str = "show candidate diff all";
const MERGE_DIFF: &str = "show candidate diff commands";
const ROLLBACK: &str = "rollback configuration 0";
const SHOW_RUNNING: &str = "show configuration running all";
const SHOW_CANDIDATE: &str = "show candidate all";

// =============================================================================
// Types
// =============================================================================

/// How a candidate is applied to the running configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Add to the running configuration.
    Merge,
    /// Replace the running configuration wholesale.
    Replace,
}

impl OperationKind {
    /// Keyword used in `load <kind> <file>`.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Merge => "merge",
            OperationKind::Replace => "replace",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle position of the session's transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransactionState {
    /// No transaction in flight.
    #[default]
    Idle,
    /// Candidate loaded into the private session.
    Staged,
    /// Candidate passed `commit check` (or is a replace).
    Validated,
    /// The last transaction was committed.
    Committed,
    /// The last transaction was rejected and discarded.
    Aborted,
}

impl TransactionState {
    /// Whether a candidate is loaded and awaiting commit or discard.
    pub fn in_flight(&self) -> bool {
        matches!(self, TransactionState::Staged | TransactionState::Validated)
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransactionState::Idle => "idle",
            TransactionState::Staged => "staged",
            TransactionState::Validated => "validated",
            TransactionState::Committed => "committed",
            TransactionState::Aborted => "aborted",
        })
    }
}

/// Optional annotations for a commit.
///
/// Double quotes cannot be escaped in the device CLI and are rejected
/// before anything is sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitOptions {
    /// `comment "<text>"`
    pub comment: Option<String>,
    /// `label "<text>"`
    pub label: Option<String>,
}

impl CommitOptions {
    /// No comment or label.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the commit comment.
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Set the commit label.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Render the `commit` command line.
    pub fn command(&self) -> Result<String> {
        let mut command = String::from(COMMIT);
        for (keyword, value) in [("comment", &self.comment), ("label", &self.label)] {
            let Some(value) = value.as_deref().filter(|v| !v.is_empty()) else {
                continue;
            };
            if value.contains('"') {
                return Err(TransactionError::Commit {
                    message: format!("{keyword} contains a double quote"),
                    output: String::new(),
                }
                .into());
            }
            command.push_str(&format!(" {keyword} \"{value}\""));
        }
        Ok(command)
    }
}

/// Which configurations [`TransactionManager::get_config`] retrieves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigScope {
    /// The running configuration.
    Running,
    /// The private candidate.
    Candidate,
    /// Always empty: the device has no separate startup configuration.
    Startup,
    /// Running and candidate.
    #[default]
    All,
}

/// Device configurations; fields outside the requested scope are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceConfig {
    pub running: String,
    pub candidate: String,
    pub startup: String,
}

#[derive(Debug)]
struct Transaction {
    kind: OperationKind,
    state: TransactionState,
    candidate: String,
}

// =============================================================================
// TransactionManager
// =============================================================================

/// Sequences configuration transactions on one session.
///
/// At most one transaction exists per manager; `&mut self` on every
/// operation keeps calls strictly sequential.
pub struct TransactionManager<C, T> {
    channel: C,
    transfer: T,
    candidate: CandidateConfig,
    timeout: Duration,
    transaction: Option<Transaction>,
}

impl<C: CommandChannel, T: FileTransfer> TransactionManager<C, T> {
    /// Create a manager staging to `candidate`, with `timeout` per command.
    pub fn new(channel: C, transfer: T, candidate: CandidateConfig, timeout: Duration) -> Self {
        Self {
            channel,
            transfer,
            candidate,
            timeout,
            transaction: None,
        }
    }

    /// Current transaction state.
    pub fn state(&self) -> TransactionState {
        self.transaction
            .as_ref()
            .map_or(TransactionState::Idle, |t| t.state)
    }

    /// Kind of the current or last transaction.
    pub fn operation(&self) -> Option<OperationKind> {
        self.transaction.as_ref().map(|t| t.kind)
    }

    /// Staging location of the candidate.
    pub fn candidate(&self) -> &CandidateConfig {
        &self.candidate
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// Stage `source`, enter the private configuration session and load it.
    ///
    /// The local artifact is cleaned up on every outcome. On a rejected
    /// load the session is exited and no transaction is recorded.
    pub async fn load(&mut self, kind: OperationKind, source: CandidateSource) -> Result<Response> {
        let state = self.state();
        if state.in_flight() {
            return Err(TransactionError::InvalidState {
                operation: "load",
                state,
            }
            .into());
        }
        self.transaction = None;

        let payload = LocalPayload::materialize(&source).await?;
        let staged = self
            .transfer
            .stage(payload.path(), &self.candidate.remote_path)
            .await;
        let candidate = payload.release();
        let outcome = staged?;
        debug!("candidate {}: {:?}", self.candidate.remote_path, outcome);

        self.enter_config().await?;
        let command = format!("load {} {}", kind, self.candidate.remote_path);
        let response = self.send(&command).await?;

        if classify(CommandClass::Load, &response.result) != Outcome::Success {
            warn!("load {} rejected", kind);
            self.exit_config().await?;
            return Err(TransactionError::CandidateLoad {
                output: response.raw_result,
            }
            .into());
        }

        info!("{} candidate loaded", kind);
        self.transaction = Some(Transaction {
            kind,
            state: TransactionState::Staged,
            candidate,
        });
        Ok(response)
    }

    /// Run `commit check` on a staged merge.
    ///
    /// Replace transactions are marked validated without a device
    /// round-trip. A rejected check discards the candidate and leaves the
    /// transaction aborted.
    pub async fn validate(&mut self) -> Result<()> {
        let (kind, state) = self.current("validate")?;
        if state == TransactionState::Validated {
            return Ok(());
        }

        if kind == OperationKind::Merge {
            let response = self.send(COMMIT_CHECK).await?;
            if classify(CommandClass::CommitCheck, &response.result) != Outcome::Success {
                warn!("commit check rejected the merge candidate");
                self.set_state(TransactionState::Aborted);
                self.exit_config().await?;
                return Err(TransactionError::Validation {
                    output: response.raw_result,
                }
                .into());
            }
        }

        self.set_state(TransactionState::Validated);
        Ok(())
    }

    /// Show the normalized difference between candidate and running.
    ///
    /// If the device rejects the merge diff command, the full candidate is
    /// returned as additions instead.
    pub async fn compare(&mut self) -> Result<DiffResult> {
        let (kind, _) = self.current("compare")?;
        let command = match kind {
            OperationKind::Replace => REPLACE_DIFF,
            OperationKind::Merge => MERGE_DIFF,
        };
        let response = self.send(command).await?;

        if kind == OperationKind::Merge
            && classify(CommandClass::Compare, &response.result) == Outcome::InvalidInput
        {
            debug!("incremental diff unavailable, falling back to full candidate");
            let candidate = self
                .transaction
                .as_ref()
                .map(|t| t.candidate.as_str())
                .unwrap_or_default();
            return Ok(DiffResult::fallback(response.result, candidate));
        }

        Ok(DiffResult::from_raw(response.result, kind))
    }

    /// Commit the staged candidate.
    ///
    /// A staged merge is validated first. A commit the device rejects as
    /// invalid input on a merge discards the candidate; any other refusal
    /// leaves the transaction in place for the caller to discard.
    pub async fn commit(&mut self, options: &CommitOptions) -> Result<Response> {
        let (kind, state) = self.current("commit")?;
        let command = options.command()?;

        if kind == OperationKind::Merge && state == TransactionState::Staged {
            self.validate().await?;
        }

        let response = self.send(&command).await?;
        match classify(CommandClass::Commit, &response.result) {
            Outcome::Success | Outcome::NoChanges => {
                info!("{} committed", kind);
                self.set_state(TransactionState::Committed);
                self.exit_config().await?;
                Ok(response)
            }
            Outcome::InvalidInput if kind == OperationKind::Merge => {
                warn!("device rejected merge as invalid input, discarding");
                self.set_state(TransactionState::Aborted);
                self.exit_config().await?;
                Err(TransactionError::MergeConfig {
                    output: response.raw_result,
                }
                .into())
            }
            _ => Err(TransactionError::Commit {
                message: "device did not confirm the commit".to_string(),
                output: response.raw_result,
            }
            .into()),
        }
    }

    /// Drop the candidate and leave the configuration session.
    pub async fn discard(&mut self) -> Result<()> {
        self.current("discard")?;
        self.exit_config().await?;
        self.transaction = None;
        info!("candidate discarded");
        Ok(())
    }

    /// Restore the previous committed configuration and commit it.
    pub async fn rollback(&mut self) -> Result<Response> {
        let state = self.state();
        if state.in_flight() {
            return Err(TransactionError::InvalidState {
                operation: "rollback",
                state,
            }
            .into());
        }
        self.transaction = None;

        self.enter_config().await?;
        let response = self.send(ROLLBACK).await?;
        if classify(CommandClass::Rollback, &response.result) != Outcome::Success {
            self.exit_config().await?;
            return Err(TransactionError::Commit {
                message: "rollback was rejected".to_string(),
                output: response.raw_result,
            }
            .into());
        }

        let response = self.send(COMMIT).await?;
        let outcome = classify(CommandClass::Commit, &response.result);
        self.exit_config().await?;
        match outcome {
            Outcome::Success | Outcome::NoChanges => {
                info!("rolled back to the previous configuration");
                Ok(response)
            }
            _ => Err(TransactionError::Commit {
                message: "rollback commit was not confirmed".to_string(),
                output: response.raw_result,
            }
            .into()),
        }
    }

    /// Retrieve device configuration text.
    ///
    /// The configuration session is left again only if this call entered
    /// it, so an in-flight candidate is undisturbed.
    pub async fn get_config(&mut self, scope: ConfigScope) -> Result<DeviceConfig> {
        let mut config = DeviceConfig::default();
        if scope == ConfigScope::Startup {
            return Ok(config);
        }

        let entered = !self.channel.in_mode(&self.channel.prompts().config);
        self.enter_config().await?;

        if matches!(scope, ConfigScope::Running | ConfigScope::All) {
            config.running = self.send(SHOW_RUNNING).await?.result;
        }
        if matches!(scope, ConfigScope::Candidate | ConfigScope::All) {
            config.candidate = self.send(SHOW_CANDIDATE).await?.result;
        }

        if entered {
            self.exit_config().await?;
        }
        Ok(config)
    }

    /// Abandon any in-flight transaction before the session closes.
    pub async fn shutdown(&mut self) -> Result<()> {
        if self.state().in_flight() {
            debug!("discarding in-flight candidate before close");
            self.exit_config().await?;
            self.transaction = None;
        }
        Ok(())
    }

    fn current(&self, operation: &'static str) -> Result<(OperationKind, TransactionState)> {
        match &self.transaction {
            Some(t) if t.state.in_flight() => Ok((t.kind, t.state)),
            _ => Err(TransactionError::InvalidState {
                operation,
                state: self.state(),
            }
            .into()),
        }
    }

    fn set_state(&mut self, state: TransactionState) {
        if let Some(t) = self.transaction.as_mut() {
            debug!("transaction {} -> {}", t.state, state);
            t.state = state;
        }
    }

    async fn send(&mut self, command: &str) -> Result<Response> {
        self.channel.send_command(command, self.timeout).await
    }

    async fn enter_config(&mut self) -> Result<()> {
        let pattern = self.channel.prompts().config.clone();
        self.channel.enter_mode(CONFIGURE, &pattern).await
    }

    async fn exit_config(&mut self) -> Result<()> {
        let pattern = self.channel.prompts().exec.clone();
        self.channel.exit_mode(ABORT, &pattern).await
    }
}

impl<C, T> Drop for TransactionManager<C, T> {
    fn drop(&mut self) {
        if let Some(t) = &self.transaction {
            if t.state.in_flight() {
                warn!(
                    "TransactionManager dropped with a {} {} candidate; the device discards it when the session ends",
                    t.state, t.kind
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::driver::testing::{FakeHost, RecordingTransfer, ScriptedChannel};
    use crate::error::Error;
    use crate::transfer::{ScpTransfer, TransferConfig};

    const LOADED: &str = "Loading.\nOperation completed successfully.";
    const COMMITTED: &str = "Commit complete.";
    const CONFIG: &str = "hostname edge1\ninterface eth0\n description uplink\n";

    type Manager = TransactionManager<ScriptedChannel, RecordingTransfer>;

    fn manager(channel: ScriptedChannel) -> Manager {
        TransactionManager::new(
            channel,
            RecordingTransfer::default(),
            CandidateConfig::default(),
            Duration::from_secs(5),
        )
    }

    async fn loaded(channel: ScriptedChannel, kind: OperationKind) -> Manager {
        let mut manager = manager(channel.respond(&format!("load {kind} candidate.conf"), LOADED));
        manager.load(kind, CandidateSource::text(CONFIG)).await.unwrap();
        manager
    }

    #[tokio::test]
    async fn test_replace_lifecycle() {
        let mut manager = loaded(
            ScriptedChannel::new().respond("commit", COMMITTED),
            OperationKind::Replace,
        )
        .await;
        assert_eq!(manager.state(), TransactionState::Staged);
        assert!(manager.channel().in_config());

        manager.validate().await.unwrap();
        assert_eq!(manager.state(), TransactionState::Validated);

        manager.commit(&CommitOptions::new()).await.unwrap();
        assert_eq!(manager.state(), TransactionState::Committed);
        assert!(!manager.channel().in_config());
        assert_eq!(
            manager.channel().sent(),
            ["configure private", "load replace candidate.conf", "commit", "abort"]
        );
    }

    #[tokio::test]
    async fn test_merge_commit_runs_commit_check_first() {
        let mut manager = loaded(
            ScriptedChannel::new()
                .respond("commit check", "Validation complete")
                .respond("commit comment \"nightly\"", COMMITTED),
            OperationKind::Merge,
        )
        .await;

        manager
            .commit(&CommitOptions::new().comment("nightly"))
            .await
            .unwrap();
        assert_eq!(manager.state(), TransactionState::Committed);
        assert_eq!(
            manager.channel().sent(),
            [
                "configure private",
                "load merge candidate.conf",
                "commit check",
                "commit comment \"nightly\"",
                "abort"
            ]
        );
    }

    #[tokio::test]
    async fn test_validation_failure_aborts() {
        let mut manager = loaded(
            ScriptedChannel::new().respond("commit check", "Aborted: 'ntp server' is incomplete"),
            OperationKind::Merge,
        )
        .await;

        let err = manager.validate().await.unwrap_err();
        assert!(matches!(
            err,
            Error::Transaction(TransactionError::Validation { .. })
        ));
        assert!(err.device_output().unwrap().contains("'ntp server' is incomplete"));
        assert_eq!(manager.state(), TransactionState::Aborted);
        assert!(!manager.channel().in_config());
    }

    #[tokio::test]
    async fn test_commit_from_idle_sends_nothing() {
        let mut manager = manager(ScriptedChannel::new());
        let err = manager.commit(&CommitOptions::new()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Transaction(TransactionError::InvalidState {
                operation: "commit",
                state: TransactionState::Idle
            })
        ));
        assert!(manager.channel().sent().is_empty());
    }

    #[tokio::test]
    async fn test_operations_require_a_transaction() {
        let mut manager = manager(ScriptedChannel::new());
        assert!(manager.validate().await.is_err());
        assert!(manager.compare().await.is_err());
        assert!(manager.discard().await.is_err());
        assert!(manager.channel().sent().is_empty());
    }

    #[tokio::test]
    async fn test_load_while_in_flight_is_rejected() {
        let mut manager = loaded(ScriptedChannel::new(), OperationKind::Merge).await;
        let err = manager
            .load(OperationKind::Replace, CandidateSource::text(CONFIG))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Transaction(TransactionError::InvalidState {
                operation: "load",
                state: TransactionState::Staged
            })
        ));
        assert_eq!(manager.operation(), Some(OperationKind::Merge));
    }

    #[tokio::test]
    async fn test_merge_invalid_input_discards() {
        let rejected = "commit\n------^\n% Invalid input detected at '^' marker.";
        let mut manager = loaded(
            ScriptedChannel::new()
                .respond("commit check", "Validation complete")
                .respond("commit", rejected),
            OperationKind::Merge,
        )
        .await;

        let err = manager.commit(&CommitOptions::new()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Transaction(TransactionError::MergeConfig { .. })
        ));
        assert!(err.device_output().unwrap().contains("Invalid input detected"));
        assert_eq!(manager.state(), TransactionState::Aborted);
        assert_eq!(manager.channel().sent().last().map(String::as_str), Some("abort"));
    }

    #[tokio::test]
    async fn test_refused_commit_keeps_transaction() {
        let mut manager = loaded(
            ScriptedChannel::new().respond("commit", "Aborted: the configuration database is locked"),
            OperationKind::Replace,
        )
        .await;

        let err = manager.commit(&CommitOptions::new()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Transaction(TransactionError::Commit { .. })
        ));
        assert_eq!(manager.state(), TransactionState::Staged);
        assert!(manager.channel().in_config());

        manager.discard().await.unwrap();
        assert_eq!(manager.state(), TransactionState::Idle);
        assert!(!manager.channel().in_config());
    }

    #[tokio::test]
    async fn test_marker_text_in_comment_is_not_a_confirmation() {
        for marker in ["Commit complete.", "No modifications to commit."] {
            let options = CommitOptions::new().comment(marker).label(marker);
            let command = options.command().unwrap();
            let mut manager = loaded(
                ScriptedChannel::new()
                    .respond(&command, "Aborted: the configuration database is locked"),
                OperationKind::Replace,
            )
            .await;

            let err = manager.commit(&options).await.unwrap_err();
            assert!(
                matches!(err, Error::Transaction(TransactionError::Commit { .. })),
                "{marker}: {err:?}"
            );
            assert!(err.device_output().unwrap().contains(marker));
            assert_eq!(manager.state(), TransactionState::Staged);
            assert!(manager.channel().in_config());
        }
    }

    #[tokio::test]
    async fn test_invalid_input_text_in_comment_does_not_discard_merge() {
        let options = CommitOptions::new().comment("Invalid input detected");
        let command = options.command().unwrap();
        let mut manager = loaded(
            ScriptedChannel::new()
                .respond("commit check", "Validation complete")
                .respond(&command, "Aborted: the configuration database is locked"),
            OperationKind::Merge,
        )
        .await;

        let err = manager.commit(&options).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Transaction(TransactionError::Commit { .. })
        ));
        assert_eq!(manager.state(), TransactionState::Validated);
        assert!(manager.channel().in_config());
    }

    #[tokio::test]
    async fn test_quote_in_comment_is_rejected_before_sending() {
        let mut manager = loaded(ScriptedChannel::new(), OperationKind::Replace).await;
        let sent = manager.channel().sent().len();

        let err = manager
            .commit(&CommitOptions::new().comment("say \"hi\""))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Transaction(TransactionError::Commit { .. })
        ));
        assert_eq!(manager.channel().sent().len(), sent);
        assert_eq!(manager.state(), TransactionState::Staged);
    }

    #[test]
    fn test_commit_command() {
        assert_eq!(CommitOptions::new().command().unwrap(), "commit");
        assert_eq!(
            CommitOptions::new()
                .comment("change 42")
                .label("nightly")
                .command()
                .unwrap(),
            "commit comment \"change 42\" label \"nightly\""
        );
        assert_eq!(CommitOptions::new().comment("").command().unwrap(), "commit");
        assert!(CommitOptions::new().label("a\"b").command().is_err());
    }

    #[tokio::test]
    async fn test_rejected_load_returns_to_idle() {
        let mut manager = manager(
            ScriptedChannel::new()
                .respond("load merge candidate.conf", "Error: on line 2: syntax error"),
        );

        let err = manager
            .load(OperationKind::Merge, CandidateSource::text(CONFIG))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Transaction(TransactionError::CandidateLoad { .. })
        ));
        assert_eq!(manager.state(), TransactionState::Idle);
        assert!(!manager.channel().in_config());
    }

    #[tokio::test]
    async fn test_temporary_candidate_is_removed_on_every_outcome() {
        // Success
        let manager = loaded(ScriptedChannel::new(), OperationKind::Replace).await;
        let staged = manager.transfer.staged_paths();
        assert_eq!(staged.len(), 1);
        assert!(!staged[0].exists());

        // Rejected load
        let mut manager = manager_rejecting_load();
        let _ = manager
            .load(OperationKind::Merge, CandidateSource::text(CONFIG))
            .await;
        assert!(!manager.transfer.staged_paths()[0].exists());

        // Failed transfer
        let mut manager = TransactionManager::new(
            ScriptedChannel::new(),
            RecordingTransfer::failing(),
            CandidateConfig::default(),
            Duration::from_secs(5),
        );
        let err = manager
            .load(OperationKind::Merge, CandidateSource::text(CONFIG))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transfer(_)));
        assert!(!manager.transfer.staged_paths()[0].exists());
        assert!(manager.channel().sent().is_empty());
        assert_eq!(manager.state(), TransactionState::Idle);
    }

    fn manager_rejecting_load() -> Manager {
        manager(ScriptedChannel::new().respond("load merge candidate.conf", "Error: syntax error"))
    }

    #[tokio::test]
    async fn test_load_names_staged_path() {
        let host = Arc::new(FakeHost::new());
        let mut manager = TransactionManager::new(
            ScriptedChannel::new().respond("load merge /config/candidate.conf", LOADED),
            ScpTransfer::new(host.clone(), TransferConfig::default()),
            CandidateConfig::new("candidate.conf", Some("/config")),
            Duration::from_secs(5),
        );

        manager
            .load(OperationKind::Merge, CandidateSource::text(CONFIG))
            .await
            .unwrap();
        assert_eq!(manager.state(), TransactionState::Staged);
        assert_eq!(
            manager.channel().sent(),
            ["configure private", "load merge /config/candidate.conf"]
        );
        assert_eq!(
            host.file("/config/candidate.conf").as_deref(),
            Some(CONFIG.as_bytes())
        );
        assert!(host.file("candidate.conf").is_none());
    }

    #[tokio::test]
    async fn test_same_candidate_is_transferred_once() {
        let host = Arc::new(FakeHost::new());
        let mut manager = TransactionManager::new(
            ScriptedChannel::new()
                .respond("load merge candidate.conf", LOADED)
                .respond("load merge candidate.conf", LOADED),
            ScpTransfer::new(host.clone(), TransferConfig::default()),
            CandidateConfig::default(),
            Duration::from_secs(5),
        );

        manager
            .load(OperationKind::Merge, CandidateSource::text(CONFIG))
            .await
            .unwrap();
        manager.discard().await.unwrap();
        manager
            .load(OperationKind::Merge, CandidateSource::text(CONFIG))
            .await
            .unwrap();

        assert_eq!(host.puts(), 1);
        assert_eq!(manager.state(), TransactionState::Staged);
    }

    #[tokio::test]
    async fn test_compare_no_changes_is_empty() {
        let mut manager = loaded(
            ScriptedChannel::new()
                .respond("show candidate diff commands", "% No configuration changes found."),
            OperationKind::Merge,
        )
        .await;

        let diff = manager.compare().await.unwrap();
        assert!(diff.is_noop());
        assert_eq!(diff.canonical(), "");
        assert_eq!(manager.state(), TransactionState::Staged);
    }

    #[tokio::test]
    async fn test_compare_merge_reorder_is_a_change() {
        let mut manager = loaded(
            ScriptedChannel::new().respond(
                "show candidate diff commands",
                "% Warning: order-dependent lines reordered\n% No configuration changes found.",
            ),
            OperationKind::Merge,
        )
        .await;

        let diff = manager.compare().await.unwrap();
        assert!(!diff.is_noop());
        assert!(
            diff.canonical()
                .contains(crate::driver::markers::REORDER_MARKER)
        );
    }

    #[tokio::test]
    async fn test_compare_replace_uses_full_diff() {
        let mut manager = loaded(
            ScriptedChannel::new()
                .respond("show candidate diff all", " interface eth0\n+  description uplink"),
            OperationKind::Replace,
        )
        .await;

        let diff = manager.compare().await.unwrap();
        assert_eq!(diff.canonical(), " interface eth0\n+  description uplink");
    }

    #[tokio::test]
    async fn test_compare_falls_back_to_full_candidate() {
        let mut manager = loaded(
            ScriptedChannel::new().respond(
                "show candidate diff commands",
                "------^\nsyntax error: unknown argument",
            ),
            OperationKind::Merge,
        )
        .await;

        let diff = manager.compare().await.unwrap();
        assert!(diff.canonical().starts_with(crate::driver::diff::FALLBACK_NOTE));
        assert!(diff.canonical().contains("+ hostname edge1"));
        assert!(diff.canonical().contains("+  description uplink"));
    }

    #[tokio::test]
    async fn test_reload_after_commit() {
        let mut manager = loaded(
            ScriptedChannel::new()
                .respond("commit", COMMITTED)
                .respond("load replace candidate.conf", LOADED),
            OperationKind::Replace,
        )
        .await;
        manager.commit(&CommitOptions::new()).await.unwrap();

        manager
            .load(OperationKind::Replace, CandidateSource::text(CONFIG))
            .await
            .unwrap();
        assert_eq!(manager.state(), TransactionState::Staged);
    }

    #[tokio::test]
    async fn test_rollback() {
        let mut manager = manager(ScriptedChannel::new().respond("commit", COMMITTED));
        manager.rollback().await.unwrap();
        assert_eq!(
            manager.channel().sent(),
            ["configure private", "rollback configuration 0", "commit", "abort"]
        );
        assert_eq!(manager.state(), TransactionState::Idle);
    }

    #[tokio::test]
    async fn test_rollback_rejected() {
        let mut manager = manager(
            ScriptedChannel::new().respond("rollback configuration 0", "Error: rollback file 0 not found"),
        );
        let err = manager.rollback().await.unwrap_err();
        assert!(err.device_output().unwrap().contains("rollback file 0 not found"));
        assert!(!manager.channel().sent().contains(&"commit".to_string()));
        assert!(!manager.channel().in_config());
    }

    #[tokio::test]
    async fn test_rollback_refused_while_in_flight() {
        let mut manager = loaded(ScriptedChannel::new(), OperationKind::Merge).await;
        assert!(matches!(
            manager.rollback().await.unwrap_err(),
            Error::Transaction(TransactionError::InvalidState { operation: "rollback", .. })
        ));
    }

    #[tokio::test]
    async fn test_get_config() {
        let mut manager = manager(
            ScriptedChannel::new()
                .respond("show configuration running all", "hostname edge1")
                .respond("show candidate all", "hostname edge1"),
        );

        let config = manager.get_config(ConfigScope::All).await.unwrap();
        assert_eq!(config.running, "hostname edge1");
        assert_eq!(config.candidate, "hostname edge1");
        assert_eq!(config.startup, "");
        assert!(!manager.channel().in_config());

        let sent = manager.channel().sent().len();
        let config = manager.get_config(ConfigScope::Startup).await.unwrap();
        assert_eq!(config, DeviceConfig::default());
        assert_eq!(manager.channel().sent().len(), sent);
    }

    #[tokio::test]
    async fn test_get_config_keeps_in_flight_session() {
        let mut manager = loaded(
            ScriptedChannel::new().respond("show candidate all", "hostname edge2"),
            OperationKind::Merge,
        )
        .await;

        let config = manager.get_config(ConfigScope::Candidate).await.unwrap();
        assert_eq!(config.candidate, "hostname edge2");
        assert_eq!(config.running, "");
        assert!(manager.channel().in_config());
        assert_eq!(manager.state(), TransactionState::Staged);
    }

    #[tokio::test]
    async fn test_shutdown_discards_in_flight() {
        let mut manager = loaded(ScriptedChannel::new(), OperationKind::Merge).await;
        manager.shutdown().await.unwrap();
        assert_eq!(manager.state(), TransactionState::Idle);
        assert_eq!(manager.channel().sent().last().map(String::as_str), Some("abort"));
    }

    #[tokio::test]
    async fn test_connection_loss_is_surfaced() {
        let mut manager = loaded(
            ScriptedChannel::new().fail_on("commit"),
            OperationKind::Replace,
        )
        .await;
        let err = manager.commit(&CommitOptions::new()).await.unwrap_err();
        assert!(err.is_connection_error());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(TransactionState::Validated.to_string(), "validated");
        assert!(TransactionState::Staged.in_flight());
        assert!(!TransactionState::Committed.in_flight());
        assert_eq!(OperationKind::Replace.to_string(), "replace");
    }
}
