//! Command channel: the prompt-driven, half-duplex CLI session.
//!
//! [`CommandChannel`] is the capability interface the transaction manager
//! drives. [`PtyChannel`] implements it over an SSH PTY; tests substitute
//! a scripted double.

mod buffer;
mod patterns;
mod pty;
mod response;

use std::future::Future;
use std::time::Duration;

use regex::bytes::Regex;

pub use buffer::{PatternBuffer, last_line};
pub use patterns::{
    PROMPT_PREFIX_LEN, PromptPatterns, base_prompt_from, initial_prompt_pattern, prompt_prefix,
};
pub use pty::{PtyChannel, PtyConfig};
pub use response::{Response, normalize_output};

use crate::error::Result;

/// A prompt-driven command channel to one device.
///
/// Every call takes `&mut self`: one command is in flight at a time and
/// each call completes only when the device prompt returns or the timeout
/// elapses. Connection-class failures are returned as errors and are not
/// recoverable on the same channel.
pub trait CommandChannel: Send {
    /// Send a command and wait for the device prompt.
    fn send_command(
        &mut self,
        command: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<Response>> + Send;

    /// Send a mode-changing command and require `pattern` on the resulting
    /// prompt. A no-op if the current prompt already matches.
    fn enter_mode(
        &mut self,
        command: &str,
        pattern: &Regex,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Leave a mode; same contract as [`enter_mode`](Self::enter_mode) with
    /// `pattern` describing the mode being returned to.
    fn exit_mode(
        &mut self,
        command: &str,
        pattern: &Regex,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Probe the session with a zero-effect byte.
    fn is_alive(&mut self) -> impl Future<Output = bool> + Send;

    /// Prompt patterns derived for this session.
    fn prompts(&self) -> &PromptPatterns;

    /// The most recently observed prompt.
    fn current_prompt(&self) -> &str;

    /// Whether the current prompt matches `pattern`.
    fn in_mode(&self, pattern: &Regex) -> bool {
        pattern.is_match(self.current_prompt().as_bytes())
    }
}
