//! Test doubles for the channel and staging seams.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use regex::bytes::Regex;

use crate::channel::{CommandChannel, PromptPatterns, Response};
use crate::error::{ChannelError, Result, TransferError};
use crate::transfer::{FileTransfer, RemoteHost, TransferOutcome, sha256_hex};
use crate::transport::ExecOutput;

const EXEC_PROMPT: &str = "edge1#";
const CONFIG_PROMPT: &str = "edge1(config)#";

/// A command channel that answers from a script and records what it sent.
///
/// Commands without a scripted answer return only the prompt. Mode
/// commands switch between the exec and config prompts like the device.
pub(crate) struct ScriptedChannel {
    responses: HashMap<String, VecDeque<String>>,
    sent: Vec<String>,
    prompts: PromptPatterns,
    prompt: String,
    fail_on: Option<String>,
}

impl ScriptedChannel {
    pub(crate) fn new() -> Self {
        Self {
            responses: HashMap::new(),
            sent: Vec::new(),
            prompts: PromptPatterns::derive("edge1").unwrap(),
            prompt: EXEC_PROMPT.to_string(),
            fail_on: None,
        }
    }

    /// Queue `output` as the next answer to `command`.
    pub(crate) fn respond(mut self, command: &str, output: &str) -> Self {
        self.responses
            .entry(command.to_string())
            .or_default()
            .push_back(output.to_string());
        self
    }

    /// Drop the connection when `command` is sent.
    pub(crate) fn fail_on(mut self, command: &str) -> Self {
        self.fail_on = Some(command.to_string());
        self
    }

    pub(crate) fn sent(&self) -> &[String] {
        &self.sent
    }

    pub(crate) fn in_config(&self) -> bool {
        self.prompt == CONFIG_PROMPT
    }

    fn change_mode(&mut self, command: &str, pattern: &Regex) -> Result<()> {
        if self.in_mode(pattern) {
            return Ok(());
        }
        self.sent.push(command.to_string());
        self.prompt = match command {
            "configure private" => CONFIG_PROMPT.to_string(),
            _ => EXEC_PROMPT.to_string(),
        };
        if !pattern.is_match(self.prompt.as_bytes()) {
            return Err(ChannelError::ModeNotEntered {
                command: command.to_string(),
                prompt: self.prompt.clone(),
            }
            .into());
        }
        Ok(())
    }
}

impl CommandChannel for ScriptedChannel {
    async fn send_command(&mut self, command: &str, _timeout: Duration) -> Result<Response> {
        self.sent.push(command.to_string());
        if self.fail_on.as_deref() == Some(command) {
            return Err(ChannelError::Closed.into());
        }

        let output = self
            .responses
            .get_mut(command)
            .and_then(VecDeque::pop_front)
            .unwrap_or_default();
        let raw = format!("{command}\n{output}\n{} ", self.prompt);
        Ok(Response::from_raw(
            command,
            raw,
            self.prompt.clone(),
            Duration::ZERO,
        ))
    }

    async fn enter_mode(&mut self, command: &str, pattern: &Regex) -> Result<()> {
        self.change_mode(command, pattern)
    }

    async fn exit_mode(&mut self, command: &str, pattern: &Regex) -> Result<()> {
        self.change_mode(command, pattern)
    }

    async fn is_alive(&mut self) -> bool {
        self.fail_on.is_none()
    }

    fn prompts(&self) -> &PromptPatterns {
        &self.prompts
    }

    fn current_prompt(&self) -> &str {
        &self.prompt
    }
}

/// Staging double that records local paths and keeps no remote state.
#[derive(Default)]
pub(crate) struct RecordingTransfer {
    staged: Vec<PathBuf>,
    fail: bool,
}

impl RecordingTransfer {
    /// Every stage call fails as if the device were out of space.
    pub(crate) fn failing() -> Self {
        Self {
            staged: Vec::new(),
            fail: true,
        }
    }

    pub(crate) fn staged_paths(&self) -> &[PathBuf] {
        &self.staged
    }
}

impl FileTransfer for RecordingTransfer {
    async fn stage(&mut self, local: &Path, remote_path: &str) -> Result<TransferOutcome> {
        self.staged.push(local.to_path_buf());
        let size = tokio::fs::metadata(local)
            .await
            .map_err(TransferError::Io)?
            .len();
        if self.fail {
            return Err(TransferError::InsufficientSpace {
                path: remote_path.to_string(),
                required: size,
                available: 0,
            }
            .into());
        }
        Ok(TransferOutcome::Transferred)
    }
}

/// In-memory device filesystem answering the checksum and `df` helpers.
pub(crate) struct FakeHost {
    files: Mutex<HashMap<String, Vec<u8>>>,
    puts: AtomicUsize,
    available: u64,
    corrupt: bool,
}

impl FakeHost {
    pub(crate) fn new() -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            puts: AtomicUsize::new(0),
            available: 1 << 30,
            corrupt: false,
        }
    }

    /// Report `bytes` of free space.
    pub(crate) fn with_available(mut self, bytes: u64) -> Self {
        self.available = bytes;
        self
    }

    /// Store every upload with a trailing byte appended.
    pub(crate) fn corrupting(mut self) -> Self {
        self.corrupt = true;
        self
    }

    pub(crate) fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub(crate) fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(path).cloned()
    }
}

fn exec_output(status: u32, stdout: String, stderr: &str) -> ExecOutput {
    ExecOutput {
        stdout: stdout.into_bytes(),
        stderr: stderr.as_bytes().to_vec(),
        exit_status: Some(status),
    }
}

impl RemoteHost for FakeHost {
    async fn exec(&self, command: &str) -> Result<ExecOutput> {
        if let Some(arg) = command.strip_prefix("sha256sum ") {
            let path = arg.trim_matches('\'');
            let digest = self.files.lock().unwrap().get(path).map(|d| sha256_hex(d));
            return Ok(match digest {
                Some(digest) => exec_output(0, format!("{digest}  {path}\n"), ""),
                None => exec_output(1, String::new(), "No such file or directory"),
            });
        }
        if command.starts_with("df -k ") {
            let stdout = format!(
                "Filesystem 1K-blocks Used Available Use% Mounted on\n/dev/sda1 4194304 0 {} 0% /\n",
                self.available / 1024
            );
            return Ok(exec_output(0, stdout, ""));
        }
        Ok(exec_output(127, String::new(), "command not found"))
    }

    async fn put(&self, payload: &[u8], remote_path: &str) -> Result<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        let mut data = payload.to_vec();
        if self.corrupt {
            data.push(b'x');
        }
        self.files
            .lock()
            .unwrap()
            .insert(remote_path.to_string(), data);
        Ok(())
    }
}
