//! PTY command channel over an SSH shell session.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, trace};
use regex::bytes::Regex;
use russh::client::Msg;
use russh::{Channel, ChannelMsg};

use super::CommandChannel;
use super::buffer::{PatternBuffer, last_line};
use super::patterns::{PromptPatterns, base_prompt_from, initial_prompt_pattern};
use super::response::Response;
use crate::error::{ChannelError, Result};
use crate::transport::SshTransport;

/// Configuration for PTY channel behavior.
#[derive(Debug, Clone)]
pub struct PtyConfig {
    /// Timeout for session preparation and mode changes.
    pub timeout: Duration,

    /// Search depth for prompt matching.
    pub search_depth: usize,

    /// Commands sent once the prompt is known (paging, width).
    pub on_open_commands: Vec<String>,
}

impl Default for PtyConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            search_depth: 1000,
            on_open_commands: vec![
                "session paginate disable".to_string(),
                "terminal width 511".to_string(),
            ],
        }
    }
}

/// Interactive CLI session on a PTY channel.
pub struct PtyChannel {
    channel: Channel<Msg>,
    transport: Arc<SshTransport>,
    config: PtyConfig,
    buffer: PatternBuffer,
    prompts: PromptPatterns,
    current_prompt: String,
}

impl PtyChannel {
    /// Open the shell, learn the base prompt and prepare the session.
    pub async fn open(transport: Arc<SshTransport>, config: PtyConfig) -> Result<Self> {
        let mut channel = transport.open_shell().await?;
        let mut buffer = PatternBuffer::new(config.search_depth);

        write_line(&mut channel, "").await?;
        let data = read_until_pattern(
            &mut channel,
            &mut buffer,
            &initial_prompt_pattern(),
            config.timeout,
        )
        .await?;

        let output = String::from_utf8_lossy(&data);
        let base_prompt = base_prompt_from(&output).ok_or(ChannelError::PromptNotFound)?;
        let prompts = PromptPatterns::derive(&base_prompt).map_err(ChannelError::from)?;
        debug!("base prompt '{}'", base_prompt);

        let mut pty = Self {
            channel,
            transport,
            current_prompt: last_line(&data),
            config,
            buffer,
            prompts,
        };

        for command in pty.config.on_open_commands.clone() {
            let timeout = pty.config.timeout;
            pty.send_command(&command, timeout).await?;
        }

        Ok(pty)
    }

    /// Get the configuration.
    pub fn config(&self) -> &PtyConfig {
        &self.config
    }

    /// Close the shell channel.
    pub async fn close(self) -> Result<()> {
        self.channel.close().await.map_err(ChannelError::Ssh)?;
        Ok(())
    }

    async fn change_mode(&mut self, command: &str, pattern: &Regex) -> Result<()> {
        if self.in_mode(pattern) {
            return Ok(());
        }

        debug!("mode change: {}", command);
        self.buffer.clear();
        write_line(&mut self.channel, command).await?;
        let data = read_until_pattern(
            &mut self.channel,
            &mut self.buffer,
            &self.prompts.any,
            self.config.timeout,
        )
        .await?;
        self.current_prompt = last_line(&data);

        if !pattern.is_match(self.current_prompt.as_bytes()) {
            return Err(ChannelError::ModeNotEntered {
                command: command.to_string(),
                prompt: self.current_prompt.clone(),
            }
            .into());
        }
        Ok(())
    }
}

impl CommandChannel for PtyChannel {
    async fn send_command(&mut self, command: &str, timeout: Duration) -> Result<Response> {
        let start = Instant::now();

        self.buffer.clear();
        write_line(&mut self.channel, command).await?;
        let data = read_until_pattern(
            &mut self.channel,
            &mut self.buffer,
            &self.prompts.any,
            timeout,
        )
        .await?;

        self.current_prompt = last_line(&data);
        let raw = String::from_utf8_lossy(&data).into_owned();
        Ok(Response::from_raw(
            command,
            raw,
            self.current_prompt.clone(),
            start.elapsed(),
        ))
    }

    async fn enter_mode(&mut self, command: &str, pattern: &Regex) -> Result<()> {
        self.change_mode(command, pattern).await
    }

    async fn exit_mode(&mut self, command: &str, pattern: &Regex) -> Result<()> {
        self.change_mode(command, pattern).await
    }

    async fn is_alive(&mut self) -> bool {
        if self.transport.is_closed() {
            return false;
        }
        self.channel.data(&[0u8][..]).await.is_ok()
    }

    fn prompts(&self) -> &PromptPatterns {
        &self.prompts
    }

    fn current_prompt(&self) -> &str {
        &self.current_prompt
    }
}

async fn write_line(channel: &mut Channel<Msg>, line: &str) -> Result<()> {
    trace!("send: {:?}", line);
    let payload = format!("{line}\n");
    channel
        .data(payload.as_bytes())
        .await
        .map_err(ChannelError::Ssh)?;
    Ok(())
}

/// Read from the channel until `pattern` appears in the buffer tail.
async fn read_until_pattern(
    channel: &mut Channel<Msg>,
    buffer: &mut PatternBuffer,
    pattern: &Regex,
    timeout: Duration,
) -> Result<Vec<u8>> {
    let read = async {
        loop {
            if buffer.tail_contains(pattern) {
                return Ok::<_, crate::Error>(buffer.take());
            }
            match channel.wait().await {
                Some(ChannelMsg::Data { ref data }) => {
                    trace!("recv {} bytes", data.len());
                    buffer.extend(data);
                }
                Some(ChannelMsg::ExtendedData { ref data, .. }) => buffer.extend(data),
                Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => {
                    return Err(ChannelError::Closed.into());
                }
                Some(_) => {}
            }
        }
    };

    match tokio::time::timeout(timeout, read).await {
        Ok(result) => result,
        Err(_) => Err(ChannelError::PatternTimeout(timeout).into()),
    }
}
