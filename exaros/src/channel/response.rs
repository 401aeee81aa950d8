//! Response type for command execution results.

use std::time::Duration;

/// Response from a command sent over the command channel.
#[derive(Debug, Clone)]
pub struct Response {
    /// The command that was executed.
    pub command: String,

    /// The command output (normalized - command echo and trailing prompt removed).
    pub result: String,

    /// The raw output before normalization. Marker detection runs on this.
    pub raw_result: String,

    /// The prompt that was matched at the end.
    pub prompt: String,

    /// Time taken to execute the command.
    pub elapsed: Duration,
}

impl Response {
    /// Create a new response.
    pub fn new(
        command: impl Into<String>,
        result: impl Into<String>,
        raw_result: impl Into<String>,
        prompt: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            command: command.into(),
            result: result.into(),
            raw_result: raw_result.into(),
            prompt: prompt.into(),
            elapsed,
        }
    }

    /// Build a response from raw channel output, normalizing it.
    pub fn from_raw(command: &str, raw: String, prompt: String, elapsed: Duration) -> Self {
        let result = normalize_output(&raw, command);
        Self::new(command, result, raw, prompt, elapsed)
    }

    /// Get the result lines as an iterator.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.result.lines()
    }

    /// Check if the raw output contains a substring.
    pub fn contains(&self, pattern: &str) -> bool {
        self.raw_result.contains(pattern)
    }
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.result)
    }
}

/// Strip the command echo from the start and the prompt line from the end.
pub fn normalize_output(raw: &str, command: &str) -> String {
    let output = raw.trim_start_matches('\n');
    let output = output
        .strip_prefix(command)
        .unwrap_or(output)
        .trim_start_matches('\n');

    match output.rfind('\n') {
        Some(pos) => output[..pos].to_string(),
        None => String::new(),
    }
}
