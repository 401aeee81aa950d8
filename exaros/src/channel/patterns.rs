//! Prompt patterns derived from the device's base prompt.
//!
//! ExaROS prompts share a common prefix across modes:
//!
//! ```text
//! edge1#                 # exec mode
//! edge1(config)#         # configuration mode (configure private)
//! edge1(config-if)#      # configuration sub-mode
//! ```
//!
//! The base prompt is read once at session start. Every mode pattern is
//! built from its first [`PROMPT_PREFIX_LEN`] characters, so long hostnames
//! that the CLI truncates in sub-modes still match.

use regex::bytes::Regex;

/// Maximum number of base-prompt characters used in mode patterns.
pub const PROMPT_PREFIX_LEN: usize = 16;

/// Pattern used before the base prompt is known.
pub fn initial_prompt_pattern() -> Regex {
    Regex::new(r"(?m)[>#%$][ \t]*$").expect("static prompt pattern is valid")
}

/// Derive the base prompt from the output of the first read.
///
/// The base prompt is the last non-empty line with its terminator
/// (`>`, `#`, `%` or `$`) removed.
pub fn base_prompt_from(output: &str) -> Option<String> {
    let line = output.lines().rev().map(str::trim).find(|l| !l.is_empty())?;
    let base = line.strip_suffix(['>', '#', '%', '$'])?;
    if base.is_empty() {
        None
    } else {
        Some(base.to_string())
    }
}

/// Escaped prompt prefix shared by all mode patterns.
pub fn prompt_prefix(base_prompt: &str) -> String {
    let prefix: String = base_prompt.chars().take(PROMPT_PREFIX_LEN).collect();
    regex::escape(&prefix)
}

/// Compiled prompt patterns for one session.
#[derive(Debug, Clone)]
pub struct PromptPatterns {
    base_prompt: String,

    /// Any prompt of this device, in any mode.
    pub any: Regex,

    /// Configuration mode (`prefix...)#`).
    pub config: Regex,

    /// Exec mode (no parenthesised mode indicator).
    pub exec: Regex,
}

impl PromptPatterns {
    /// Build the mode patterns for `base_prompt`.
    pub fn derive(base_prompt: &str) -> Result<Self, regex::Error> {
        let prefix = prompt_prefix(base_prompt);
        Ok(Self {
            base_prompt: base_prompt.to_string(),
            any: Regex::new(&format!(r"(?m)^{prefix}[^\n]*[>#%$][ \t]*$"))?,
            config: Regex::new(&format!(r"(?m)^{prefix}[^\n]*\)#[ \t]*$"))?,
            exec: Regex::new(&format!(r"(?m)^{prefix}[^\n()]*[>#][ \t]*$"))?,
        })
    }

    /// The base prompt these patterns were derived from.
    pub fn base_prompt(&self) -> &str {
        &self.base_prompt
    }
}
