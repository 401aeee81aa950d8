//! Pattern buffer with tail-search optimization.
//!
//! Only the last N bytes of the buffer are searched for prompt patterns,
//! rather than the entire output. Large outputs such as `show configuration
//! running all` would otherwise be rescanned on every chunk.

use regex::bytes::Regex;

const ESC: u8 = 0x1b;
const BEL: u8 = 0x07;

/// Longest escape sequence held back waiting for its final byte.
const MAX_PENDING: usize = 256;

/// Buffer for accumulating channel output and searching it for prompts.
///
/// Incoming data has ANSI escape sequences and carriage returns removed, so
/// prompt patterns and marker strings only ever see plain `\n`-separated text.
/// An escape sequence split across reads is held back until it completes.
#[derive(Debug)]
pub struct PatternBuffer {
    /// The accumulated output buffer.
    buffer: Vec<u8>,

    /// Unterminated escape sequence at the end of the last chunk.
    pending: Vec<u8>,

    /// How many bytes from the end to search for patterns.
    search_depth: usize,
}

impl PatternBuffer {
    /// Create a new pattern buffer with the specified search depth.
    pub fn new(search_depth: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
            pending: Vec::new(),
            search_depth,
        }
    }

    /// Extend the buffer with new data, stripping ANSI escapes and `\r`.
    pub fn extend(&mut self, data: &[u8]) {
        let mut chunk = std::mem::take(&mut self.pending);
        chunk.extend_from_slice(data);
        if let Some(pos) = incomplete_escape(&chunk) {
            self.pending = chunk.split_off(pos);
        }
        let cleaned = strip_ansi_escapes::strip(&chunk);
        self.buffer
            .extend(cleaned.into_iter().filter(|&b| b != b'\r'));
    }

    /// Search only the tail of the buffer for the pattern.
    ///
    /// Returns the match with byte offsets relative to the start of the
    /// search region, not the full buffer.
    pub fn search_tail(&self, pattern: &Regex) -> Option<regex::bytes::Match<'_>> {
        let start = self.buffer.len().saturating_sub(self.search_depth);
        pattern.find(&self.buffer[start..])
    }

    /// Check if the tail contains a pattern match.
    pub fn tail_contains(&self, pattern: &Regex) -> bool {
        self.search_tail(pattern).is_some()
    }

    /// Take ownership of the buffer contents and reset.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buffer)
    }

    /// Get a reference to the buffer contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clear the buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.pending.clear();
    }
}

impl Default for PatternBuffer {
    fn default() -> Self {
        Self::new(1000)
    }
}

/// Offset of a trailing escape sequence that has not seen its final byte.
fn incomplete_escape(data: &[u8]) -> Option<usize> {
    let pos = memchr::memrchr(ESC, data)?;
    let rest = &data[pos + 1..];
    if rest.len() >= MAX_PENDING {
        return None;
    }
    let complete = match rest.split_first() {
        None => false,
        // CSI ends with a byte in 0x40..=0x7e
        Some((b'[', params)) => params.iter().any(|b| (0x40..=0x7e).contains(b)),
        // OSC ends with BEL; an ESC \ terminator is the last ESC itself
        Some((b']', body)) => body.contains(&BEL),
        Some(_) => true,
    };
    (!complete).then_some(pos)
}

/// The last non-empty line of `data`, trimmed.
///
/// Used to pick the prompt off the end of a read.
pub fn last_line(data: &[u8]) -> String {
    let mut end = data.len();
    loop {
        let start = memchr::memrchr(b'\n', &data[..end]).map_or(0, |pos| pos + 1);
        let line = String::from_utf8_lossy(&data[start..end]);
        let line = line.trim();
        if !line.is_empty() || start == 0 {
            return line.to_string();
        }
        end = start - 1;
    }
}
