//! Diff normalization.
//!
//! Turns the device's textual diff output into a canonical form that is
//! stable across runs and comparable between calls:
//!
//! - Device boilerplate (banners, no-op footers, clock/ntp housekeeping) is
//!   removed.
//! - Replace diffs are otherwise passed through.
//! - Merge diffs are command lists: structural noise is dropped, negated
//!   lines become `- <line>`, every other line becomes `+ <line>`.
//!
//! [`normalize`] is pure and idempotent.

use super::markers::{NO_CONFIG_CHANGES, REORDER_MARKER};
use super::transaction::OperationKind;

/// Lines containing any of these carry no configuration intent.
pub const BOILERPLATE: &[&str] = &[
    "Building configuration",
    "Current configuration :",
    "Last configuration change",
    "NVRAM config last updated",
    NO_CONFIG_CHANGES,
    "No modifications to commit.",
    "ntp clock-period",
];

/// Structural lines in merge command lists.
const MERGE_NOISE: &[&str] = &["end", "!", "exit"];

/// Keyword that starts a negated (removal) command.
const NEGATION_KEYWORD: &str = "no";

/// Prepended when the device cannot produce an incremental diff.
pub const FALLBACK_NOTE: &str = "# incremental diff unavailable; showing full candidate";

/// Result of a comparison, as an explicit variant rather than a sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffOutcome {
    /// Candidate and running configuration are equivalent.
    Empty,
    /// Canonical diff text.
    Changes(String),
}

impl DiffOutcome {
    fn from_canonical(text: String) -> Self {
        if text.is_empty() {
            DiffOutcome::Empty
        } else {
            DiffOutcome::Changes(text)
        }
    }
}

/// Raw and canonical output of one `compare()` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffResult {
    /// Device output as received.
    pub raw: String,

    /// Normalized outcome.
    pub outcome: DiffOutcome,
}

impl DiffResult {
    /// Normalize `raw` for an operation of `kind`.
    pub fn from_raw(raw: impl Into<String>, kind: OperationKind) -> Self {
        let raw = raw.into();
        let outcome = DiffOutcome::from_canonical(normalize(&raw, kind));
        Self { raw, outcome }
    }

    /// Build the full-candidate fallback for a device that rejected the
    /// incremental diff command.
    pub fn fallback(raw: impl Into<String>, candidate: &str) -> Self {
        Self {
            raw: raw.into(),
            outcome: DiffOutcome::from_canonical(full_candidate_diff(candidate)),
        }
    }

    /// Canonical text; empty when there are no changes.
    pub fn canonical(&self) -> &str {
        match &self.outcome {
            DiffOutcome::Empty => "",
            DiffOutcome::Changes(text) => text,
        }
    }

    /// Whether the comparison found nothing to apply.
    pub fn is_noop(&self) -> bool {
        self.outcome == DiffOutcome::Empty
    }
}

/// Canonicalize raw diff output.
///
/// A device "no changes" report is honoured unless the same output also
/// reports reordered order-dependent lines: reordering changes device
/// state, so it is kept as a change.
pub fn normalize(raw: &str, kind: OperationKind) -> String {
    let reordered = raw.contains(REORDER_MARKER);
    if raw.contains(NO_CONFIG_CHANGES) && !reordered {
        return String::new();
    }

    let lines = raw
        .lines()
        .map(str::trim_end)
        .filter(|line| !is_boilerplate(line));

    let canonical: Vec<String> = match kind {
        OperationKind::Replace => lines.map(str::to_string).collect(),
        OperationKind::Merge => lines.filter_map(canonical_merge_line).collect(),
    };

    join_trimmed(&canonical)
}

/// Every non-blank candidate line as an addition, under [`FALLBACK_NOTE`].
pub fn full_candidate_diff(candidate: &str) -> String {
    if candidate.trim().is_empty() {
        return String::new();
    }

    let mut out = vec![FALLBACK_NOTE.to_string()];
    out.extend(candidate.lines().map(str::trim_end).map(|line| {
        if line.trim().is_empty() {
            String::new()
        } else {
            format!("+ {line}")
        }
    }));
    join_trimmed(&out)
}

fn is_boilerplate(line: &str) -> bool {
    BOILERPLATE.iter().any(|b| line.contains(b))
}

fn canonical_merge_line(line: &str) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || MERGE_NOISE.contains(&trimmed) {
        return None;
    }
    // Already canonical
    if line.starts_with(['+', '-']) {
        return Some(line.to_string());
    }
    // Device annotations and command-list headers
    if trimmed.starts_with('%') || trimmed.starts_with("!!") {
        return trimmed.contains(REORDER_MARKER).then(|| trimmed.to_string());
    }

    if trimmed.split_whitespace().next() == Some(NEGATION_KEYWORD) {
        Some(format!("- {line}"))
    } else {
        Some(format!("+ {line}"))
    }
}

/// Join lines, dropping leading and trailing blank lines.
fn join_trimmed(lines: &[String]) -> String {
    let start = lines.iter().position(|l| !l.trim().is_empty());
    let end = lines.iter().rposition(|l| !l.trim().is_empty());
    match (start, end) {
        (Some(start), Some(end)) => lines[start..=end].join("\n"),
        _ => String::new(),
    }
}
