//! Response markers.
//!
//! The device reports success or failure only through fixed strings in
//! free-text output. Every string the driver relies on lives in
//! [`MARKERS`], and [`classify`] is the only place output is inspected.

/// Class of command whose output is being classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandClass {
    /// `load replace|merge <file>`
    Load,
    /// `commit check`
    CommitCheck,
    /// `commit [comment ".."] [label ".."]`
    Commit,
    /// `show candidate diff ..`
    Compare,
    /// `rollback configuration <n>`
    Rollback,
}

/// What a response means for its command class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The operation succeeded.
    Success,
    /// Benign: nothing to do.
    NoChanges,
    /// The device rejected the input as invalid.
    InvalidInput,
    /// The device claims no changes but reordered order-dependent lines.
    ReorderOnly,
    /// No known marker matched.
    Rejected,
}

/// Reported when order-dependent lines were reordered.
pub const REORDER_MARKER: &str = "order-dependent lines reordered";

/// Reported by compare when the candidate equals running.
pub const NO_CONFIG_CHANGES: &str = "No configuration changes found.";

/// `(class, substring, outcome)`; the first matching row wins.
pub const MARKERS: &[(CommandClass, &str, Outcome)] = &[
    (CommandClass::Load, "Operation completed successfully", Outcome::Success),
    (CommandClass::CommitCheck, "Validation complete", Outcome::Success),
    (CommandClass::Commit, "Commit complete.", Outcome::Success),
    (CommandClass::Commit, "No modifications to commit.", Outcome::NoChanges),
    (CommandClass::Commit, "Invalid input detected", Outcome::InvalidInput),
    (CommandClass::Compare, REORDER_MARKER, Outcome::ReorderOnly),
    (CommandClass::Compare, NO_CONFIG_CHANGES, Outcome::NoChanges),
    (CommandClass::Compare, "syntax error", Outcome::InvalidInput),
    (CommandClass::Compare, "Invalid input detected", Outcome::InvalidInput),
    (CommandClass::Rollback, "syntax error", Outcome::InvalidInput),
    (CommandClass::Rollback, "Error:", Outcome::Rejected),
];

/// Classify `output` for `class`.
///
/// `output` must have the command echo removed: a commit comment or label
/// may itself contain marker text.
///
/// Rollback is the one class whose silence means success: the device
/// prints nothing when a rollback file loads cleanly.
pub fn classify(class: CommandClass, output: &str) -> Outcome {
    MARKERS
        .iter()
        .filter(|(c, _, _)| *c == class)
        .find(|(_, marker, _)| output.contains(marker))
        .map(|(_, _, outcome)| *outcome)
        .unwrap_or(match class {
            CommandClass::Rollback => Outcome::Success,
            _ => Outcome::Rejected,
        })
}
