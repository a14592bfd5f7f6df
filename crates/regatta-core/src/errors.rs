//! Error taxonomy for the race engine.

use thiserror::Error;

/// Rejection of a malformed pilot instruction.
///
/// At most one primary directive (goto / heading / vector / turn) may be
/// set per tick. Multiple simultaneous directives are a contract violation
/// and the whole instruction is treated as a no-op by the engine rather
/// than guessing which directive wins.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InstructionError {
    #[error("instructions carry {count} primary directives, expected at most one")]
    MultipleDirectives { count: usize },
}

/// A bot invocation failed.
#[derive(Debug, Clone, Error)]
pub enum BotError {
    /// The pilot returned an error of its own.
    #[error("bot failed: {0}")]
    Failed(String),
    /// The pilot panicked; the panic was caught at the invocation boundary.
    #[error("bot panicked: {0}")]
    Panicked(String),
    /// The pilot returned malformed instructions.
    #[error(transparent)]
    Invalid(#[from] InstructionError),
}

/// Score persistence failure.
#[derive(Debug, Error)]
pub enum ScoreIoError {
    #[error("score store I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed score record: {0:?}")]
    Malformed(String),
}
