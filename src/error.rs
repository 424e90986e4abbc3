//! Error types for the rating ledger
//!
//! Core operations return [`RatingError`] so callers can tell a rejected request
//! apart from a broken store. Configuration loading and the binary use anyhow.

use serde::Serialize;
use std::path::PathBuf;

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, RatingError>;

/// Broad category of a [`RatingError`], used by callers to decide how to respond
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Request rejected before any write
    Validation,
    /// Referenced player, pending entry or ledger entry does not exist
    NotFound,
    /// Stored state does not line up with what the operation expected
    Consistency,
    /// Underlying read or write failed
    Persistence,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Consistency => "consistency",
            ErrorKind::Persistence => "persistence",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RatingError {
    #[error("Invalid result {value}: expected 0.0, 0.5 or 1.0")]
    InvalidResult { value: f64 },

    #[error("Invalid {kind} name '{name}': {reason}")]
    InvalidName {
        kind: &'static str,
        name: String,
        reason: String,
    },

    #[error("Player '{name}' already exists for {game}")]
    PlayerAlreadyExists { game: String, name: String },

    #[error("A player cannot play against themselves: {name}")]
    SamePlayer { name: String },

    #[error("Player '{name}' is not registered for {game}")]
    InvalidPlayer { game: String, name: String },

    #[error("Player '{name}' has no game entries to remove for {game}")]
    NothingToRemove { game: String, name: String },

    #[error("Player not found: {game}/{name}")]
    PlayerNotFound { game: String, name: String },

    #[error("No pending result at index {index} ({len} pending)")]
    PendingNotFound { index: usize, len: usize },

    #[error("Nothing to undo in {scope}")]
    NothingToUndo { scope: String },

    #[error("History of '{player}' does not match the last approved result: {reason}")]
    Mismatch { player: String, reason: String },

    #[error("Rollback after failed {operation} was incomplete: {cause}; rollback error: {rollback}")]
    RollbackFailed {
        operation: &'static str,
        cause: String,
        rollback: String,
    },

    #[error("Lock poisoned: {what}")]
    LockPoisoned { what: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupted record in {} at line {line}: {message}", path.display())]
    CorruptedRecord {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RatingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RatingError::InvalidResult { .. }
            | RatingError::InvalidName { .. }
            | RatingError::PlayerAlreadyExists { .. }
            | RatingError::SamePlayer { .. }
            | RatingError::InvalidPlayer { .. }
            | RatingError::NothingToRemove { .. } => ErrorKind::Validation,
            RatingError::PlayerNotFound { .. }
            | RatingError::PendingNotFound { .. }
            | RatingError::NothingToUndo { .. } => ErrorKind::NotFound,
            RatingError::Mismatch { .. }
            | RatingError::RollbackFailed { .. }
            | RatingError::LockPoisoned { .. } => ErrorKind::Consistency,
            RatingError::Io { .. }
            | RatingError::CorruptedRecord { .. }
            | RatingError::Serialization(_) => ErrorKind::Persistence,
        }
    }

    /// Whether the failure leaves the request's target untouched and is safe to report
    /// per entry rather than aborting a batch
    pub fn is_rejection(&self) -> bool {
        matches!(self.kind(), ErrorKind::Validation | ErrorKind::NotFound)
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RatingError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn poisoned(what: impl Into<String>) -> Self {
        RatingError::LockPoisoned { what: what.into() }
    }
}
