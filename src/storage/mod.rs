//! Record stores for players, pending results and the results ledger
//!
//! Each store is a trait with a file-backed implementation (JSON Lines under an
//! explicit data directory) and an in-memory one. Stores never compute ratings;
//! the approval manager is their only writer of rating state.

pub mod ledger;
pub mod pending;
pub mod player;
pub mod records;

use crate::error::{RatingError, Result};
use crate::types::Scope;
use crate::utils::normalize_name;
use std::path::{Path, PathBuf};

// Re-export commonly used types
pub use ledger::{FileResultsLedger, InMemoryResultsLedger, ResultsLedger};
pub use pending::{FilePendingQueue, InMemoryPendingQueue, PendingQueue};
pub use player::{FilePlayerStore, InMemoryPlayerStore, PlayerStore};
pub use records::RecordFile;

/// Directory holding a scope's records: the data directory itself for the
/// global scope, `teams/<team>` below it otherwise
pub fn scope_dir(base_dir: &Path, scope: &Scope) -> Result<PathBuf> {
    match scope {
        Scope::Global => Ok(base_dir.to_path_buf()),
        Scope::Team(team) => Ok(base_dir.join("teams").join(path_component("team", team)?)),
    }
}

/// Accept `value` as a file or directory name only if it is already a
/// normalized name, so no record path can leave the data directory
pub(crate) fn path_component<'a>(kind: &'static str, value: &'a str) -> Result<&'a str> {
    if normalize_name(kind, value)? != value {
        return Err(RatingError::InvalidName {
            kind,
            name: value.to_string(),
            reason: "name must be trimmed and lower case".to_string(),
        });
    }
    Ok(value)
}
