//! Outcome of approving a batch of pending results

use crate::error::{ErrorKind, RatingError};
use crate::types::{LedgerEntry, PendingResult};
use serde::Serialize;

/// A pending result that was applied
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApprovedResult {
    /// Position in the queue when the batch started
    pub index: usize,
    pub entry: LedgerEntry,
}

/// A pending result that could not be applied
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedApproval {
    /// Position in the queue when the batch started
    pub index: usize,
    pub pending: PendingResult,
    pub kind: ErrorKind,
    pub error: String,
}

impl FailedApproval {
    pub fn new(index: usize, pending: PendingResult, error: &RatingError) -> Self {
        Self {
            index,
            pending,
            kind: error.kind(),
            error: error.to_string(),
        }
    }
}

/// Per-entry report of an approve-all run
///
/// Rejected entries (unknown player, bad score) stay queued and the batch goes
/// on. A storage or consistency failure stops the batch: every later entry is
/// listed in `skipped` and also stays queued.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ApprovalReport {
    pub approved: Vec<ApprovedResult>,
    pub failed: Vec<FailedApproval>,
    pub skipped: Vec<usize>,
    pub aborted: bool,
}

impl ApprovalReport {
    /// Number of entries the batch looked at
    pub fn total(&self) -> usize {
        self.approved.len() + self.failed.len() + self.skipped.len()
    }

    /// True when every entry was approved
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }

    pub fn approved_indices(&self) -> Vec<usize> {
        self.approved.iter().map(|approved| approved.index).collect()
    }

    pub fn failed_indices(&self) -> Vec<usize> {
        self.failed.iter().map(|failed| failed.index).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::current_timestamp;

    fn pending() -> PendingResult {
        PendingResult {
            game: "chess".to_string(),
            player_a: "dean".to_string(),
            player_b: "ghost".to_string(),
            result: 1.0,
            submitted_at: current_timestamp(),
            note: None,
        }
    }

    #[test]
    fn test_empty_report_is_complete() {
        let report = ApprovalReport::default();
        assert!(report.is_complete());
        assert_eq!(report.total(), 0);
    }

    #[test]
    fn test_failed_entry_keeps_error_kind() {
        let error = RatingError::InvalidPlayer {
            game: "chess".to_string(),
            name: "ghost".to_string(),
        };
        let report = ApprovalReport {
            failed: vec![FailedApproval::new(1, pending(), &error)],
            skipped: vec![2],
            ..Default::default()
        };

        assert!(!report.is_complete());
        assert_eq!(report.failed_indices(), vec![1]);
        assert_eq!(report.failed[0].kind, ErrorKind::Validation);
        assert!(report.failed[0].error.contains("ghost"));
        assert_eq!(report.total(), 2);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["failed"][0]["kind"], "validation");
    }
}
