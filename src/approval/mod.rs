//! Result approval and undo
//!
//! The [`ApprovalManager`] is the only component that changes ratings. It
//! validates pending results, applies them across the player, ledger and
//! pending stores as one unit, and reverses the last one on request.

pub mod locks;
pub mod manager;
pub mod report;

// Re-export commonly used types
pub use locks::ScopeLocks;
pub use manager::ApprovalManager;
pub use report::{ApprovalReport, ApprovedResult, FailedApproval};
