//! Per-scope mutual exclusion for mutating operations
//!
//! Every approval, undo or queue edit runs its whole read-modify-write while
//! holding its scope's lock. Different scopes never wait on each other.

use crate::error::{RatingError, Result};
use crate::types::Scope;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Registry of one mutex per scope, created on first use
#[derive(Debug, Default)]
pub struct ScopeLocks {
    locks: Mutex<HashMap<Scope, Arc<Mutex<()>>>>,
}

impl ScopeLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self, scope: &Scope) -> Result<Arc<Mutex<()>>> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| RatingError::poisoned("scope lock registry"))?;

        Ok(locks.entry(scope.clone()).or_default().clone())
    }

    /// Run `operation` while holding the lock for `scope`
    pub fn run<T>(&self, scope: &Scope, operation: impl FnOnce() -> Result<T>) -> Result<T> {
        let handle = self.handle(scope)?;
        let _guard = handle
            .lock()
            .map_err(|_| RatingError::poisoned(format!("scope lock for {}", scope)))?;

        operation()
    }
}
