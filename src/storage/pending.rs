//! Pending queue: submitted results awaiting admin approval
//!
//! Indices are positions in submission order at the time of the call.
//! Removing an entry shifts every later entry down by one, so callers should
//! list again after a removal before addressing entries by index.

use crate::error::{RatingError, Result};
use crate::storage::records::RecordFile;
use crate::storage::scope_dir;
use crate::types::{IndexedPending, PendingResult, Scope};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

/// Trait for pending result storage
pub trait PendingQueue: Send + Sync {
    /// Append a result to the end of the queue and return its index
    fn submit(&self, scope: &Scope, pending: PendingResult) -> Result<usize>;

    /// All pending results in submission order
    fn list(&self, scope: &Scope) -> Result<Vec<PendingResult>>;

    /// Remove and return the entry at `index`
    fn remove_at(&self, scope: &Scope, index: usize) -> Result<PendingResult>;

    /// Drop every entry, returning how many were removed
    fn clear(&self, scope: &Scope) -> Result<usize>;

    /// Set or clear the admin note of the entry at `index`
    fn annotate(&self, scope: &Scope, index: usize, note: Option<String>) -> Result<()>;

    fn get(&self, scope: &Scope, index: usize) -> Result<PendingResult> {
        let entries = self.list(scope)?;
        let len = entries.len();
        entries
            .into_iter()
            .nth(index)
            .ok_or(RatingError::PendingNotFound { index, len })
    }

    /// Entries paired with their current index
    fn list_indexed(&self, scope: &Scope) -> Result<Vec<IndexedPending>> {
        Ok(self
            .list(scope)?
            .into_iter()
            .enumerate()
            .map(|(index, pending)| IndexedPending { index, pending })
            .collect())
    }
}

/// Pending queue stored as `<scope>/pending.jsonl`
#[derive(Debug)]
pub struct FilePendingQueue {
    base_dir: PathBuf,
    lock: Mutex<()>,
}

impl FilePendingQueue {
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir).map_err(|e| RatingError::io(&base_dir, e))?;
        Ok(Self {
            base_dir,
            lock: Mutex::new(()),
        })
    }

    fn record(&self, scope: &Scope) -> Result<RecordFile<PendingResult>> {
        Ok(RecordFile::new(scope_dir(&self.base_dir, scope)?.join("pending.jsonl")))
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.lock
            .lock()
            .map_err(|_| RatingError::poisoned("pending queue"))
    }
}

impl PendingQueue for FilePendingQueue {
    fn submit(&self, scope: &Scope, pending: PendingResult) -> Result<usize> {
        let _guard = self.guard()?;
        let record = self.record(scope)?;
        let index = record.read_all()?.len();
        record.append(&pending)?;
        Ok(index)
    }

    fn list(&self, scope: &Scope) -> Result<Vec<PendingResult>> {
        let _guard = self.guard()?;
        self.record(scope)?.read_all()
    }

    fn remove_at(&self, scope: &Scope, index: usize) -> Result<PendingResult> {
        let _guard = self.guard()?;
        let record = self.record(scope)?;
        let mut entries = record.read_all()?;
        if index >= entries.len() {
            return Err(RatingError::PendingNotFound {
                index,
                len: entries.len(),
            });
        }

        let removed = entries.remove(index);
        record.rewrite(&entries)?;
        Ok(removed)
    }

    fn clear(&self, scope: &Scope) -> Result<usize> {
        let _guard = self.guard()?;
        let record = self.record(scope)?;
        let count = record.read_all()?.len();
        if count > 0 {
            record.rewrite(&[])?;
        }
        Ok(count)
    }

    fn annotate(&self, scope: &Scope, index: usize, note: Option<String>) -> Result<()> {
        let _guard = self.guard()?;
        let record = self.record(scope)?;
        let mut entries = record.read_all()?;
        let len = entries.len();
        let entry = entries
            .get_mut(index)
            .ok_or(RatingError::PendingNotFound { index, len })?;

        entry.note = note;
        record.rewrite(&entries)
    }
}

/// In-memory pending queue for tests and embedding
#[derive(Debug, Default)]
pub struct InMemoryPendingQueue {
    queues: RwLock<HashMap<Scope, Vec<PendingResult>>>,
}

impl InMemoryPendingQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PendingQueue for InMemoryPendingQueue {
    fn submit(&self, scope: &Scope, pending: PendingResult) -> Result<usize> {
        let mut queues = self
            .queues
            .write()
            .map_err(|_| RatingError::poisoned("pending queue"))?;

        let queue = queues.entry(scope.clone()).or_default();
        queue.push(pending);
        Ok(queue.len() - 1)
    }

    fn list(&self, scope: &Scope) -> Result<Vec<PendingResult>> {
        let queues = self
            .queues
            .read()
            .map_err(|_| RatingError::poisoned("pending queue"))?;

        Ok(queues.get(scope).cloned().unwrap_or_default())
    }

    fn remove_at(&self, scope: &Scope, index: usize) -> Result<PendingResult> {
        let mut queues = self
            .queues
            .write()
            .map_err(|_| RatingError::poisoned("pending queue"))?;

        let queue = queues.entry(scope.clone()).or_default();
        if index >= queue.len() {
            return Err(RatingError::PendingNotFound {
                index,
                len: queue.len(),
            });
        }
        Ok(queue.remove(index))
    }

    fn clear(&self, scope: &Scope) -> Result<usize> {
        let mut queues = self
            .queues
            .write()
            .map_err(|_| RatingError::poisoned("pending queue"))?;

        Ok(queues.remove(scope).map(|queue| queue.len()).unwrap_or(0))
    }

    fn annotate(&self, scope: &Scope, index: usize, note: Option<String>) -> Result<()> {
        let mut queues = self
            .queues
            .write()
            .map_err(|_| RatingError::poisoned("pending queue"))?;

        let queue = queues.entry(scope.clone()).or_default();
        let len = queue.len();
        let entry = queue
            .get_mut(index)
            .ok_or(RatingError::PendingNotFound { index, len })?;
        entry.note = note;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::current_timestamp;
    use tempfile::TempDir;

    fn pending(a: &str, b: &str) -> PendingResult {
        PendingResult {
            game: "chess".to_string(),
            player_a: a.to_string(),
            player_b: b.to_string(),
            result: 1.0,
            submitted_at: current_timestamp(),
            note: None,
        }
    }

    fn exercise_queue(queue: &dyn PendingQueue) {
        let scope = Scope::Global;
        assert_eq!(queue.submit(&scope, pending("dean", "eid")).unwrap(), 0);
        assert_eq!(queue.submit(&scope, pending("gavin", "eid")).unwrap(), 1);
        assert_eq!(queue.submit(&scope, pending("dean", "gavin")).unwrap(), 2);

        queue
            .annotate(&scope, 1, Some("replayed after dispute".to_string()))
            .unwrap();
        assert_eq!(
            queue.get(&scope, 1).unwrap().note.as_deref(),
            Some("replayed after dispute")
        );

        // Removal shifts later entries down
        let removed = queue.remove_at(&scope, 0).unwrap();
        assert_eq!(removed.player_a, "dean");
        let indexed = queue.list_indexed(&scope).unwrap();
        assert_eq!(indexed.len(), 2);
        assert_eq!(indexed[0].index, 0);
        assert_eq!(indexed[0].pending.player_a, "gavin");
        assert_eq!(indexed[1].pending.player_b, "gavin");

        let err = queue.remove_at(&scope, 5).unwrap_err();
        assert!(matches!(
            err,
            RatingError::PendingNotFound { index: 5, len: 2 }
        ));
        let err = queue.annotate(&scope, 2, None).unwrap_err();
        assert!(matches!(err, RatingError::PendingNotFound { .. }));

        // Other scopes are unaffected
        let team = Scope::Team("acme".to_string());
        queue.submit(&team, pending("ann", "bob")).unwrap();
        assert_eq!(queue.clear(&scope).unwrap(), 2);
        assert!(queue.list(&scope).unwrap().is_empty());
        assert_eq!(queue.list(&team).unwrap().len(), 1);
        assert_eq!(queue.clear(&scope).unwrap(), 0);
    }

    #[test]
    fn test_in_memory_queue() {
        exercise_queue(&InMemoryPendingQueue::new());
    }

    #[test]
    fn test_file_queue() {
        let temp_dir = TempDir::new().unwrap();
        exercise_queue(&FilePendingQueue::new(temp_dir.path()).unwrap());
        assert!(temp_dir.path().join("pending.jsonl").is_file());
        assert!(temp_dir
            .path()
            .join("teams")
            .join("acme")
            .join("pending.jsonl")
            .is_file());
    }
}
