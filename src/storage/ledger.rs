//! Results ledger: the append-only record of approved results
//!
//! `remove_last` is the only mutation besides `append` and is reserved for undo.

use crate::error::{RatingError, Result};
use crate::storage::records::RecordFile;
use crate::storage::scope_dir;
use crate::types::{LedgerEntry, Scope};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

/// Trait for results ledger storage
pub trait ResultsLedger: Send + Sync {
    fn append(&self, scope: &Scope, entry: LedgerEntry) -> Result<()>;

    /// Most recently appended entry
    fn peek_last(&self, scope: &Scope) -> Result<Option<LedgerEntry>>;

    /// Remove and return the most recently appended entry
    fn remove_last(&self, scope: &Scope) -> Result<LedgerEntry>;

    /// All entries in append order
    fn entries(&self, scope: &Scope) -> Result<Vec<LedgerEntry>>;

    /// Page of entries, newest first
    fn list_recent(&self, scope: &Scope, limit: usize, offset: usize) -> Result<Vec<LedgerEntry>> {
        Ok(newest_first(self.entries(scope)?, limit, offset))
    }

    fn len(&self, scope: &Scope) -> Result<usize> {
        Ok(self.entries(scope)?.len())
    }
}

/// Order by approval time descending; entries approved at the same instant keep
/// reverse insertion order
fn newest_first(entries: Vec<LedgerEntry>, limit: usize, offset: usize) -> Vec<LedgerEntry> {
    let mut numbered: Vec<(usize, LedgerEntry)> = entries.into_iter().enumerate().collect();
    numbered.sort_by(|(seq_a, a), (seq_b, b)| {
        b.approved_at
            .cmp(&a.approved_at)
            .then_with(|| seq_b.cmp(seq_a))
    });

    numbered
        .into_iter()
        .skip(offset)
        .take(limit)
        .map(|(_, entry)| entry)
        .collect()
}

fn nothing_to_undo(scope: &Scope) -> RatingError {
    RatingError::NothingToUndo {
        scope: scope.to_string(),
    }
}

/// Results ledger stored as `<scope>/results.jsonl`
#[derive(Debug)]
pub struct FileResultsLedger {
    base_dir: PathBuf,
    lock: Mutex<()>,
}

impl FileResultsLedger {
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir).map_err(|e| RatingError::io(&base_dir, e))?;
        Ok(Self {
            base_dir,
            lock: Mutex::new(()),
        })
    }

    fn record(&self, scope: &Scope) -> Result<RecordFile<LedgerEntry>> {
        Ok(RecordFile::new(scope_dir(&self.base_dir, scope)?.join("results.jsonl")))
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.lock
            .lock()
            .map_err(|_| RatingError::poisoned("results ledger"))
    }
}

impl ResultsLedger for FileResultsLedger {
    fn append(&self, scope: &Scope, entry: LedgerEntry) -> Result<()> {
        let _guard = self.guard()?;
        self.record(scope)?.append(&entry)
    }

    fn peek_last(&self, scope: &Scope) -> Result<Option<LedgerEntry>> {
        let _guard = self.guard()?;
        Ok(self.record(scope)?.read_all()?.pop())
    }

    fn remove_last(&self, scope: &Scope) -> Result<LedgerEntry> {
        let _guard = self.guard()?;
        let record = self.record(scope)?;
        let mut entries = record.read_all()?;
        let removed = entries.pop().ok_or_else(|| nothing_to_undo(scope))?;
        record.rewrite(&entries)?;
        Ok(removed)
    }

    fn entries(&self, scope: &Scope) -> Result<Vec<LedgerEntry>> {
        let _guard = self.guard()?;
        self.record(scope)?.read_all()
    }
}

/// In-memory results ledger for tests and embedding
#[derive(Debug, Default)]
pub struct InMemoryResultsLedger {
    entries: RwLock<HashMap<Scope, Vec<LedgerEntry>>>,
}

impl InMemoryResultsLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultsLedger for InMemoryResultsLedger {
    fn append(&self, scope: &Scope, entry: LedgerEntry) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| RatingError::poisoned("results ledger"))?;

        entries.entry(scope.clone()).or_default().push(entry);
        Ok(())
    }

    fn peek_last(&self, scope: &Scope) -> Result<Option<LedgerEntry>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| RatingError::poisoned("results ledger"))?;

        Ok(entries.get(scope).and_then(|list| list.last().cloned()))
    }

    fn remove_last(&self, scope: &Scope) -> Result<LedgerEntry> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| RatingError::poisoned("results ledger"))?;

        entries
            .get_mut(scope)
            .and_then(|list| list.pop())
            .ok_or_else(|| nothing_to_undo(scope))
    }

    fn entries(&self, scope: &Scope) -> Result<Vec<LedgerEntry>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| RatingError::poisoned("results ledger"))?;

        Ok(entries.get(scope).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GameResult;
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::TempDir;

    fn entry(a: &str, b: &str, minute: i64) -> LedgerEntry {
        let base = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        LedgerEntry {
            game: "chess".to_string(),
            player_a: a.to_string(),
            player_b: b.to_string(),
            result: GameResult::Win,
            rating_a: 1200.0,
            rating_b: 1200.0,
            delta_a: 20.0,
            delta_b: -20.0,
            submitted_at: base,
            approved_at: base + Duration::minutes(minute),
            commentary: None,
        }
    }

    fn exercise_ledger(ledger: &dyn ResultsLedger) {
        let scope = Scope::Global;
        assert!(ledger.peek_last(&scope).unwrap().is_none());
        let err = ledger.remove_last(&scope).unwrap_err();
        assert!(matches!(err, RatingError::NothingToUndo { .. }));

        ledger.append(&scope, entry("dean", "eid", 1)).unwrap();
        ledger.append(&scope, entry("gavin", "eid", 2)).unwrap();
        ledger.append(&scope, entry("dean", "gavin", 3)).unwrap();
        assert_eq!(ledger.len(&scope).unwrap(), 3);

        assert_eq!(
            ledger.peek_last(&scope).unwrap().unwrap().player_b,
            "gavin"
        );

        let page = ledger.list_recent(&scope, 2, 0).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].player_a, "dean");
        assert_eq!(page[0].player_b, "gavin");
        assert_eq!(page[1].player_a, "gavin");

        let page = ledger.list_recent(&scope, 2, 2).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].player_b, "eid");
        assert_eq!(page[0].player_a, "dean");

        let removed = ledger.remove_last(&scope).unwrap();
        assert_eq!(removed.player_b, "gavin");
        assert_eq!(ledger.len(&scope).unwrap(), 2);
        assert!(ledger
            .peek_last(&Scope::Team("acme".to_string()))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_in_memory_ledger() {
        exercise_ledger(&InMemoryResultsLedger::new());
    }

    #[test]
    fn test_file_ledger() {
        let temp_dir = TempDir::new().unwrap();
        exercise_ledger(&FileResultsLedger::new(temp_dir.path()).unwrap());
    }

    #[test]
    fn test_ties_are_ordered_by_insertion() {
        let ledger = InMemoryResultsLedger::new();
        let scope = Scope::Global;
        ledger.append(&scope, entry("first", "x", 5)).unwrap();
        ledger.append(&scope, entry("second", "x", 5)).unwrap();
        ledger.append(&scope, entry("older", "x", 1)).unwrap();

        let names: Vec<String> = ledger
            .list_recent(&scope, 10, 0)
            .unwrap()
            .into_iter()
            .map(|e| e.player_a)
            .collect();
        assert_eq!(names, vec!["second", "first", "older"]);
    }
}
