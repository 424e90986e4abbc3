//! Test fixtures and failing store doubles for integration testing

#![allow(dead_code)]

use elo_ledger::approval::ApprovalManager;
use elo_ledger::config::GameSettings;
use elo_ledger::error::{RatingError, Result};
use elo_ledger::metrics::MetricsCollector;
use elo_ledger::rating::EloRatingCalculator;
use elo_ledger::storage::{
    InMemoryPendingQueue, InMemoryPlayerStore, InMemoryResultsLedger, PendingQueue, PlayerStore,
    ResultsLedger,
};
use elo_ledger::types::{LedgerEntry, PendingResult, PlayerKey, PlayerName, RatingEvent, Scope};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

pub fn injected(what: &str) -> RatingError {
    RatingError::Io {
        path: PathBuf::from(format!("injected/{}", what)),
        source: std::io::Error::new(std::io::ErrorKind::Other, "injected failure"),
    }
}

/// Player store that can be told to fail appends for one player or any removal
#[derive(Debug, Default)]
pub struct FlakyPlayerStore {
    inner: InMemoryPlayerStore,
    fail_append_for: Mutex<Option<String>>,
    fail_remove: AtomicBool,
}

impl FlakyPlayerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_appends_for(&self, name: Option<&str>) {
        *self.fail_append_for.lock().unwrap() = name.map(str::to_string);
    }

    pub fn fail_removals(&self, fail: bool) {
        self.fail_remove.store(fail, Ordering::SeqCst);
    }
}

impl PlayerStore for FlakyPlayerStore {
    fn create_player(&self, key: &PlayerKey, seed: RatingEvent) -> Result<()> {
        self.inner.create_player(key, seed)
    }

    fn delete_player(&self, key: &PlayerKey) -> Result<()> {
        self.inner.delete_player(key)
    }

    fn exists(&self, key: &PlayerKey) -> Result<bool> {
        self.inner.exists(key)
    }

    fn list_players(&self, scope: &Scope, game: &str) -> Result<BTreeSet<PlayerName>> {
        self.inner.list_players(scope, game)
    }

    fn list_games(&self, scope: &Scope) -> Result<BTreeSet<String>> {
        self.inner.list_games(scope)
    }

    fn read_history(&self, key: &PlayerKey) -> Result<Vec<RatingEvent>> {
        self.inner.read_history(key)
    }

    fn append_event(&self, key: &PlayerKey, event: RatingEvent) -> Result<()> {
        if self.fail_append_for.lock().unwrap().as_deref() == Some(key.name.as_str()) {
            return Err(injected("player append"));
        }
        self.inner.append_event(key, event)
    }

    fn remove_last_event(&self, key: &PlayerKey) -> Result<RatingEvent> {
        if self.fail_remove.load(Ordering::SeqCst) {
            return Err(injected("player remove"));
        }
        self.inner.remove_last_event(key)
    }
}

/// Results ledger whose appends and removals can be switched to fail
#[derive(Debug, Default)]
pub struct FlakyLedger {
    inner: InMemoryResultsLedger,
    fail_append: AtomicBool,
    fail_remove: AtomicBool,
}

impl FlakyLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_appends(&self, fail: bool) {
        self.fail_append.store(fail, Ordering::SeqCst);
    }

    pub fn fail_removals(&self, fail: bool) {
        self.fail_remove.store(fail, Ordering::SeqCst);
    }
}

impl ResultsLedger for FlakyLedger {
    fn append(&self, scope: &Scope, entry: LedgerEntry) -> Result<()> {
        if self.fail_append.load(Ordering::SeqCst) {
            return Err(injected("ledger append"));
        }
        self.inner.append(scope, entry)
    }

    fn peek_last(&self, scope: &Scope) -> Result<Option<LedgerEntry>> {
        self.inner.peek_last(scope)
    }

    fn remove_last(&self, scope: &Scope) -> Result<LedgerEntry> {
        if self.fail_remove.load(Ordering::SeqCst) {
            return Err(injected("ledger remove"));
        }
        self.inner.remove_last(scope)
    }

    fn entries(&self, scope: &Scope) -> Result<Vec<LedgerEntry>> {
        self.inner.entries(scope)
    }
}

/// Pending queue whose removals can be switched to fail
#[derive(Debug, Default)]
pub struct FlakyPendingQueue {
    inner: InMemoryPendingQueue,
    fail_remove: AtomicBool,
}

impl FlakyPendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_removals(&self, fail: bool) {
        self.fail_remove.store(fail, Ordering::SeqCst);
    }
}

impl PendingQueue for FlakyPendingQueue {
    fn submit(&self, scope: &Scope, pending: PendingResult) -> Result<usize> {
        self.inner.submit(scope, pending)
    }

    fn list(&self, scope: &Scope) -> Result<Vec<PendingResult>> {
        self.inner.list(scope)
    }

    fn remove_at(&self, scope: &Scope, index: usize) -> Result<PendingResult> {
        if self.fail_remove.load(Ordering::SeqCst) {
            return Err(injected("pending remove"));
        }
        self.inner.remove_at(scope, index)
    }

    fn clear(&self, scope: &Scope) -> Result<usize> {
        self.inner.clear(scope)
    }

    fn annotate(&self, scope: &Scope, index: usize, note: Option<String>) -> Result<()> {
        self.inner.annotate(scope, index, note)
    }
}

/// Manager over flaky in-memory stores, with handles to each store
pub struct TestSystem {
    pub manager: ApprovalManager,
    pub players: Arc<FlakyPlayerStore>,
    pub pending: Arc<FlakyPendingQueue>,
    pub ledger: Arc<FlakyLedger>,
    pub metrics: Arc<MetricsCollector>,
}

impl TestSystem {
    pub fn new() -> Self {
        Self::with_settings(GameSettings::default())
    }

    pub fn with_settings(settings: GameSettings) -> Self {
        let players = Arc::new(FlakyPlayerStore::new());
        let pending = Arc::new(FlakyPendingQueue::new());
        let ledger = Arc::new(FlakyLedger::new());
        let metrics = Arc::new(MetricsCollector::new().unwrap());

        let manager = ApprovalManager::with_metrics(
            players.clone(),
            pending.clone(),
            ledger.clone(),
            Arc::new(EloRatingCalculator::new(settings)),
            metrics.clone(),
        );

        Self {
            manager,
            players,
            pending,
            ledger,
            metrics,
        }
    }

    /// Register `names` for `game` in the global scope
    pub fn with_players(self, game: &str, names: &[&str]) -> Self {
        for name in names {
            self.manager
                .create_player(&Scope::Global, game, name)
                .unwrap();
        }
        self
    }

    pub fn history(&self, game: &str, name: &str) -> Vec<RatingEvent> {
        self.players
            .read_history(&PlayerKey::new(&Scope::Global, game, name))
            .unwrap()
    }

    pub fn rating(&self, game: &str, name: &str) -> f64 {
        self.history(game, name).last().unwrap().rating
    }
}
