//! Approval manager coordinating the pending queue, player records and ledger
//!
//! Approving a result writes three stores in order: player A's new event,
//! player B's new event, then the ledger entry, and finally removes the pending
//! entry. Undo removes the two events and the ledger entry. If any step fails
//! the steps already taken are compensated in reverse, so a failed operation
//! leaves every store as it was.

use crate::approval::locks::ScopeLocks;
use crate::approval::report::{ApprovalReport, ApprovedResult, FailedApproval};
use crate::error::{RatingError, Result};
use crate::metrics::MetricsCollector;
use crate::rating::RatingCalculator;
use crate::storage::{PendingQueue, PlayerStore, ResultsLedger};
use crate::types::{
    GameResult, IndexedPending, LedgerEntry, PendingResult, PlayerKey, PlayerStanding,
    RatingEvent, Scope, Side,
};
use crate::utils::{current_timestamp, normalize_name};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Everything an approval will write, computed before the first write
#[derive(Debug, Clone)]
struct ApprovalPlan {
    player_a: PlayerKey,
    player_b: PlayerKey,
    event_a: RatingEvent,
    event_b: RatingEvent,
    entry: LedgerEntry,
}

/// Inverse of a write that already happened
#[derive(Debug)]
enum Compensation {
    RemoveEvent(PlayerKey),
    RestoreEvent(PlayerKey, RatingEvent),
    RemoveLedgerEntry,
    RestoreLedgerEntry(LedgerEntry),
}

/// The single writer of rating state
#[derive(Clone)]
pub struct ApprovalManager {
    players: Arc<dyn PlayerStore>,
    pending: Arc<dyn PendingQueue>,
    ledger: Arc<dyn ResultsLedger>,
    calculator: Arc<dyn RatingCalculator>,
    locks: Arc<ScopeLocks>,
    metrics_collector: Arc<MetricsCollector>,
}

impl ApprovalManager {
    pub fn new(
        players: Arc<dyn PlayerStore>,
        pending: Arc<dyn PendingQueue>,
        ledger: Arc<dyn ResultsLedger>,
        calculator: Arc<dyn RatingCalculator>,
    ) -> anyhow::Result<Self> {
        let metrics_collector = Arc::new(MetricsCollector::new()?);
        Ok(Self::with_metrics(
            players,
            pending,
            ledger,
            calculator,
            metrics_collector,
        ))
    }

    pub fn with_metrics(
        players: Arc<dyn PlayerStore>,
        pending: Arc<dyn PendingQueue>,
        ledger: Arc<dyn ResultsLedger>,
        calculator: Arc<dyn RatingCalculator>,
        metrics_collector: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            players,
            pending,
            ledger,
            calculator,
            locks: Arc::new(ScopeLocks::new()),
            metrics_collector,
        }
    }

    pub fn players(&self) -> &Arc<dyn PlayerStore> {
        &self.players
    }

    pub fn ledger(&self) -> &Arc<dyn ResultsLedger> {
        &self.ledger
    }

    pub fn calculator(&self) -> &Arc<dyn RatingCalculator> {
        &self.calculator
    }

    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics_collector
    }

    /// Register a player at the game's starting rating
    pub fn create_player(&self, scope: &Scope, game: &str, name: &str) -> Result<RatingEvent> {
        let game = normalize_name("game", game)?;
        let name = normalize_name("player", name)?;
        let key = PlayerKey::new(scope, &game, &name);

        self.locks.run(scope, || {
            let seed = RatingEvent::seed(
                self.calculator.starting_rating(&game),
                current_timestamp(),
            );
            self.players.create_player(&key, seed.clone())?;

            info!(
                "Created player {} at rating {:.1}",
                key, seed.rating
            );
            Ok(seed)
        })
    }

    /// Remove a player's record
    ///
    /// Ledger entries naming the player are kept; undoing one of them later
    /// fails with a mismatch.
    pub fn delete_player(&self, scope: &Scope, game: &str, name: &str) -> Result<()> {
        let game = normalize_name("game", game)?;
        let name = normalize_name("player", name)?;
        let key = PlayerKey::new(scope, &game, &name);

        self.locks.run(scope, || {
            self.players.delete_player(&key)?;
            info!("Deleted player {}", key);
            Ok(())
        })
    }

    /// Queue a result for approval and return its position
    pub fn submit_result(
        &self,
        scope: &Scope,
        game: &str,
        player_a: &str,
        player_b: &str,
        score: f64,
    ) -> Result<usize> {
        GameResult::from_score(score)?;
        let game = normalize_name("game", game)?;
        let player_a = normalize_name("player", player_a)?;
        let player_b = normalize_name("player", player_b)?;

        if player_a == player_b {
            return Err(RatingError::SamePlayer { name: player_a });
        }

        for name in [&player_a, &player_b] {
            if !self.players.exists(&PlayerKey::new(scope, &game, name))? {
                return Err(RatingError::InvalidPlayer {
                    game,
                    name: name.clone(),
                });
            }
        }

        let pending = PendingResult {
            game,
            player_a,
            player_b,
            result: score,
            submitted_at: current_timestamp(),
            note: None,
        };
        let index = self.pending.submit(scope, pending.clone())?;

        self.metrics_collector.record_submission(&pending.game);
        info!(
            "Queued {} result {} vs {} ({}) at position {} in {}",
            pending.game, pending.player_a, pending.player_b, pending.result, index, scope
        );

        Ok(index)
    }

    pub fn list_pending(&self, scope: &Scope) -> Result<Vec<IndexedPending>> {
        let pending = self.pending.list_indexed(scope)?;
        self.metrics_collector.set_pending(pending.len());
        Ok(pending)
    }

    /// Approve the pending result at `index`
    pub fn approve_one(&self, scope: &Scope, index: usize) -> Result<LedgerEntry> {
        self.locks.run(scope, || {
            let outcome = self.approve_locked(scope, index);
            self.refresh_pending_gauge(scope);
            outcome
        })
    }

    /// Approve every pending result in queue order
    ///
    /// Indices in the report refer to positions when the batch started.
    pub fn approve_all(&self, scope: &Scope) -> Result<ApprovalReport> {
        self.locks.run(scope, || {
            let snapshot = self.pending.list(scope)?;
            let mut report = ApprovalReport::default();
            let mut removed = 0;

            for (index, pending) in snapshot.into_iter().enumerate() {
                if report.aborted {
                    report.skipped.push(index);
                    continue;
                }

                // Approved entries leave the queue, shifting the ones behind them
                match self.approve_locked(scope, index - removed) {
                    Ok(entry) => {
                        removed += 1;
                        report.approved.push(ApprovedResult { index, entry });
                    }
                    Err(err) => {
                        report.aborted = !err.is_rejection();
                        report.failed.push(FailedApproval::new(index, pending, &err));
                    }
                }
            }

            if report.aborted {
                error!(
                    "Approve-all in {} stopped after a failure; {} entries left untouched",
                    scope,
                    report.skipped.len()
                );
            }
            info!(
                "Approve-all in {}: {} approved, {} failed, {} skipped",
                scope,
                report.approved.len(),
                report.failed.len(),
                report.skipped.len()
            );

            self.refresh_pending_gauge(scope);
            Ok(report)
        })
    }

    /// Discard the pending result at `index` without applying it
    pub fn delete_pending(&self, scope: &Scope, index: usize) -> Result<PendingResult> {
        self.locks.run(scope, || {
            let removed = self.pending.remove_at(scope, index)?;
            self.metrics_collector.record_discarded(1);
            info!(
                "Discarded pending {} result {} vs {} from {}",
                removed.game, removed.player_a, removed.player_b, scope
            );
            self.refresh_pending_gauge(scope);
            Ok(removed)
        })
    }

    /// Discard every pending result, returning how many were dropped
    pub fn clear_pending(&self, scope: &Scope) -> Result<usize> {
        self.locks.run(scope, || {
            let count = self.pending.clear(scope)?;
            self.metrics_collector.record_discarded(count);
            self.metrics_collector.set_pending(0);
            info!("Cleared {} pending results from {}", count, scope);
            Ok(count)
        })
    }

    /// Attach a note to a pending result; it becomes the ledger commentary on approval
    pub fn annotate_pending(&self, scope: &Scope, index: usize, note: Option<&str>) -> Result<()> {
        let note = note
            .map(str::trim)
            .filter(|note| !note.is_empty())
            .map(str::to_string);

        self.locks.run(scope, || {
            self.pending.annotate(scope, index, note)?;
            debug!("Annotated pending result {} in {}", index, scope);
            Ok(())
        })
    }

    /// Reverse the most recently approved result in `scope`
    pub fn undo_last(&self, scope: &Scope) -> Result<LedgerEntry> {
        self.locks.run(scope, || {
            let timer = self.metrics_collector.start_timer();

            let entry = self
                .ledger
                .peek_last(scope)?
                .ok_or_else(|| RatingError::NothingToUndo {
                    scope: scope.to_string(),
                })?;

            let key_a = PlayerKey::new(scope, &entry.game, &entry.player_a);
            let key_b = PlayerKey::new(scope, &entry.game, &entry.player_b);

            if let Err(err) = self
                .verify_last_event(&key_a, &entry.player_b, Side::First, &entry)
                .and_then(|_| self.verify_last_event(&key_b, &entry.player_a, Side::Second, &entry))
            {
                error!("Refusing to undo last result in {}: {}", scope, err);
                return Err(err);
            }

            let mut journal = Vec::new();
            let removed = match self.apply_undo(scope, &key_a, &key_b, &mut journal) {
                Ok(removed) => removed,
                Err(cause) => return Err(self.roll_back(scope, "undo", cause, journal)),
            };

            self.metrics_collector.record_undo(timer.stop());
            info!(
                "Undid {} result {} vs {} in {}: {} back to {:.1}, {} back to {:.1}",
                removed.game,
                removed.player_a,
                removed.player_b,
                scope,
                removed.player_a,
                removed.rating_a,
                removed.player_b,
                removed.rating_b
            );

            Ok(removed)
        })
    }

    /// Approve one entry; the caller holds the scope lock
    fn approve_locked(&self, scope: &Scope, index: usize) -> Result<LedgerEntry> {
        let timer = self.metrics_collector.start_timer();

        let outcome = self
            .pending
            .get(scope, index)
            .and_then(|pending| self.plan_approval(scope, &pending))
            .and_then(|plan| self.commit_approval(scope, index, plan));

        match &outcome {
            Ok(entry) => {
                self.metrics_collector
                    .record_approval(&entry.game, timer.stop());
                info!(
                    "Approved {} result in {}: {} {:.1} -> {:.1}, {} {:.1} -> {:.1}",
                    entry.game,
                    scope,
                    entry.player_a,
                    entry.rating_a,
                    entry.new_rating_a(),
                    entry.player_b,
                    entry.rating_b,
                    entry.new_rating_b()
                );
            }
            Err(err) => {
                self.metrics_collector.record_approval_failure(err.kind());
                if err.is_rejection() {
                    warn!("Rejected pending result {} in {}: {}", index, scope, err);
                } else {
                    error!("Failed to approve pending result {} in {}: {}", index, scope, err);
                }
            }
        }

        outcome
    }

    /// Validate a pending result and compute everything it will write
    fn plan_approval(&self, scope: &Scope, pending: &PendingResult) -> Result<ApprovalPlan> {
        let result = GameResult::from_score(pending.result)?;

        if pending.player_a == pending.player_b {
            return Err(RatingError::SamePlayer {
                name: pending.player_a.clone(),
            });
        }

        let player_a = PlayerKey::new(scope, &pending.game, &pending.player_a);
        let player_b = PlayerKey::new(scope, &pending.game, &pending.player_b);
        let standing_a = self.current_standing(&player_a)?;
        let standing_b = self.current_standing(&player_b)?;

        let update = self
            .calculator
            .rate(&pending.game, standing_a, standing_b, result);
        let approved_at = current_timestamp();

        debug!(
            "Rating {} vs {}: expected {:.3}/{:.3}, k {}/{}, delta {:+.2}/{:+.2}",
            pending.player_a,
            pending.player_b,
            update.expected_a,
            update.expected_b,
            update.k_factor_a,
            update.k_factor_b,
            update.delta_a,
            update.delta_b
        );

        let event_a = RatingEvent {
            rating: standing_a.rating + update.delta_a,
            opponent: Some(pending.player_b.clone()),
            result: Some(result),
            side: Some(Side::First),
            timestamp: approved_at,
            games_played: standing_a.games_played + 1,
        };
        let event_b = RatingEvent {
            rating: standing_b.rating + update.delta_b,
            opponent: Some(pending.player_a.clone()),
            result: Some(result.reversed()),
            side: Some(Side::Second),
            timestamp: approved_at,
            games_played: standing_b.games_played + 1,
        };
        let entry = LedgerEntry {
            game: pending.game.clone(),
            player_a: pending.player_a.clone(),
            player_b: pending.player_b.clone(),
            result,
            rating_a: standing_a.rating,
            rating_b: standing_b.rating,
            delta_a: update.delta_a,
            delta_b: update.delta_b,
            submitted_at: pending.submitted_at,
            approved_at,
            commentary: pending.note.clone(),
        };

        Ok(ApprovalPlan {
            player_a,
            player_b,
            event_a,
            event_b,
            entry,
        })
    }

    fn current_standing(&self, key: &PlayerKey) -> Result<PlayerStanding> {
        match self.players.last_event(key) {
            Ok(event) => Ok(PlayerStanding::from(&event)),
            Err(RatingError::PlayerNotFound { game, name }) => {
                Err(RatingError::InvalidPlayer { game, name })
            }
            Err(err) => Err(err),
        }
    }

    fn commit_approval(
        &self,
        scope: &Scope,
        index: usize,
        plan: ApprovalPlan,
    ) -> Result<LedgerEntry> {
        let mut journal = Vec::new();

        match self.apply_approval(scope, index, &plan, &mut journal) {
            Ok(()) => Ok(plan.entry),
            Err(cause) => Err(self.roll_back(scope, "approval", cause, journal)),
        }
    }

    fn apply_approval(
        &self,
        scope: &Scope,
        index: usize,
        plan: &ApprovalPlan,
        journal: &mut Vec<Compensation>,
    ) -> Result<()> {
        self.players
            .append_event(&plan.player_a, plan.event_a.clone())?;
        journal.push(Compensation::RemoveEvent(plan.player_a.clone()));

        self.players
            .append_event(&plan.player_b, plan.event_b.clone())?;
        journal.push(Compensation::RemoveEvent(plan.player_b.clone()));

        self.ledger.append(scope, plan.entry.clone())?;
        journal.push(Compensation::RemoveLedgerEntry);

        self.pending.remove_at(scope, index)?;
        Ok(())
    }

    fn verify_last_event(
        &self,
        key: &PlayerKey,
        opponent: &str,
        side: Side,
        entry: &LedgerEntry,
    ) -> Result<()> {
        let mismatch = |reason: String| RatingError::Mismatch {
            player: key.name.clone(),
            reason,
        };

        let history = match self.players.read_history(key) {
            Ok(history) => history,
            Err(RatingError::PlayerNotFound { .. }) => {
                return Err(mismatch("player record no longer exists".to_string()))
            }
            Err(err) => return Err(err),
        };

        let last = match history.last() {
            Some(last) if history.len() > 1 && !last.is_seed() => last,
            _ => return Err(mismatch("no game entries recorded".to_string())),
        };

        if last.opponent.as_deref() != Some(opponent) {
            return Err(mismatch(format!(
                "last game was against {}, expected {}",
                last.opponent.as_deref().unwrap_or("nobody"),
                opponent
            )));
        }
        if last.side != Some(side) {
            return Err(mismatch(format!(
                "last game was played on side {:?}, expected {:?}",
                last.side, side
            )));
        }
        if last.timestamp != entry.approved_at {
            return Err(mismatch(format!(
                "last game was recorded at {}, result was approved at {}",
                last.timestamp, entry.approved_at
            )));
        }

        Ok(())
    }

    fn apply_undo(
        &self,
        scope: &Scope,
        key_a: &PlayerKey,
        key_b: &PlayerKey,
        journal: &mut Vec<Compensation>,
    ) -> Result<LedgerEntry> {
        let removed_a = self.players.remove_last_event(key_a)?;
        journal.push(Compensation::RestoreEvent(key_a.clone(), removed_a));

        let removed_b = self.players.remove_last_event(key_b)?;
        journal.push(Compensation::RestoreEvent(key_b.clone(), removed_b));

        let removed = self.ledger.remove_last(scope)?;
        journal.push(Compensation::RestoreLedgerEntry(removed.clone()));

        Ok(removed)
    }

    /// Undo the journaled writes newest first and return the error to report
    fn roll_back(
        &self,
        scope: &Scope,
        operation: &'static str,
        cause: RatingError,
        journal: Vec<Compensation>,
    ) -> RatingError {
        let mut failures = Vec::new();

        for step in journal.into_iter().rev() {
            let outcome = match &step {
                Compensation::RemoveEvent(key) => {
                    self.players.remove_last_event(key).map(|_| ())
                }
                Compensation::RestoreEvent(key, event) => {
                    self.players.append_event(key, event.clone())
                }
                Compensation::RemoveLedgerEntry => self.ledger.remove_last(scope).map(|_| ()),
                Compensation::RestoreLedgerEntry(entry) => {
                    self.ledger.append(scope, entry.clone())
                }
            };

            if let Err(err) = outcome {
                error!("Rollback step {:?} failed in {}: {}", step, scope, err);
                failures.push(err.to_string());
            }
        }

        if failures.is_empty() {
            warn!("Rolled back {} in {} after: {}", operation, scope, cause);
            cause
        } else {
            error!(
                "Rollback of {} in {} incomplete, stores may disagree: {}",
                operation, scope, cause
            );
            RatingError::RollbackFailed {
                operation,
                cause: cause.to_string(),
                rollback: failures.join("; "),
            }
        }
    }

    fn refresh_pending_gauge(&self, scope: &Scope) {
        match self.pending.list(scope) {
            Ok(pending) => self.metrics_collector.set_pending(pending.len()),
            Err(err) => debug!("Could not count pending results in {}: {}", scope, err),
        }
    }
}
