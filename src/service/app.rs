//! Rating service facade
//!
//! [`RatingService`] wires the file-backed stores, the rating model and the
//! approval manager together from an [`AppConfig`], and adds the read-only
//! views (player lists, probability matrix, leaderboard, recent results) an
//! outer layer needs.

use crate::approval::{ApprovalManager, ApprovalReport};
use crate::config::{AppConfig, GameSettings};
use crate::error::Result;
use crate::metrics::MetricsCollector;
use crate::rating::EloRatingCalculator;
use crate::storage::{
    FilePendingQueue, FilePlayerStore, FileResultsLedger, InMemoryPendingQueue,
    InMemoryPlayerStore, InMemoryResultsLedger,
};
use crate::types::{
    IndexedPending, LedgerEntry, PendingResult, PlayerKey, PlayerName, PlayerStanding,
    RatingEvent, Scope,
};
use crate::utils::{display_name, normalize_name};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Expected score of the row player against the column player
pub type ProbabilityMatrix = BTreeMap<PlayerName, BTreeMap<PlayerName, f64>>;

/// Current standing of one player
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerSummary {
    pub name: PlayerName,
    pub display_name: String,
    pub rating: f64,
    pub games_played: u32,
}

/// One row of a game's leaderboard
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    /// 1-based position
    pub rank: usize,
    pub player: PlayerName,
    pub display_name: String,
    pub rating: f64,
    pub games_played: u32,
    pub has_played: bool,
}

/// Entry point for everything an outer layer (CLI, HTTP handlers) does
#[derive(Clone)]
pub struct RatingService {
    manager: ApprovalManager,
}

impl RatingService {
    /// Open the file-backed stores under the configured data directory
    pub fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let data_dir = config.storage.require_data_dir()?;
        let metrics_collector = Arc::new(MetricsCollector::new()?);
        Self::open(
            data_dir,
            config.games.clone(),
            metrics_collector,
        )
    }

    /// Open file-backed stores under `data_dir`
    pub fn open(
        data_dir: &Path,
        games: GameSettings,
        metrics_collector: Arc<MetricsCollector>,
    ) -> anyhow::Result<Self> {
        let manager = ApprovalManager::with_metrics(
            Arc::new(FilePlayerStore::new(data_dir)?),
            Arc::new(FilePendingQueue::new(data_dir)?),
            Arc::new(FileResultsLedger::new(data_dir)?),
            Arc::new(EloRatingCalculator::new(games)),
            metrics_collector,
        );

        info!("Rating service using data directory {}", data_dir.display());
        Ok(Self::with_manager(manager))
    }

    /// Service backed entirely by memory
    pub fn in_memory(games: GameSettings) -> anyhow::Result<Self> {
        Ok(Self::with_manager(ApprovalManager::new(
            Arc::new(InMemoryPlayerStore::new()),
            Arc::new(InMemoryPendingQueue::new()),
            Arc::new(InMemoryResultsLedger::new()),
            Arc::new(EloRatingCalculator::new(games)),
        )?))
    }

    pub fn with_manager(manager: ApprovalManager) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &ApprovalManager {
        &self.manager
    }

    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        self.manager.metrics()
    }

    /// Scope for an optional team name; `None` is the global scope
    pub fn scope(team: Option<&str>) -> Result<Scope> {
        match team {
            Some(team) => Scope::team(team),
            None => Ok(Scope::Global),
        }
    }

    /// Games with at least one registered player
    pub fn list_games(&self, scope: &Scope) -> Result<BTreeSet<String>> {
        self.manager.players().list_games(scope)
    }

    /// Players of a game with their current standing, by name
    pub fn list_players(&self, scope: &Scope, game: &str) -> Result<Vec<PlayerSummary>> {
        let game = normalize_name("game", game)?;

        Ok(self
            .standings(scope, &game)?
            .into_iter()
            .map(|(name, standing)| PlayerSummary {
                display_name: display_name(&name),
                name,
                rating: standing.rating,
                games_played: standing.games_played,
            })
            .collect())
    }

    pub fn create_player(&self, scope: &Scope, game: &str, name: &str) -> Result<RatingEvent> {
        self.manager.create_player(scope, game, name)
    }

    pub fn delete_player(&self, scope: &Scope, game: &str, name: &str) -> Result<()> {
        self.manager.delete_player(scope, game, name)
    }

    /// Every rating event of a player, oldest first
    pub fn player_history(&self, scope: &Scope, game: &str, name: &str) -> Result<Vec<RatingEvent>> {
        let game = normalize_name("game", game)?;
        let name = normalize_name("player", name)?;

        self.manager
            .players()
            .read_history(&PlayerKey::new(scope, &game, &name))
    }

    pub fn submit_result(
        &self,
        scope: &Scope,
        game: &str,
        player_a: &str,
        player_b: &str,
        score: f64,
    ) -> Result<usize> {
        self.manager
            .submit_result(scope, game, player_a, player_b, score)
    }

    pub fn list_pending(&self, scope: &Scope) -> Result<Vec<IndexedPending>> {
        self.manager.list_pending(scope)
    }

    pub fn approve_all(&self, scope: &Scope) -> Result<ApprovalReport> {
        self.manager.approve_all(scope)
    }

    pub fn approve_one(&self, scope: &Scope, index: usize) -> Result<LedgerEntry> {
        self.manager.approve_one(scope, index)
    }

    pub fn delete_pending(&self, scope: &Scope, index: usize) -> Result<PendingResult> {
        self.manager.delete_pending(scope, index)
    }

    pub fn clear_pending(&self, scope: &Scope) -> Result<usize> {
        self.manager.clear_pending(scope)
    }

    pub fn annotate_pending(&self, scope: &Scope, index: usize, note: Option<&str>) -> Result<()> {
        self.manager.annotate_pending(scope, index, note)
    }

    pub fn undo_last(&self, scope: &Scope) -> Result<LedgerEntry> {
        self.manager.undo_last(scope)
    }

    /// Pairwise expected scores from current ratings; the diagonal is left out
    pub fn probability_matrix(&self, scope: &Scope, game: &str) -> Result<ProbabilityMatrix> {
        let game = normalize_name("game", game)?;
        let standings = self.standings(scope, &game)?;
        let calculator = self.manager.calculator();

        let mut matrix = ProbabilityMatrix::new();
        for (row, row_standing) in &standings {
            let cells = matrix.entry(row.clone()).or_default();
            for (column, column_standing) in &standings {
                if row == column {
                    continue;
                }
                cells.insert(
                    column.clone(),
                    calculator.expected_score(row_standing.rating, column_standing.rating),
                );
            }
        }

        Ok(matrix)
    }

    /// Most recent approved results, newest first
    pub fn recent_results(
        &self,
        scope: &Scope,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LedgerEntry>> {
        self.manager.ledger().list_recent(scope, limit, offset)
    }

    /// Players ranked by rating, those who have played a game ahead of those who
    /// have not; names in `excluded` are left off
    pub fn leaderboard(
        &self,
        scope: &Scope,
        game: &str,
        excluded: &[&str],
    ) -> Result<Vec<LeaderboardEntry>> {
        let game = normalize_name("game", game)?;
        let excluded: BTreeSet<String> = excluded
            .iter()
            .map(|name| name.trim().to_lowercase())
            .collect();

        let mut standings: Vec<_> = self
            .standings(scope, &game)?
            .into_iter()
            .filter(|(name, _)| !excluded.contains(name))
            .collect();

        standings.sort_by(|(name_a, a), (name_b, b)| {
            (b.games_played > 0)
                .cmp(&(a.games_played > 0))
                .then_with(|| b.rating.total_cmp(&a.rating))
                .then_with(|| name_a.cmp(name_b))
        });

        Ok(standings
            .into_iter()
            .enumerate()
            .map(|(position, (name, standing))| LeaderboardEntry {
                rank: position + 1,
                display_name: display_name(&name),
                player: name,
                rating: standing.rating,
                games_played: standing.games_played,
                has_played: standing.games_played > 0,
            })
            .collect())
    }

    /// Prometheus text exposition of the service metrics
    pub fn metrics_text(&self) -> anyhow::Result<String> {
        self.metrics().export_text()
    }

    fn standings(&self, scope: &Scope, game: &str) -> Result<Vec<(PlayerName, PlayerStanding)>> {
        let players = self.manager.players();

        players
            .list_players(scope, game)?
            .into_iter()
            .map(|name| {
                let event = players.last_event(&PlayerKey::new(scope, game, &name))?;
                Ok((name, PlayerStanding::from(&event)))
            })
            .collect()
    }
}
