//! Player store: per-player ordered rating histories
//!
//! A player record always starts with a seed event holding the game's starting
//! rating. Events are only ever appended, or removed from the end by undo.

use crate::error::{RatingError, Result};
use crate::storage::records::RecordFile;
use crate::storage::{path_component, scope_dir};
use crate::types::{PlayerKey, PlayerName, RatingEvent, Scope};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

/// Trait for player record storage
pub trait PlayerStore: Send + Sync {
    /// Create a player whose history holds only `seed`
    fn create_player(&self, key: &PlayerKey, seed: RatingEvent) -> Result<()>;

    /// Remove a player and their whole history
    fn delete_player(&self, key: &PlayerKey) -> Result<()>;

    fn exists(&self, key: &PlayerKey) -> Result<bool>;

    /// Names of all players of `game` in `scope`
    fn list_players(&self, scope: &Scope, game: &str) -> Result<BTreeSet<PlayerName>>;

    /// Games that have at least one player in `scope`
    fn list_games(&self, scope: &Scope) -> Result<BTreeSet<String>>;

    /// Full history in append order, seed first
    fn read_history(&self, key: &PlayerKey) -> Result<Vec<RatingEvent>>;

    fn append_event(&self, key: &PlayerKey, event: RatingEvent) -> Result<()>;

    /// Remove and return the newest event; the seed event cannot be removed
    fn remove_last_event(&self, key: &PlayerKey) -> Result<RatingEvent>;

    /// Newest event of a player
    fn last_event(&self, key: &PlayerKey) -> Result<RatingEvent> {
        self.read_history(key)?
            .pop()
            .ok_or_else(|| key.not_found())
    }
}

fn nothing_to_remove(key: &PlayerKey) -> RatingError {
    RatingError::NothingToRemove {
        game: key.game.clone(),
        name: key.name.clone(),
    }
}

fn already_exists(key: &PlayerKey) -> RatingError {
    RatingError::PlayerAlreadyExists {
        game: key.game.clone(),
        name: key.name.clone(),
    }
}

/// Player store keeping one `.jsonl` file per player under
/// `<scope>/players/<game>/<name>.jsonl`
#[derive(Debug)]
pub struct FilePlayerStore {
    base_dir: PathBuf,
    lock: Mutex<()>,
}

impl FilePlayerStore {
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir).map_err(|e| RatingError::io(&base_dir, e))?;
        Ok(Self {
            base_dir,
            lock: Mutex::new(()),
        })
    }

    fn game_dir(&self, scope: &Scope, game: &str) -> Result<PathBuf> {
        Ok(scope_dir(&self.base_dir, scope)?
            .join("players")
            .join(path_component("game", game)?))
    }

    fn record(&self, key: &PlayerKey) -> Result<RecordFile<RatingEvent>> {
        let name = path_component("player", &key.name)?;
        Ok(RecordFile::new(
            self.game_dir(&key.scope, &key.game)?
                .join(format!("{}.jsonl", name)),
        ))
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.lock
            .lock()
            .map_err(|_| RatingError::poisoned("player store"))
    }

    fn history(&self, key: &PlayerKey) -> Result<Vec<RatingEvent>> {
        self.record(key)?
            .read_existing()?
            .ok_or_else(|| key.not_found())
    }
}

impl PlayerStore for FilePlayerStore {
    fn create_player(&self, key: &PlayerKey, seed: RatingEvent) -> Result<()> {
        let _guard = self.guard()?;
        if !self.record(key)?.create_new(&seed)? {
            return Err(already_exists(key));
        }
        tracing::debug!("Created player record {}", key);
        Ok(())
    }

    fn delete_player(&self, key: &PlayerKey) -> Result<()> {
        let _guard = self.guard()?;
        if !self.record(key)?.remove()? {
            return Err(key.not_found());
        }
        tracing::debug!("Deleted player record {}", key);
        Ok(())
    }

    fn exists(&self, key: &PlayerKey) -> Result<bool> {
        Ok(self.record(key)?.exists())
    }

    fn list_players(&self, scope: &Scope, game: &str) -> Result<BTreeSet<PlayerName>> {
        let dir = self.game_dir(scope, game)?;
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeSet::new()),
            Err(e) => return Err(RatingError::io(&dir, e)),
        };

        let mut players = BTreeSet::new();
        for entry in entries {
            let entry = entry.map_err(|e| RatingError::io(&dir, e))?;
            let path = entry.path();

            if let Some(name) = path
                .file_name()
                .and_then(|s| s.to_str())
                .and_then(|s| s.strip_suffix(".jsonl"))
            {
                players.insert(name.to_string());
            }
        }

        Ok(players)
    }

    fn list_games(&self, scope: &Scope) -> Result<BTreeSet<String>> {
        let dir = scope_dir(&self.base_dir, scope)?.join("players");
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeSet::new()),
            Err(e) => return Err(RatingError::io(&dir, e)),
        };

        let mut games = BTreeSet::new();
        for entry in entries {
            let entry = entry.map_err(|e| RatingError::io(&dir, e))?;
            if entry.path().is_dir() {
                if let Some(game) = entry.file_name().to_str() {
                    games.insert(game.to_string());
                }
            }
        }

        Ok(games)
    }

    fn read_history(&self, key: &PlayerKey) -> Result<Vec<RatingEvent>> {
        self.history(key)
    }

    fn append_event(&self, key: &PlayerKey, event: RatingEvent) -> Result<()> {
        let _guard = self.guard()?;
        let record = self.record(key)?;
        if !record.exists() {
            return Err(key.not_found());
        }
        record.append(&event)
    }

    fn remove_last_event(&self, key: &PlayerKey) -> Result<RatingEvent> {
        let _guard = self.guard()?;
        let mut history = self.history(key)?;
        if history.len() <= 1 {
            return Err(nothing_to_remove(key));
        }

        let removed = history.pop().ok_or_else(|| nothing_to_remove(key))?;
        self.record(key)?.rewrite(&history)?;

        tracing::debug!("Removed last event of {}", key);
        Ok(removed)
    }
}

/// In-memory player store for tests and embedding
#[derive(Debug, Default)]
pub struct InMemoryPlayerStore {
    records: RwLock<HashMap<PlayerKey, Vec<RatingEvent>>>,
}

impl InMemoryPlayerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PlayerStore for InMemoryPlayerStore {
    fn create_player(&self, key: &PlayerKey, seed: RatingEvent) -> Result<()> {
        let mut records = self
            .records
            .write()
            .map_err(|_| RatingError::poisoned("player records"))?;

        if records.contains_key(key) {
            return Err(already_exists(key));
        }
        records.insert(key.clone(), vec![seed]);
        Ok(())
    }

    fn delete_player(&self, key: &PlayerKey) -> Result<()> {
        let mut records = self
            .records
            .write()
            .map_err(|_| RatingError::poisoned("player records"))?;

        records.remove(key).map(|_| ()).ok_or_else(|| key.not_found())
    }

    fn exists(&self, key: &PlayerKey) -> Result<bool> {
        let records = self
            .records
            .read()
            .map_err(|_| RatingError::poisoned("player records"))?;

        Ok(records.contains_key(key))
    }

    fn list_players(&self, scope: &Scope, game: &str) -> Result<BTreeSet<PlayerName>> {
        let records = self
            .records
            .read()
            .map_err(|_| RatingError::poisoned("player records"))?;

        Ok(records
            .keys()
            .filter(|key| &key.scope == scope && key.game == game)
            .map(|key| key.name.clone())
            .collect())
    }

    fn list_games(&self, scope: &Scope) -> Result<BTreeSet<String>> {
        let records = self
            .records
            .read()
            .map_err(|_| RatingError::poisoned("player records"))?;

        Ok(records
            .keys()
            .filter(|key| &key.scope == scope)
            .map(|key| key.game.clone())
            .collect())
    }

    fn read_history(&self, key: &PlayerKey) -> Result<Vec<RatingEvent>> {
        let records = self
            .records
            .read()
            .map_err(|_| RatingError::poisoned("player records"))?;

        records.get(key).cloned().ok_or_else(|| key.not_found())
    }

    fn append_event(&self, key: &PlayerKey, event: RatingEvent) -> Result<()> {
        let mut records = self
            .records
            .write()
            .map_err(|_| RatingError::poisoned("player records"))?;

        records
            .get_mut(key)
            .map(|history| history.push(event))
            .ok_or_else(|| key.not_found())
    }

    fn remove_last_event(&self, key: &PlayerKey) -> Result<RatingEvent> {
        let mut records = self
            .records
            .write()
            .map_err(|_| RatingError::poisoned("player records"))?;

        let history = records.get_mut(key).ok_or_else(|| key.not_found())?;
        if history.len() <= 1 {
            return Err(nothing_to_remove(key));
        }
        history.pop().ok_or_else(|| nothing_to_remove(key))
    }
}
