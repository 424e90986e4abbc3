//! Concurrency tests for submissions, approvals and undo
//!
//! Many threads work on the same scope and on separate scopes; afterwards the
//! ledger and the player records must still agree with each other.

use elo_ledger::config::{GameConfig, GameSettings};
use elo_ledger::metrics::MetricsCollector;
use elo_ledger::service::RatingService;
use elo_ledger::types::Scope;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

const PLAYERS: [&str; 4] = ["dean", "eid", "sam", "zoe"];

/// Constant K so total rating is conserved by every approval
fn flat_settings() -> GameSettings {
    let mut settings = GameSettings::default();
    settings.games.insert(
        "chess".to_string(),
        GameConfig {
            decay: None,
            ..GameConfig::with_k_factor(32.0)
        },
    );
    settings
}

fn register(service: &RatingService, scope: &Scope) {
    for name in PLAYERS {
        service.create_player(scope, "chess", name).unwrap();
    }
}

fn assert_consistent(service: &RatingService, scope: &Scope, expected_games: usize) {
    let ledger = service.recent_results(scope, usize::MAX, 0).unwrap();
    assert_eq!(ledger.len(), expected_games);

    let players = service.list_players(scope, "chess").unwrap();
    let total_games: u32 = players.iter().map(|p| p.games_played).sum();
    assert_eq!(total_games as usize, expected_games * 2);

    let total_rating: f64 = players.iter().map(|p| p.rating).sum();
    assert!((total_rating - 1200.0 * PLAYERS.len() as f64).abs() < 1e-6);

    for player in &players {
        let appearances = ledger
            .iter()
            .filter(|e| e.player_a == player.name || e.player_b == player.name)
            .count();
        assert_eq!(player.games_played as usize, appearances);
    }
}

#[test]
fn test_concurrent_submit_and_approve_same_scope() {
    let service = RatingService::in_memory(flat_settings()).unwrap();
    let scope = Scope::Global;
    register(&service, &scope);

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let service = service.clone();
            let scope = scope.clone();
            thread::spawn(move || {
                for round in 0..10 {
                    let a = PLAYERS[(worker + round) % PLAYERS.len()];
                    let b = PLAYERS[(worker + round + 1) % PLAYERS.len()];
                    let score = [0.0, 0.5, 1.0][round % 3];
                    service.submit_result(&scope, "chess", a, b, score).unwrap();

                    if round % 3 == 0 {
                        let report = service.approve_all(&scope).unwrap();
                        assert!(report.failed.is_empty());
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let report = service.approve_all(&scope).unwrap();
    assert!(report.is_complete());
    assert!(service.list_pending(&scope).unwrap().is_empty());

    assert_consistent(&service, &scope, 80);
}

#[test]
fn test_concurrent_approve_and_undo() {
    let service = RatingService::in_memory(flat_settings()).unwrap();
    let scope = Scope::Global;
    register(&service, &scope);

    for i in 0..40 {
        let a = PLAYERS[i % PLAYERS.len()];
        let b = PLAYERS[(i + 2) % PLAYERS.len()];
        service.submit_result(&scope, "chess", a, b, 1.0).unwrap();
    }

    let approvers: Vec<_> = (0..4)
        .map(|_| {
            let service = service.clone();
            let scope = scope.clone();
            thread::spawn(move || {
                let mut approved: usize = 0;
                for _ in 0..10 {
                    if service.approve_one(&scope, 0).is_ok() {
                        approved += 1;
                    }
                }
                approved
            })
        })
        .collect();

    let undoers: Vec<_> = (0..2)
        .map(|_| {
            let service = service.clone();
            let scope = scope.clone();
            thread::spawn(move || {
                let mut undone: usize = 0;
                for _ in 0..5 {
                    if service.undo_last(&scope).is_ok() {
                        undone += 1;
                    }
                    thread::yield_now();
                }
                undone
            })
        })
        .collect();

    let approved: usize = approvers.into_iter().map(|h| h.join().unwrap()).sum();
    let undone: usize = undoers.into_iter().map(|h| h.join().unwrap()).sum();

    assert_eq!(approved, 40);
    assert_consistent(&service, &scope, approved - undone);
}

#[test]
fn test_scopes_progress_independently_on_disk() {
    let dir = TempDir::new().unwrap();
    let service = RatingService::open(
        dir.path(),
        flat_settings(),
        Arc::new(MetricsCollector::new().unwrap()),
    )
    .unwrap();

    let scopes: Vec<Scope> = ["acme", "globex", "initech"]
        .into_iter()
        .map(|team| RatingService::scope(Some(team)).unwrap())
        .collect();
    for scope in &scopes {
        register(&service, scope);
    }

    let handles: Vec<_> = scopes
        .iter()
        .cloned()
        .map(|scope| {
            let service = service.clone();
            thread::spawn(move || {
                for round in 0..6 {
                    let a = PLAYERS[round % PLAYERS.len()];
                    let b = PLAYERS[(round + 1) % PLAYERS.len()];
                    service.submit_result(&scope, "chess", a, b, 1.0).unwrap();
                }
                service.approve_all(&scope).unwrap()
            })
        })
        .collect();

    for handle in handles {
        let report = handle.join().unwrap();
        assert_eq!(report.approved.len(), 6);
    }

    for scope in &scopes {
        assert_consistent(&service, scope, 6);
    }
    assert!(service.list_players(&Scope::Global, "chess").unwrap().is_empty());
}
