//! Command line entry point for the Elo rating ledger
//!
//! Every subcommand opens the file-backed stores under the configured data
//! directory, runs one service operation and prints its outcome as JSON.

use anyhow::Result;
use clap::{Parser, Subcommand};
use elo_ledger::config::AppConfig;
use elo_ledger::service::RatingService;
use elo_ledger::Scope;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, info};

/// Elo Ledger - ratings, pending results and approvals for casual games
#[derive(Parser)]
#[command(
    name = "elo-ledger",
    version,
    about = "Track Elo ratings for two-player games with admin-approved results",
    long_about = "Elo Ledger keeps per-game Elo ratings for players. Results are submitted to a \
                 pending queue, applied to both players when an admin approves them, recorded \
                 in an append-only ledger and can be reversed with undo."
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Data directory override
    #[arg(long, value_name = "DIR", help = "Override the data directory")]
    data_dir: Option<PathBuf>,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// Enable debug mode
    #[arg(short, long, help = "Enable debug mode with verbose logging")]
    debug: bool,

    /// Team scope; omitted means the global scope
    #[arg(short, long, value_name = "TEAM", global = true)]
    team: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Manage players of a game
    Players {
        #[command(subcommand)]
        action: PlayersAction,
    },
    /// Show a player's rating history
    History { game: String, player: String },
    /// Submit a result for approval (1 = A won, 0.5 = draw, 0 = B won)
    Submit {
        game: String,
        player_a: String,
        player_b: String,
        #[arg(allow_negative_numbers = true)]
        result: f64,
    },
    /// Work with the pending queue
    Pending {
        #[command(subcommand)]
        action: PendingAction,
    },
    /// Reverse the most recently approved result
    Undo,
    /// Expected score of every player against every other
    Matrix { game: String },
    /// Players ranked by rating
    Leaderboard {
        game: String,
        /// Players to leave off the board
        #[arg(long = "exclude", value_name = "PLAYER")]
        excluded: Vec<String>,
    },
    /// Recently approved results, newest first
    Recent {
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
    /// Print the metrics of this run in Prometheus text format
    Metrics,
}

#[derive(Subcommand)]
enum PlayersAction {
    List { game: String },
    Add { game: String, player: String },
    Delete { game: String, player: String },
}

#[derive(Subcommand)]
enum PendingAction {
    List,
    Approve { index: usize },
    ApproveAll,
    Delete { index: usize },
    Clear,
    /// Attach a note to a pending result; omit the text to remove it
    Note { index: usize, text: Option<String> },
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Load and merge configuration from file or environment and CLI arguments
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()?
    };

    // Apply CLI overrides
    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }

    if args.debug {
        config.service.log_level = "debug".to_string();
    }

    if let Some(data_dir) = &args.data_dir {
        config.storage.data_dir = data_dir.clone();
    }

    elo_ledger::config::validate_config(&config)?;
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(service: &RatingService, scope: &Scope, command: Command) -> Result<()> {
    match command {
        Command::Players { action } => match action {
            PlayersAction::List { game } => print_json(&service.list_players(scope, &game)?),
            PlayersAction::Add { game, player } => {
                print_json(&service.create_player(scope, &game, &player)?)
            }
            PlayersAction::Delete { game, player } => {
                service.delete_player(scope, &game, &player)?;
                print_json(&serde_json::json!({ "deleted": player }))
            }
        },
        Command::History { game, player } => {
            print_json(&service.player_history(scope, &game, &player)?)
        }
        Command::Submit {
            game,
            player_a,
            player_b,
            result,
        } => {
            let index = service.submit_result(scope, &game, &player_a, &player_b, result)?;
            print_json(&serde_json::json!({ "index": index }))
        }
        Command::Pending { action } => match action {
            PendingAction::List => print_json(&service.list_pending(scope)?),
            PendingAction::Approve { index } => print_json(&service.approve_one(scope, index)?),
            PendingAction::ApproveAll => {
                let report = service.approve_all(scope)?;
                print_json(&report)?;
                if report.aborted {
                    anyhow::bail!("Approve-all stopped early; see the failed entries above");
                }
                Ok(())
            }
            PendingAction::Delete { index } => print_json(&service.delete_pending(scope, index)?),
            PendingAction::Clear => {
                let cleared = service.clear_pending(scope)?;
                print_json(&serde_json::json!({ "cleared": cleared }))
            }
            PendingAction::Note { index, text } => {
                service.annotate_pending(scope, index, text.as_deref())?;
                print_json(&service.list_pending(scope)?)
            }
        },
        Command::Undo => print_json(&service.undo_last(scope)?),
        Command::Matrix { game } => print_json(&service.probability_matrix(scope, &game)?),
        Command::Leaderboard { game, excluded } => {
            let excluded: Vec<&str> = excluded.iter().map(String::as_str).collect();
            print_json(&service.leaderboard(scope, &game, &excluded)?)
        }
        Command::Recent { limit, offset } => {
            print_json(&service.recent_results(scope, limit, offset)?)
        }
        Command::Metrics => {
            print!("{}", service.metrics_text()?);
            Ok(())
        }
    }
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });

    // Initialize logging early (before any other operations)
    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    info!(
        "{} {} using {}",
        config.service.name,
        elo_ledger::VERSION,
        config.storage.data_dir.display()
    );

    let service = RatingService::new(&config)?;
    let scope = RatingService::scope(args.team.as_deref())?;

    if let Err(e) = run(&service, &scope, args.command) {
        error!("Command failed: {}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
