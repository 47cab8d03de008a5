//! Habitforge Jobs - operational entry point
//!
//! Runs the scheduled and on-demand maintenance work: the weekly league
//! update, offline-queue drains, and leaderboard inspection.

use anyhow::{bail, Result};
use habitforge_core::{League, Timeframe};
use habitforge_engine::{get_leaderboard, process_queued_actions, run_weekly_league_update};
use habitforge_persistence::Database;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "habitforge_jobs=info,habitforge_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    let db_path = std::env::var("HABITFORGE_DB").unwrap_or_else(|_| "habitforge.db".to_string());
    tracing::info!("Opening database at {}", db_path);
    let db = Database::connect(&PathBuf::from(&db_path)).await?;

    match args.first().map(String::as_str) {
        Some("league-update") => {
            let summary = run_weekly_league_update(&db).await?;
            if summary.already_ran {
                println!(
                    "League update already ran for the period starting {}",
                    summary.period_start
                );
            } else {
                println!(
                    "League update for {}..{}: {} ranked, {} promoted, {} relegated",
                    summary.period_start,
                    summary.period_end,
                    summary.total_ranked,
                    summary.promoted,
                    summary.relegated
                );
            }
        }
        Some("drain") => {
            let Some(user_id) = args.get(1) else {
                bail!("usage: habitforge-jobs drain <user_id>");
            };
            let summary = process_queued_actions(&db, user_id).await?;
            println!(
                "Drained {} actions for {}: {} ok, {} dropped, {} remaining",
                summary.attempted, user_id, summary.succeeded, summary.failed, summary.remaining
            );
        }
        Some("leaderboard") => {
            let league = match args.get(1) {
                Some(raw) => match raw.as_str() {
                    "bronze" => Some(League::Bronze),
                    "silver" => Some(League::Silver),
                    "gold" => Some(League::Gold),
                    "diamond" => Some(League::Diamond),
                    other => bail!("unknown league: {}", other),
                },
                None => None,
            };
            let board = get_leaderboard(&db, league, Timeframe::Weekly, 10).await?;
            for (i, entry) in board.iter().enumerate() {
                println!(
                    "{:>2}. [{}] {} - {} XP (level {}, streak {})",
                    i + 1,
                    entry.league,
                    entry.name,
                    entry.score,
                    entry.level,
                    entry.streak
                );
            }
        }
        _ => {
            bail!("usage: habitforge-jobs <league-update | drain <user_id> | leaderboard [league]>");
        }
    }

    Ok(())
}
