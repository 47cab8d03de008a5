//! League ranking engine - weekly batch update and leaderboard reads

pub mod ranking;

pub use ranking::rank_and_reassign;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use habitforge_core::{
    Error, LeaderboardEntry, League, LeagueUpdateSummary, Result, Timeframe,
};
use habitforge_persistence::sqlite::{snapshots, users};
use habitforge_persistence::Database;
use tracing::{info, warn};

/// Monday of the ISO week containing `now` - the period key that makes the
/// weekly update idempotent by period
pub fn period_start_for(now: DateTime<Utc>) -> NaiveDate {
    let today = now.date_naive();
    today - Duration::days(today.weekday().num_days_from_monday() as i64)
}

/// Run the weekly league update: rank every league, promote and relegate,
/// reset weekly counters, snapshot the result.
///
/// Idempotent by period: a second invocation in the same ISO week (or a
/// concurrent duplicate) mutates nothing and reports `already_ran`. All
/// mutations and the snapshot commit in one transaction - the snapshot
/// exists only if the full update landed.
pub async fn run_weekly_league_update(db: &Database) -> Result<LeagueUpdateSummary> {
    run_weekly_league_update_at(db, Utc::now()).await
}

/// `run_weekly_league_update` against an explicit clock
pub async fn run_weekly_league_update_at(
    db: &Database,
    now: DateTime<Utc>,
) -> Result<LeagueUpdateSummary> {
    let period_start = period_start_for(now);
    let period_end = period_start + Duration::days(6);

    if snapshots::period_exists(db.pool(), period_start).await? {
        warn!(
            "Weekly league update already ran for period starting {}",
            period_start
        );
        return Ok(already_ran_summary(period_start, period_end));
    }

    let mut tx = db
        .pool()
        .begin()
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

    let members = users::list_league_members(&mut *tx).await?;
    let decisions = rank_and_reassign(&members);

    for decision in &decisions {
        users::apply_rank_decision(
            &mut *tx,
            &decision.user_id,
            decision.new_league,
            decision.league_rank as i64,
        )
        .await?;
    }

    let inserted =
        snapshots::insert_snapshot(&mut *tx, period_start, period_end, &decisions).await?;
    if !inserted {
        // A concurrent run owns this period; ours must not double-promote
        tx.rollback()
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        warn!(
            "Lost the period snapshot race for {}, rolled back",
            period_start
        );
        return Ok(already_ran_summary(period_start, period_end));
    }

    tx.commit()
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

    let promoted = decisions.iter().filter(|d| d.promoted()).count();
    let relegated = decisions.iter().filter(|d| d.relegated()).count();
    info!(
        "Weekly league update for {}: {} ranked, {} promoted, {} relegated",
        period_start,
        decisions.len(),
        promoted,
        relegated
    );

    Ok(LeagueUpdateSummary {
        period_start,
        period_end,
        total_ranked: decisions.len(),
        promoted,
        relegated,
        rankings: decisions,
        already_ran: false,
    })
}

fn already_ran_summary(period_start: NaiveDate, period_end: NaiveDate) -> LeagueUpdateSummary {
    LeagueUpdateSummary {
        period_start,
        period_end,
        total_ranked: 0,
        promoted: 0,
        relegated: 0,
        rankings: Vec::new(),
        already_ran: true,
    }
}

/// Leaderboard read: members ordered by league first, then score within
/// the requested timeframe. A lower-league member never outranks a
/// higher-league one, whatever their raw XP.
pub async fn get_leaderboard(
    db: &Database,
    league: Option<League>,
    timeframe: Timeframe,
    limit: u32,
) -> Result<Vec<LeaderboardEntry>> {
    users::leaderboard(db.pool(), league, timeframe, limit).await
}
