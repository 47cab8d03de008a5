//! Weekly league snapshot persistence

use chrono::{DateTime, NaiveDate, Utc};
use habitforge_core::{Error, LeagueSnapshot, RankDecision, Result};
use sqlx::{SqliteConnection, SqlitePool};

#[derive(Debug, sqlx::FromRow)]
struct SnapshotRow {
    id: i64,
    period_start: NaiveDate,
    period_end: NaiveDate,
    rankings: String,
    created_at: Option<DateTime<Utc>>,
}

impl SnapshotRow {
    fn into_snapshot(self) -> Result<LeagueSnapshot> {
        let rankings: Vec<RankDecision> = serde_json::from_str(&self.rankings)?;
        Ok(LeagueSnapshot {
            id: self.id,
            period_start: self.period_start,
            period_end: self.period_end,
            rankings,
            created_at: self.created_at,
        })
    }
}

/// Whether a snapshot already exists for the period (the weekly job's
/// re-invocation guard)
pub async fn period_exists(pool: &SqlitePool, period_start: NaiveDate) -> Result<bool> {
    let row: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM league_snapshots WHERE period_start = ?")
            .bind(period_start)
            .fetch_one(pool)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;

    Ok(row.0 > 0)
}

/// Insert the period snapshot; false when the period is already
/// snapshotted. The UNIQUE constraint on `period_start` makes this the
/// last-line guard against a concurrent duplicate run.
pub async fn insert_snapshot(
    conn: &mut SqliteConnection,
    period_start: NaiveDate,
    period_end: NaiveDate,
    rankings: &[RankDecision],
) -> Result<bool> {
    let rankings_json = serde_json::to_string(rankings)?;

    let result = sqlx::query(
        r#"
        INSERT INTO league_snapshots (period_start, period_end, rankings)
        VALUES (?, ?, ?)
        ON CONFLICT(period_start) DO NOTHING
        "#,
    )
    .bind(period_start)
    .bind(period_end)
    .bind(rankings_json)
    .execute(&mut *conn)
    .await
    .map_err(|e| Error::Database(e.to_string()))?;

    Ok(result.rows_affected() > 0)
}

/// Get the snapshot for one period
pub async fn get_by_period(
    pool: &SqlitePool,
    period_start: NaiveDate,
) -> Result<Option<LeagueSnapshot>> {
    let row: Option<SnapshotRow> = sqlx::query_as(
        r#"
        SELECT id, period_start, period_end, rankings, created_at
        FROM league_snapshots
        WHERE period_start = ?
        "#,
    )
    .bind(period_start)
    .fetch_optional(pool)
    .await
    .map_err(|e| Error::Database(e.to_string()))?;

    row.map(SnapshotRow::into_snapshot).transpose()
}

/// Most recent snapshot, if any
pub async fn latest(pool: &SqlitePool) -> Result<Option<LeagueSnapshot>> {
    let row: Option<SnapshotRow> = sqlx::query_as(
        r#"
        SELECT id, period_start, period_end, rankings, created_at
        FROM league_snapshots
        ORDER BY period_start DESC
        LIMIT 1
        "#,
    )
    .fetch_optional(pool)
    .await
    .map_err(|e| Error::Database(e.to_string()))?;

    row.map(SnapshotRow::into_snapshot).transpose()
}
