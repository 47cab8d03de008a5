//! Offline action queue persistence

use chrono::{DateTime, Utc};
use habitforge_core::{Error, QueuedEntry, Result};
use sqlx::SqlitePool;

#[derive(Debug, sqlx::FromRow)]
struct QueueRow {
    id: i64,
    user_id: String,
    action_id: String,
    action: String,
    processed: i64,
    created_at: Option<DateTime<Utc>>,
}

impl From<QueueRow> for QueuedEntry {
    fn from(row: QueueRow) -> Self {
        QueuedEntry {
            id: row.id,
            user_id: row.user_id,
            action_id: row.action_id,
            action: row.action,
            processed: row.processed != 0,
            created_at: row.created_at,
        }
    }
}

/// Store an action for later replay; false when the action id is already
/// queued (a client re-enqueue of the same logical action)
pub async fn enqueue(
    pool: &SqlitePool,
    user_id: &str,
    action_id: &str,
    action_json: &str,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO offline_queue (user_id, action_id, action)
        VALUES (?, ?, ?)
        ON CONFLICT(action_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(action_id)
    .bind(action_json)
    .execute(pool)
    .await
    .map_err(|e| Error::Database(e.to_string()))?;

    Ok(result.rows_affected() > 0)
}

/// Unprocessed entries for a user in strict chronological order.
///
/// The id tie-break keeps same-timestamp entries in insertion order.
pub async fn pending_for_user(pool: &SqlitePool, user_id: &str) -> Result<Vec<QueuedEntry>> {
    let rows: Vec<QueueRow> = sqlx::query_as(
        r#"
        SELECT id, user_id, action_id, action, processed, created_at
        FROM offline_queue
        WHERE user_id = ? AND processed = 0
        ORDER BY created_at ASC, id ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(|e| Error::Database(e.to_string()))?;

    Ok(rows.into_iter().map(QueuedEntry::from).collect())
}

/// Mark one entry processed; never un-marked
pub async fn mark_processed(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("UPDATE offline_queue SET processed = 1 WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

    Ok(())
}

/// Count of unprocessed entries for a user
pub async fn pending_count(pool: &SqlitePool, user_id: &str) -> Result<u32> {
    let row: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM offline_queue WHERE user_id = ? AND processed = 0")
            .bind(user_id)
            .fetch_one(pool)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;

    Ok(row.0 as u32)
}
