//! Social/audit activity feed persistence

use chrono::{DateTime, Utc};
use habitforge_core::{ActivityKind, ActivityRecord, Error, Result};
use sqlx::{SqliteConnection, SqlitePool};

#[derive(Debug, sqlx::FromRow)]
struct ActivityRow {
    id: i64,
    user_id: String,
    kind: String,
    detail: String,
    created_at: Option<DateTime<Utc>>,
}

impl From<ActivityRow> for ActivityRecord {
    fn from(row: ActivityRow) -> Self {
        ActivityRecord {
            id: row.id,
            user_id: row.user_id,
            // Unrecognized kinds should not exist; fall back to the audit kind
            kind: ActivityKind::parse(&row.kind).unwrap_or(ActivityKind::XpAwarded),
            detail: serde_json::from_str(&row.detail).unwrap_or(serde_json::Value::Null),
            created_at: row.created_at,
        }
    }
}

/// Append a feed record (inside the owning operation's transaction)
pub async fn record_activity(
    conn: &mut SqliteConnection,
    user_id: &str,
    kind: ActivityKind,
    detail: &serde_json::Value,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO activity_feed (user_id, kind, detail)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(kind.as_str())
    .bind(detail.to_string())
    .execute(&mut *conn)
    .await
    .map_err(|e| Error::Database(e.to_string()))?;

    Ok(result.last_insert_rowid())
}

/// Recent feed records for a user, newest first
pub async fn recent_activity(
    pool: &SqlitePool,
    user_id: &str,
    limit: u32,
) -> Result<Vec<ActivityRecord>> {
    let rows: Vec<ActivityRow> = sqlx::query_as(
        r#"
        SELECT id, user_id, kind, detail, created_at
        FROM activity_feed
        WHERE user_id = ?
        ORDER BY created_at DESC, id DESC
        LIMIT ?
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(|e| Error::Database(e.to_string()))?;

    Ok(rows.into_iter().map(ActivityRecord::from).collect())
}

/// Count of one kind of record on a user's feed
pub async fn count_kind(pool: &SqlitePool, user_id: &str, kind: ActivityKind) -> Result<u32> {
    let row: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM activity_feed WHERE user_id = ? AND kind = ?")
            .bind(user_id)
            .bind(kind.as_str())
            .fetch_one(pool)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;

    Ok(row.0 as u32)
}
