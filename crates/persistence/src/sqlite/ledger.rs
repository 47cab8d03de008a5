//! Append-only idempotency ledger

use chrono::{DateTime, Utc};
use habitforge_core::{Error, LedgerEntry, Result};
use sqlx::{SqliteConnection, SqlitePool};

#[derive(Debug, sqlx::FromRow)]
struct LedgerRow {
    action_id: String,
    user_id: String,
    amount: i64,
    source: String,
    metadata: String,
    created_at: Option<DateTime<Utc>>,
}

impl From<LedgerRow> for LedgerEntry {
    fn from(row: LedgerRow) -> Self {
        LedgerEntry {
            action_id: row.action_id,
            user_id: row.user_id,
            amount: row.amount,
            source: row.source,
            metadata: serde_json::from_str(&row.metadata).unwrap_or(serde_json::Value::Null),
            created_at: row.created_at,
        }
    }
}

/// Record an action, returning false when `action_id` was already present.
///
/// This insert is the idempotency boundary for every mutating operation:
/// the primary key on `action_id` makes the losing writer of a concurrent
/// retry observe zero affected rows and take the no-op success path.
pub async fn record_action(
    conn: &mut SqliteConnection,
    action_id: &str,
    user_id: &str,
    amount: i64,
    source: &str,
    metadata: &serde_json::Value,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO ledger (action_id, user_id, amount, source, metadata)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(action_id) DO NOTHING
        "#,
    )
    .bind(action_id)
    .bind(user_id)
    .bind(amount)
    .bind(source)
    .bind(metadata.to_string())
    .execute(&mut *conn)
    .await
    .map_err(|e| Error::Database(e.to_string()))?;

    Ok(result.rows_affected() > 0)
}

/// Get a single ledger entry by action id
pub async fn get_entry(pool: &SqlitePool, action_id: &str) -> Result<Option<LedgerEntry>> {
    let row: Option<LedgerRow> = sqlx::query_as(
        r#"
        SELECT action_id, user_id, amount, source, metadata, created_at
        FROM ledger
        WHERE action_id = ?
        "#,
    )
    .bind(action_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| Error::Database(e.to_string()))?;

    Ok(row.map(LedgerEntry::from))
}

/// Recent ledger entries for a user, newest first
pub async fn entries_for_user(
    pool: &SqlitePool,
    user_id: &str,
    limit: u32,
) -> Result<Vec<LedgerEntry>> {
    let rows: Vec<LedgerRow> = sqlx::query_as(
        r#"
        SELECT action_id, user_id, amount, source, metadata, created_at
        FROM ledger
        WHERE user_id = ?
        ORDER BY created_at DESC, action_id DESC
        LIMIT ?
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(|e| Error::Database(e.to_string()))?;

    Ok(rows.into_iter().map(LedgerEntry::from).collect())
}

/// Ledger entry count for a user
pub async fn count_for_user(pool: &SqlitePool, user_id: &str) -> Result<u32> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM ledger WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

    Ok(row.0 as u32)
}
