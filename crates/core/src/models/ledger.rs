//! Ledger models - the append-only idempotency record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One successfully processed idempotent action.
///
/// `action_id` is globally unique; a replay of the same id is detected at
/// insert time and the operation takes its no-op success path. Entries are
/// never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub action_id: String,
    pub user_id: String,
    /// Final post-bonus XP for awards; zero for non-XP actions
    pub amount: i64,
    /// Activity label ("challenge_completed", "grace_pass",
    /// "booster_gift:2x", "entitlement:<product>", ...)
    pub source: String,
    /// Opaque caller-supplied audit payload
    pub metadata: serde_json::Value,
    pub created_at: Option<DateTime<Utc>>,
}
