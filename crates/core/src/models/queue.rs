//! Offline action queue models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A replayable action captured while it could not be processed
/// synchronously.
///
/// Closed set of known kinds with typed payloads; the replay dispatcher
/// matches exhaustively, so there is no "unknown action type" runtime path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueuedAction {
    AwardXp {
        base_amount: i64,
        source: String,
        #[serde(default)]
        metadata: serde_json::Value,
    },
    RecordDailyActivity,
    RedeemGracePass,
    PurchaseBooster {
        target_user_id: String,
        booster_type: String,
    },
}

/// One stored queue row. The payload stays raw JSON until dispatch so a
/// malformed entry fails that entry alone, not the whole drain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedEntry {
    pub id: i64,
    pub user_id: String,
    pub action_id: String,
    pub action: String,
    pub processed: bool,
    pub created_at: Option<DateTime<Utc>>,
}

/// Result of one `process_queued_actions` drain
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplaySummary {
    /// Entries dispatched this pass
    pub attempted: usize,
    pub succeeded: usize,
    /// Terminal failures, marked processed and dropped
    pub failed: usize,
    /// Entries left unprocessed after a transient storage error
    pub remaining: usize,
}
