//! Offline action replay - at-least-once delivery made exactly-once

use chrono::{DateTime, Utc};
use habitforge_core::{QueuedAction, QueuedEntry, ReplaySummary, Result};
use habitforge_persistence::sqlite::queue;
use habitforge_persistence::Database;
use tracing::{info, warn};

use crate::{booster, progression, streak};

/// Store an action that could not be processed synchronously.
///
/// Returns false when the same `action_id` is already queued.
pub async fn enqueue_action(
    db: &Database,
    user_id: &str,
    action_id: &str,
    action: &QueuedAction,
) -> Result<bool> {
    let action_json = serde_json::to_string(action)?;
    queue::enqueue(db.pool(), user_id, action_id, &action_json).await
}

/// Drain a user's queued actions in strict chronological order.
///
/// Each entry dispatches to the matching idempotent operation under its own
/// `action_id`, so an entry that was half-delivered before going offline
/// cannot apply twice. Terminal application errors mark the entry processed
/// and move on - a permanently failing action must not starve the queue.
/// A transient storage error stops the drain with the entry unprocessed,
/// preserving order for the next pass.
pub async fn process_queued_actions(db: &Database, user_id: &str) -> Result<ReplaySummary> {
    process_queued_actions_at(db, user_id, Utc::now()).await
}

/// `process_queued_actions` against an explicit clock
pub async fn process_queued_actions_at(
    db: &Database,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<ReplaySummary> {
    let pending = queue::pending_for_user(db.pool(), user_id).await?;
    let total = pending.len();
    let mut summary = ReplaySummary::default();

    for entry in pending {
        summary.attempted += 1;

        match dispatch(db, &entry, now).await {
            Ok(()) => {
                summary.succeeded += 1;
                queue::mark_processed(db.pool(), entry.id).await?;
            }
            Err(err) if err.is_terminal() => {
                warn!(
                    "Dropping queued action {} for {}: {}",
                    entry.action_id, user_id, err
                );
                summary.failed += 1;
                queue::mark_processed(db.pool(), entry.id).await?;
            }
            Err(err) => {
                warn!(
                    "Transient error on queued action {} for {}, stopping drain: {}",
                    entry.action_id, user_id, err
                );
                summary.remaining = total - summary.succeeded - summary.failed;
                return Ok(summary);
            }
        }
    }

    if summary.attempted > 0 {
        info!(
            "Replayed {} queued actions for {} ({} ok, {} dropped)",
            summary.attempted, user_id, summary.succeeded, summary.failed
        );
    }

    Ok(summary)
}

async fn dispatch(db: &Database, entry: &QueuedEntry, now: DateTime<Utc>) -> Result<()> {
    // A malformed payload is a terminal error for this entry alone
    let action: QueuedAction = serde_json::from_str(&entry.action)?;

    match action {
        QueuedAction::AwardXp {
            base_amount,
            source,
            metadata,
        } => progression::award_xp_at(
            db,
            &entry.user_id,
            base_amount,
            &source,
            &entry.action_id,
            metadata,
            now,
        )
        .await
        .map(drop),
        QueuedAction::RecordDailyActivity => {
            streak::record_daily_activity_at(db, &entry.user_id, now)
                .await
                .map(drop)
        }
        QueuedAction::RedeemGracePass => {
            streak::redeem_grace_pass(db, &entry.user_id, &entry.action_id)
                .await
                .map(drop)
        }
        QueuedAction::PurchaseBooster {
            target_user_id,
            booster_type,
        } => booster::grant_booster_at(
            db,
            &entry.user_id,
            &target_user_id,
            &booster_type,
            &entry.action_id,
            now,
        )
        .await
        .map(drop),
    }
}
