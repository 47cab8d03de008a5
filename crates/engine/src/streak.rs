//! Streak tracker - daily continuity and grace-pass recovery

use chrono::{DateTime, Utc};
use habitforge_core::{
    ActivityKind, DailyActivityOutcome, Error, GracePassOutcome, Result,
    STREAK_MILESTONE_INTERVAL, STREAK_OFFER_THRESHOLD,
};
use habitforge_persistence::sqlite::{activity, ledger, users};
use habitforge_persistence::Database;
use tracing::{debug, info};

/// Record one completed daily activity.
///
/// Idempotent per UTC day: a second call on the same day changes nothing.
/// A gap of two or more days resets the streak to 1 and, when the broken
/// streak was worth saving, flags the caller so a grace-pass offer can be
/// surfaced.
pub async fn record_daily_activity(db: &Database, user_id: &str) -> Result<DailyActivityOutcome> {
    record_daily_activity_at(db, user_id, Utc::now()).await
}

/// `record_daily_activity` against an explicit clock
pub async fn record_daily_activity_at(
    db: &Database,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<DailyActivityOutcome> {
    let today = now.date_naive();

    let mut tx = db
        .pool()
        .begin()
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

    let user = users::fetch_user(&mut *tx, user_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("user: {}", user_id)))?;

    if user.completed_on(today) {
        tx.rollback()
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        debug!("Daily activity for {} already recorded today", user_id);
        return Ok(DailyActivityOutcome {
            user_id: user.user_id,
            streak: user.streak,
            total_days_studied: user.total_days_studied,
            already_recorded_today: true,
            streak_broken: false,
            previous_streak: user.streak,
            milestone: None,
        });
    }

    let continues = match (user.last_active_date, today.pred_opt()) {
        (Some(last), Some(yesterday)) => last == yesterday,
        _ => false,
    };

    let (new_streak, streak_broken) = if continues {
        (user.streak + 1, false)
    } else if user.last_active_date.is_none() {
        // First activity ever
        (1, false)
    } else {
        (1, user.streak >= STREAK_OFFER_THRESHOLD)
    };

    users::update_streak(&mut *tx, user_id, new_streak, today).await?;

    let milestone = if new_streak > 0 && new_streak % STREAK_MILESTONE_INTERVAL == 0 {
        let detail = serde_json::json!({ "streak": new_streak });
        activity::record_activity(&mut *tx, user_id, ActivityKind::StreakMilestone, &detail)
            .await?;
        // Each 7-day milestone arms the one-shot streak bonus
        users::set_streak_bonus(&mut *tx, user_id).await?;
        Some(new_streak)
    } else {
        None
    };

    tx.commit()
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

    if streak_broken {
        info!(
            "Streak broken for {}: was {} days, reset to 1",
            user_id, user.streak
        );
    }
    if let Some(days) = milestone {
        info!("Streak milestone for {}: {} days", user_id, days);
    }

    Ok(DailyActivityOutcome {
        user_id: user.user_id,
        streak: new_streak,
        total_days_studied: user.total_days_studied + 1,
        already_recorded_today: false,
        streak_broken,
        previous_streak: user.streak,
        milestone,
    })
}

/// Redeem one grace pass, restoring a dead streak to 1.
///
/// Idempotent via the ledger: replaying the same `action_id` reports
/// success without consuming a second pass. Deliberately restores the
/// minimum viable streak, not the pre-break value.
pub async fn redeem_grace_pass(
    db: &Database,
    user_id: &str,
    action_id: &str,
) -> Result<GracePassOutcome> {
    let mut tx = db
        .pool()
        .begin()
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

    let user = users::fetch_user(&mut *tx, user_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("user: {}", user_id)))?;

    if user.grace_passes_available <= 0 {
        return Err(Error::InsufficientResource(format!(
            "no grace passes available for {}",
            user_id
        )));
    }

    let metadata = serde_json::json!({ "streak_before": user.streak });
    let inserted =
        ledger::record_action(&mut *tx, action_id, user_id, 0, "grace_pass", &metadata).await?;
    if !inserted {
        tx.rollback()
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        debug!("Grace pass action {} already processed", action_id);
        return Ok(GracePassOutcome {
            user_id: user.user_id,
            grace_passes_available: user.grace_passes_available,
            grace_passes_used: user.grace_passes_used,
            streak: user.streak,
            already_processed: true,
        });
    }

    let consumed = users::consume_grace_pass(&mut *tx, user_id).await?;
    if !consumed {
        // Raced to zero since the read above; the dropped transaction
        // discards the ledger row
        return Err(Error::InsufficientResource(format!(
            "no grace passes available for {}",
            user_id
        )));
    }

    tx.commit()
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

    info!("Grace pass redeemed for {}", user_id);

    Ok(GracePassOutcome {
        user_id: user.user_id,
        grace_passes_available: user.grace_passes_available - 1,
        grace_passes_used: user.grace_passes_used + 1,
        streak: if user.streak == 0 { 1 } else { user.streak },
        already_processed: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use habitforge_persistence::sqlite::users::create_user;

    fn on_day(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, 14, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_consecutive_days_extend_streak() {
        let db = Database::connect_in_memory().await.unwrap();
        create_user(db.pool(), "u1", "Ada").await.unwrap();

        let first = record_daily_activity_at(&db, "u1", on_day(1)).await.unwrap();
        assert_eq!(first.streak, 1);
        assert_eq!(first.total_days_studied, 1);

        let second = record_daily_activity_at(&db, "u1", on_day(2)).await.unwrap();
        assert_eq!(second.streak, 2);
        assert!(!second.streak_broken);
    }

    #[tokio::test]
    async fn test_same_day_call_is_noop() {
        let db = Database::connect_in_memory().await.unwrap();
        create_user(db.pool(), "u1", "Ada").await.unwrap();

        record_daily_activity_at(&db, "u1", on_day(1)).await.unwrap();
        let repeat = record_daily_activity_at(&db, "u1", on_day(1)).await.unwrap();

        assert!(repeat.already_recorded_today);
        assert_eq!(repeat.streak, 1);
        assert_eq!(repeat.total_days_studied, 1);

        let user = users::get_user(db.pool(), "u1").await.unwrap().unwrap();
        assert_eq!(user.total_days_studied, 1);
    }

    #[tokio::test]
    async fn test_gap_resets_and_flags_long_streaks() {
        let db = Database::connect_in_memory().await.unwrap();
        create_user(db.pool(), "u1", "Ada").await.unwrap();

        for day in 1..=4 {
            record_daily_activity_at(&db, "u1", on_day(day)).await.unwrap();
        }

        // Two missed days after a 4-day streak
        let broken = record_daily_activity_at(&db, "u1", on_day(7)).await.unwrap();
        assert_eq!(broken.streak, 1);
        assert!(broken.streak_broken);
        assert_eq!(broken.previous_streak, 4);
    }

    #[tokio::test]
    async fn test_short_streak_break_is_not_flagged() {
        let db = Database::connect_in_memory().await.unwrap();
        create_user(db.pool(), "u1", "Ada").await.unwrap();

        record_daily_activity_at(&db, "u1", on_day(1)).await.unwrap();
        record_daily_activity_at(&db, "u1", on_day(2)).await.unwrap();

        // Breaking a 2-day streak is below the offer threshold
        let broken = record_daily_activity_at(&db, "u1", on_day(5)).await.unwrap();
        assert_eq!(broken.streak, 1);
        assert!(!broken.streak_broken);
    }

    #[tokio::test]
    async fn test_seven_day_milestone_emits_record_and_arms_bonus() {
        let db = Database::connect_in_memory().await.unwrap();
        create_user(db.pool(), "u1", "Ada").await.unwrap();

        let mut last = None;
        for day in 1..=7 {
            last = Some(record_daily_activity_at(&db, "u1", on_day(day)).await.unwrap());
        }

        assert_eq!(last.unwrap().milestone, Some(7));
        let count = activity::count_kind(db.pool(), "u1", ActivityKind::StreakMilestone)
            .await
            .unwrap();
        assert_eq!(count, 1);

        let user = users::get_user(db.pool(), "u1").await.unwrap().unwrap();
        assert!(user.has_streak_bonus);
    }

    #[tokio::test]
    async fn test_grace_pass_scenario() {
        let db = Database::connect_in_memory().await.unwrap();
        create_user(db.pool(), "u1", "Ada").await.unwrap();

        // Give a second pass, kill the streak
        let mut conn = db.pool().acquire().await.unwrap();
        users::apply_entitlement(&mut conn, "u1", 0, 1).await.unwrap();
        drop(conn);

        let first = redeem_grace_pass(&db, "u1", "tok1").await.unwrap();
        assert_eq!(first.grace_passes_available, 1);
        assert_eq!(first.grace_passes_used, 1);
        assert_eq!(first.streak, 1);
        assert!(!first.already_processed);

        // Replay of tok1: success, no further change
        let replay = redeem_grace_pass(&db, "u1", "tok1").await.unwrap();
        assert!(replay.already_processed);
        assert_eq!(replay.grace_passes_available, 1);

        let user = users::get_user(db.pool(), "u1").await.unwrap().unwrap();
        assert_eq!(user.grace_passes_available, 1);
        assert_eq!(user.grace_passes_used, 1);
    }

    #[tokio::test]
    async fn test_grace_pass_exhaustion() {
        let db = Database::connect_in_memory().await.unwrap();
        create_user(db.pool(), "u1", "Ada").await.unwrap();

        redeem_grace_pass(&db, "u1", "g1").await.unwrap();
        let empty = redeem_grace_pass(&db, "u1", "g2").await;
        assert!(matches!(empty, Err(Error::InsufficientResource(_))));

        // The failed attempt must not leave a ledger entry behind
        assert!(ledger::get_entry(db.pool(), "g2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_grace_pass_keeps_live_streak() {
        let db = Database::connect_in_memory().await.unwrap();
        create_user(db.pool(), "u1", "Ada").await.unwrap();

        record_daily_activity_at(&db, "u1", on_day(1)).await.unwrap();
        record_daily_activity_at(&db, "u1", on_day(2)).await.unwrap();

        // Streak is alive at 2; redemption must not clobber it
        let outcome = redeem_grace_pass(&db, "u1", "keep").await.unwrap();
        assert_eq!(outcome.streak, 2);
    }
}
