//! Progression engine - idempotent XP awards with compounding bonuses

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use habitforge_core::{
    level_for_lifetime_xp, ActivityKind, AwardOutcome, BonusBreakdown, BoosterType, Error, Result,
    XP_PER_GEM,
};
use habitforge_persistence::sqlite::{activity, ledger, users};
use habitforge_persistence::Database;
use tracing::{debug, info};

/// Morning bonus window, half-open [06:00, 09:00) UTC
pub const MORNING_WINDOW_START_HOUR: u32 = 6;
pub const MORNING_WINDOW_END_HOUR: u32 = 9;

/// Whether the server clock is inside the morning bonus window
pub fn in_morning_window(now: DateTime<Utc>) -> bool {
    let hour = now.hour();
    hour >= MORNING_WINDOW_START_HOUR && hour < MORNING_WINDOW_END_HOUR
}

/// Apply the bonus pipeline to a base amount.
///
/// Order is fixed and load-bearing: the bonuses compound multiplicatively,
/// and flooring happens only at the morning step.
/// 1. morning bonus: x1.5, floored
/// 2. streak bonus: x2
/// 3. booster: x2 or x3
pub fn apply_bonuses(
    base: i64,
    morning_available: bool,
    streak_bonus_armed: bool,
    booster: Option<BoosterType>,
) -> (i64, BonusBreakdown) {
    let mut amount = base;
    let mut bonuses = BonusBreakdown::default();

    if morning_available {
        // x1.5 with floor: a + floor(a/2)
        amount += amount / 2;
        bonuses.morning_bonus = true;
    }

    if streak_bonus_armed {
        amount *= 2;
        bonuses.streak_bonus = true;
    }

    if let Some(kind) = booster {
        amount *= kind.multiplier();
        bonuses.booster = Some(kind);
    }

    (amount, bonuses)
}

/// Award XP for a completed activity.
///
/// Safe to retry indefinitely: a replayed `action_id` reports success with
/// `already_processed` set and a zero delta. The ledger append and every
/// state mutation commit in one transaction; a failure anywhere applies
/// nothing.
pub async fn award_xp(
    db: &Database,
    user_id: &str,
    base_amount: i64,
    source: &str,
    action_id: &str,
    metadata: serde_json::Value,
) -> Result<AwardOutcome> {
    award_xp_at(db, user_id, base_amount, source, action_id, metadata, Utc::now()).await
}

/// `award_xp` against an explicit clock
pub async fn award_xp_at(
    db: &Database,
    user_id: &str,
    base_amount: i64,
    source: &str,
    action_id: &str,
    metadata: serde_json::Value,
    now: DateTime<Utc>,
) -> Result<AwardOutcome> {
    if base_amount < 0 {
        return Err(Error::InvalidArgument(format!(
            "negative XP amount: {}",
            base_amount
        )));
    }

    let mut tx = db
        .pool()
        .begin()
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

    let user = users::fetch_user(&mut *tx, user_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("user: {}", user_id)))?;

    let today: NaiveDate = now.date_naive();
    let morning_available = in_morning_window(now) && !user.morning_bonus_used_on(today);
    let booster = user.booster_active_at(now);

    let (final_amount, bonuses) =
        apply_bonuses(base_amount, morning_available, user.has_streak_bonus, booster);

    let inserted =
        ledger::record_action(&mut *tx, action_id, user_id, final_amount, source, &metadata)
            .await?;
    if !inserted {
        tx.rollback()
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        debug!("Action {} already processed, no-op", action_id);
        return Ok(AwardOutcome {
            user_id: user.user_id,
            action_id: action_id.to_string(),
            base_amount,
            final_amount: 0,
            bonuses: BonusBreakdown::default(),
            gems_awarded: 0,
            level: user.level,
            level_up: false,
            already_processed: true,
        });
    }

    let gems_awarded = final_amount / XP_PER_GEM;
    let morning_consumed_on = if bonuses.morning_bonus { Some(today) } else { None };
    users::apply_xp_award(
        &mut *tx,
        user_id,
        final_amount,
        gems_awarded,
        morning_consumed_on,
        bonuses.streak_bonus,
    )
    .await?;

    let new_level = level_for_lifetime_xp(user.lifetime_xp + final_amount);
    let detail = serde_json::json!({
        "source": source,
        "base_amount": base_amount,
        "amount": final_amount,
        "gems": gems_awarded,
        "level": new_level,
    });
    activity::record_activity(&mut *tx, user_id, ActivityKind::XpAwarded, &detail).await?;

    tx.commit()
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

    info!(
        "Awarded {} XP to {} for {} (base {})",
        final_amount, user_id, source, base_amount
    );

    Ok(AwardOutcome {
        user_id: user.user_id,
        action_id: action_id.to_string(),
        base_amount,
        final_amount,
        bonuses,
        gems_awarded,
        level: new_level,
        level_up: new_level > user.level,
        already_processed: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use habitforge_core::League;
    use habitforge_persistence::sqlite::users::create_user;

    fn at_hour(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, hour, 15, 0).unwrap()
    }

    #[test]
    fn test_bonus_compounding_order() {
        // 100 -> 150 (morning) -> 300 (streak) -> 600 (2x booster)
        let (amount, bonuses) =
            apply_bonuses(100, true, true, Some(BoosterType::Double));
        assert_eq!(amount, 600);
        assert!(bonuses.morning_bonus);
        assert!(bonuses.streak_bonus);
        assert_eq!(bonuses.booster, Some(BoosterType::Double));
    }

    #[test]
    fn test_floor_applies_only_at_morning_step() {
        // 25 -> 37 (floor of 37.5) -> 74 -> 222, not floor(25 * 9) = 225
        let (amount, _) = apply_bonuses(25, true, true, Some(BoosterType::Triple));
        assert_eq!(amount, 222);
    }

    #[test]
    fn test_no_bonuses_passes_through() {
        let (amount, bonuses) = apply_bonuses(80, false, false, None);
        assert_eq!(amount, 80);
        assert!(!bonuses.morning_bonus);
        assert!(!bonuses.streak_bonus);
        assert!(bonuses.booster.is_none());
    }

    #[test]
    fn test_morning_window_bounds() {
        assert!(!in_morning_window(at_hour(5)));
        assert!(in_morning_window(at_hour(6)));
        assert!(in_morning_window(at_hour(8)));
        assert!(!in_morning_window(at_hour(9)));
        assert!(!in_morning_window(at_hour(12)));
    }

    #[tokio::test]
    async fn test_award_updates_all_counters() {
        let db = Database::connect_in_memory().await.unwrap();
        create_user(db.pool(), "u1", "Ada").await.unwrap();

        let outcome = award_xp_at(
            &db,
            "u1",
            250,
            "challenge_completed",
            "a1",
            serde_json::json!({}),
            at_hour(12),
        )
        .await
        .unwrap();

        assert_eq!(outcome.final_amount, 250);
        assert_eq!(outcome.gems_awarded, 2);
        assert!(!outcome.already_processed);

        let user = users::get_user(db.pool(), "u1").await.unwrap().unwrap();
        assert_eq!(user.xp, 250);
        assert_eq!(user.weekly_xp, 250);
        assert_eq!(user.lifetime_xp, 250);
        assert_eq!(user.level, 1);
        assert_eq!(user.gems, 50 + 2);
        assert_eq!(user.league, League::Bronze);
    }

    #[tokio::test]
    async fn test_award_is_idempotent() {
        let db = Database::connect_in_memory().await.unwrap();
        create_user(db.pool(), "u1", "Ada").await.unwrap();

        let first = award_xp_at(&db, "u1", 100, "quiz", "tok", serde_json::json!({}), at_hour(12))
            .await
            .unwrap();
        let second = award_xp_at(&db, "u1", 100, "quiz", "tok", serde_json::json!({}), at_hour(12))
            .await
            .unwrap();

        assert!(!first.already_processed);
        assert!(second.already_processed);
        assert_eq!(second.final_amount, 0);

        let user = users::get_user(db.pool(), "u1").await.unwrap().unwrap();
        assert_eq!(user.lifetime_xp, 100);
        assert_eq!(ledger::count_for_user(db.pool(), "u1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_morning_bonus_once_per_day() {
        let db = Database::connect_in_memory().await.unwrap();
        create_user(db.pool(), "u1", "Ada").await.unwrap();

        let first = award_xp_at(&db, "u1", 100, "quiz", "m1", serde_json::json!({}), at_hour(7))
            .await
            .unwrap();
        assert_eq!(first.final_amount, 150);
        assert!(first.bonuses.morning_bonus);

        // Same morning: the permit is spent
        let second = award_xp_at(&db, "u1", 100, "quiz", "m2", serde_json::json!({}), at_hour(8))
            .await
            .unwrap();
        assert_eq!(second.final_amount, 100);
        assert!(!second.bonuses.morning_bonus);

        // Next day the permit is fresh again
        let next_day = Utc.with_ymd_and_hms(2026, 3, 3, 7, 0, 0).unwrap();
        let third = award_xp_at(&db, "u1", 100, "quiz", "m3", serde_json::json!({}), next_day)
            .await
            .unwrap();
        assert_eq!(third.final_amount, 150);
    }

    #[tokio::test]
    async fn test_expired_booster_does_not_apply() {
        let db = Database::connect_in_memory().await.unwrap();
        create_user(db.pool(), "u1", "Ada").await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        users::set_booster(&mut conn, "u1", BoosterType::Triple, at_hour(10))
            .await
            .unwrap();
        drop(conn);

        // Booster expired an hour before the award
        let outcome = award_xp_at(&db, "u1", 100, "quiz", "b1", serde_json::json!({}), at_hour(11))
            .await
            .unwrap();
        assert_eq!(outcome.final_amount, 100);
        assert!(outcome.bonuses.booster.is_none());
    }

    #[tokio::test]
    async fn test_level_up_at_threshold() {
        let db = Database::connect_in_memory().await.unwrap();
        create_user(db.pool(), "u1", "Ada").await.unwrap();

        let first = award_xp_at(&db, "u1", 499, "quiz", "l1", serde_json::json!({}), at_hour(12))
            .await
            .unwrap();
        assert_eq!(first.level, 1);
        assert!(!first.level_up);

        let second = award_xp_at(&db, "u1", 1, "quiz", "l2", serde_json::json!({}), at_hour(12))
            .await
            .unwrap();
        assert_eq!(second.level, 2);
        assert!(second.level_up);
    }

    #[tokio::test]
    async fn test_unknown_user_and_negative_amount() {
        let db = Database::connect_in_memory().await.unwrap();
        create_user(db.pool(), "u1", "Ada").await.unwrap();

        let missing =
            award_xp_at(&db, "ghost", 10, "quiz", "e1", serde_json::json!({}), at_hour(12)).await;
        assert!(matches!(missing, Err(Error::NotFound(_))));

        let negative =
            award_xp_at(&db, "u1", -5, "quiz", "e2", serde_json::json!({}), at_hour(12)).await;
        assert!(matches!(negative, Err(Error::InvalidArgument(_))));
    }
}
