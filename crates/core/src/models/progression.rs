//! User progression models - XP, level, gems, streak state

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::booster::{ActiveBooster, BoosterType};
use crate::models::league::League;

/// XP required per level; level is derived from lifetime XP
pub const XP_PER_LEVEL: i64 = 500;

/// One gem is awarded per this many XP in a single award
pub const XP_PER_GEM: i64 = 100;

/// Gems granted to a freshly created account
pub const STARTER_GEMS: i64 = 50;

/// Grace passes granted to a freshly created account
pub const STARTER_GRACE_PASSES: i64 = 1;

/// Level derived from total accumulated XP (not weekly XP)
pub fn level_for_lifetime_xp(lifetime_xp: i64) -> i64 {
    lifetime_xp / XP_PER_LEVEL + 1
}

/// Full progression state for one user.
///
/// Mutated exclusively through the engine operations; all counters stay
/// non-negative and `lifetime_xp` never decreases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProgression {
    pub user_id: String,
    pub name: String,
    /// Current league-cycle XP
    pub xp: i64,
    /// Resets to zero on every weekly league update
    pub weekly_xp: i64,
    pub lifetime_xp: i64,
    pub level: i64,
    pub gems: i64,
    /// Consecutive-day activity count
    pub streak: i64,
    pub last_active_date: Option<NaiveDate>,
    pub total_days_studied: i64,
    pub grace_passes_available: i64,
    pub grace_passes_used: i64,
    pub league: League,
    /// Rank within the league after the last weekly update
    pub league_position: Option<i64>,
    /// Date the morning bonus was last consumed. "Used today" is recomputed
    /// against the current date at read time rather than kept as a flag an
    /// external reset has to remember to clear.
    pub morning_bonus_date: Option<NaiveDate>,
    /// One-shot consumable: doubles the next XP award
    pub has_streak_bonus: bool,
    pub booster: Option<ActiveBooster>,
    pub created_at: Option<DateTime<Utc>>,
}

impl UserProgression {
    /// Whether today's one-per-day morning bonus has been consumed
    pub fn morning_bonus_used_on(&self, today: NaiveDate) -> bool {
        self.morning_bonus_date == Some(today)
    }

    /// Whether the user has completed an activity today
    pub fn completed_on(&self, today: NaiveDate) -> bool {
        self.last_active_date == Some(today)
    }

    /// The booster in effect at `now`, if any
    pub fn booster_active_at(&self, now: DateTime<Utc>) -> Option<BoosterType> {
        self.booster
            .filter(|b| !b.is_expired(now))
            .map(|b| b.kind)
    }
}

/// Which bonuses fired during an XP award, in application order
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BonusBreakdown {
    /// x1.5 (floored) for activity between 06:00 and 09:00 UTC, once per day
    pub morning_bonus: bool,
    /// x2 from the one-shot streak bonus flag, consumed on use
    pub streak_bonus: bool,
    /// x2 or x3 from a non-expired booster
    pub booster: Option<BoosterType>,
}

/// Result of `award_xp`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwardOutcome {
    pub user_id: String,
    pub action_id: String,
    pub base_amount: i64,
    /// Post-bonus amount actually credited; zero on an idempotent replay
    pub final_amount: i64,
    pub bonuses: BonusBreakdown,
    pub gems_awarded: i64,
    pub level: i64,
    pub level_up: bool,
    /// True when the `action_id` had already been recorded; nothing changed
    pub already_processed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_from_lifetime_xp() {
        assert_eq!(level_for_lifetime_xp(0), 1);
        assert_eq!(level_for_lifetime_xp(499), 1);
        assert_eq!(level_for_lifetime_xp(500), 2);
        assert_eq!(level_for_lifetime_xp(1499), 3);
        assert_eq!(level_for_lifetime_xp(5000), 11);
    }

    #[test]
    fn test_morning_permit_is_date_scoped() {
        let mut user = blank_user();
        let today = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        assert!(!user.morning_bonus_used_on(today));

        user.morning_bonus_date = Some(today);
        assert!(user.morning_bonus_used_on(today));
        // A stale date from yesterday no longer counts as used
        assert!(!user.morning_bonus_used_on(today.succ_opt().unwrap()));
    }

    fn blank_user() -> UserProgression {
        UserProgression {
            user_id: "u1".into(),
            name: "Test".into(),
            xp: 0,
            weekly_xp: 0,
            lifetime_xp: 0,
            level: 1,
            gems: STARTER_GEMS,
            streak: 0,
            last_active_date: None,
            total_days_studied: 0,
            grace_passes_available: STARTER_GRACE_PASSES,
            grace_passes_used: 0,
            league: League::Bronze,
            league_position: None,
            morning_bonus_date: None,
            has_streak_bonus: false,
            booster: None,
            created_at: None,
        }
    }
}
