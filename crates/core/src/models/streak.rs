//! Streak tracker outcome models

use serde::{Deserialize, Serialize};

/// Streak values that are exact multiples of this emit a milestone record
pub const STREAK_MILESTONE_INTERVAL: i64 = 7;

/// Broken streaks at or above this length trigger a grace-pass offer
pub const STREAK_OFFER_THRESHOLD: i64 = 3;

/// Result of `record_daily_activity`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyActivityOutcome {
    pub user_id: String,
    pub streak: i64,
    pub total_days_studied: i64,
    /// True when today's activity was already recorded; nothing changed
    pub already_recorded_today: bool,
    /// True when a streak of `STREAK_OFFER_THRESHOLD`+ days just broke, so
    /// the caller can surface a grace-pass offer
    pub streak_broken: bool,
    pub previous_streak: i64,
    /// Set when the new streak landed on a 7-day milestone
    pub milestone: Option<i64>,
}

/// Result of `redeem_grace_pass`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GracePassOutcome {
    pub user_id: String,
    pub grace_passes_available: i64,
    pub grace_passes_used: i64,
    pub streak: i64,
    /// True when the `action_id` had already been recorded; nothing changed
    pub already_processed: bool,
}
