//! Habitforge Engine - Game-economy operations
//!
//! Every mutating operation here runs inside one database transaction and
//! is idempotent under retry: the append-only ledger keyed by the caller's
//! `action_id` decides exactly once whether an action applies.

pub mod booster;
pub mod entitlements;
pub mod league;
pub mod progression;
pub mod replay;
pub mod streak;

pub use booster::grant_booster;
pub use entitlements::grant_entitlements;
pub use league::{get_leaderboard, run_weekly_league_update};
pub use progression::award_xp;
pub use replay::{enqueue_action, process_queued_actions};
pub use streak::{record_daily_activity, redeem_grace_pass};
