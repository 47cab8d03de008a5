//! Shared type definitions

use serde::{Deserialize, Serialize};

/// Scoring window for leaderboard reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    /// Rank by current-cycle weekly XP
    Weekly,
    /// Rank by lifetime XP
    AllTime,
}

impl Timeframe {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "weekly" => Some(Timeframe::Weekly),
            "all_time" | "alltime" => Some(Timeframe::AllTime),
            _ => None,
        }
    }
}
