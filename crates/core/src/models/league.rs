//! League models - competitive tiers, rankings, and weekly snapshots

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Number of top-ranked members eligible for promotion each week
pub const PROMOTION_SLOTS: usize = 3;

/// Minimum weekly XP required to take a promotion slot
pub const PROMOTION_XP_THRESHOLD: i64 = 500;

/// Members ranked beyond `capacity - RELEGATION_ZONE` are relegated
pub const RELEGATION_ZONE: usize = 5;

/// One of the four ordered competitive tiers.
///
/// Ordering is by tier: `Bronze < Silver < Gold < Diamond`. Every member of
/// a higher league outranks every member of a lower one, regardless of raw
/// XP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum League {
    Bronze,
    Silver,
    Gold,
    Diamond,
}

impl League {
    /// All leagues, highest tier first - the order the weekly ranking job
    /// walks them so the global rank counter is correct in one pass.
    pub const TOP_DOWN: [League; 4] = [
        League::Diamond,
        League::Gold,
        League::Silver,
        League::Bronze,
    ];

    /// Storage ordinal (Bronze=1 .. Diamond=4)
    pub fn ordinal(self) -> i64 {
        match self {
            League::Bronze => 1,
            League::Silver => 2,
            League::Gold => 3,
            League::Diamond => 4,
        }
    }

    pub fn from_ordinal(v: i64) -> Option<League> {
        match v {
            1 => Some(League::Bronze),
            2 => Some(League::Silver),
            3 => Some(League::Gold),
            4 => Some(League::Diamond),
            _ => None,
        }
    }

    /// Nominal league size, used only to compute the relegation cutoff
    pub fn capacity(self) -> usize {
        match self {
            League::Bronze => 50,
            League::Silver => 30,
            League::Gold => 20,
            League::Diamond => 10,
        }
    }

    /// Tier one step up; the top league promotes to itself
    pub fn promoted(self) -> League {
        match self {
            League::Bronze => League::Silver,
            League::Silver => League::Gold,
            League::Gold => League::Diamond,
            League::Diamond => League::Diamond,
        }
    }

    /// Tier one step down; the bottom league relegates to itself
    pub fn relegated(self) -> League {
        match self {
            League::Bronze => League::Bronze,
            League::Silver => League::Bronze,
            League::Gold => League::Silver,
            League::Diamond => League::Gold,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            League::Bronze => "bronze",
            League::Silver => "silver",
            League::Gold => "gold",
            League::Diamond => "diamond",
        }
    }
}

impl std::fmt::Display for League {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input to the ranking pass: one league member's weekly standing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeagueMember {
    pub user_id: String,
    pub name: String,
    pub weekly_xp: i64,
    pub lifetime_xp: i64,
    pub league: League,
}

/// Output of the ranking pass for one member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankDecision {
    pub user_id: String,
    pub name: String,
    pub weekly_xp: i64,
    pub old_league: League,
    pub new_league: League,
    /// Position within the old league, 1-based
    pub league_rank: u32,
    /// Position across all leagues, tier-dominant, 1-based
    pub global_rank: u32,
}

impl RankDecision {
    pub fn promoted(&self) -> bool {
        self.new_league > self.old_league
    }

    pub fn relegated(&self) -> bool {
        self.new_league < self.old_league
    }
}

/// Structured result of one weekly league update run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeagueUpdateSummary {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub total_ranked: usize,
    pub promoted: usize,
    pub relegated: usize,
    pub rankings: Vec<RankDecision>,
    /// True when a snapshot for this period already existed; nothing changed
    pub already_ran: bool,
}

/// Immutable historical record of one weekly cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeagueSnapshot {
    pub id: i64,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub rankings: Vec<RankDecision>,
    pub created_at: Option<DateTime<Utc>>,
}

/// One row of a leaderboard read
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub name: String,
    pub league: League,
    /// Weekly or lifetime XP depending on the requested timeframe
    pub score: i64,
    pub level: i64,
    pub streak: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_ordering() {
        assert!(League::Diamond > League::Gold);
        assert!(League::Gold > League::Silver);
        assert!(League::Silver > League::Bronze);
    }

    #[test]
    fn test_ordinal_round_trip() {
        for league in League::TOP_DOWN {
            assert_eq!(League::from_ordinal(league.ordinal()), Some(league));
        }
        assert_eq!(League::from_ordinal(0), None);
        assert_eq!(League::from_ordinal(5), None);
    }

    #[test]
    fn test_promotion_and_relegation_clamp_at_ends() {
        assert_eq!(League::Diamond.promoted(), League::Diamond);
        assert_eq!(League::Bronze.relegated(), League::Bronze);
        assert_eq!(League::Bronze.promoted(), League::Silver);
        assert_eq!(League::Diamond.relegated(), League::Gold);
    }
}
