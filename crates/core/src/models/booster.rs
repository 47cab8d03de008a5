//! Booster models - time-limited XP multipliers

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// XP multiplier tier for a purchasable or giftable booster.
///
/// The higher multiplier deliberately has the shorter window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoosterType {
    #[serde(rename = "2x")]
    Double,
    #[serde(rename = "3x")]
    Triple,
}

impl BoosterType {
    /// Parse the wire form used by clients ("2x" / "3x")
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "2x" => Some(BoosterType::Double),
            "3x" => Some(BoosterType::Triple),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BoosterType::Double => "2x",
            BoosterType::Triple => "3x",
        }
    }

    /// XP multiplier while the booster is active
    pub fn multiplier(self) -> i64 {
        match self {
            BoosterType::Double => 2,
            BoosterType::Triple => 3,
        }
    }

    /// Active window, fixed per type
    pub fn duration(self) -> Duration {
        match self {
            BoosterType::Double => Duration::hours(2),
            BoosterType::Triple => Duration::hours(1),
        }
    }

    /// Gem price, charged to the purchaser (or the giver, for gifts)
    pub fn cost_gems(self) -> i64 {
        match self {
            BoosterType::Double => 100,
            BoosterType::Triple => 150,
        }
    }
}

impl std::fmt::Display for BoosterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A booster currently attached to a user
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActiveBooster {
    pub kind: BoosterType,
    pub expires_at: DateTime<Utc>,
}

impl ActiveBooster {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Result of `grant_booster`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoosterOutcome {
    pub target_user_id: String,
    pub booster: BoosterType,
    /// Expiry of the granted booster (informational when superseded by a
    /// longer-lived one already on the target)
    pub expires_at: DateTime<Utc>,
    pub gems_spent: i64,
    /// True when the `action_id` had already been recorded; nothing changed
    pub already_processed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wire_forms() {
        assert_eq!(BoosterType::parse("2x"), Some(BoosterType::Double));
        assert_eq!(BoosterType::parse("3x"), Some(BoosterType::Triple));
        assert_eq!(BoosterType::parse("4x"), None);
        assert_eq!(BoosterType::parse(""), None);
    }

    #[test]
    fn test_triple_is_shorter_than_double() {
        assert!(BoosterType::Triple.duration() < BoosterType::Double.duration());
        assert_eq!(BoosterType::Double.duration(), Duration::hours(2));
        assert_eq!(BoosterType::Triple.duration(), Duration::hours(1));
    }
}
