//! Social/audit activity feed models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Discriminator for feed records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    XpAwarded,
    StreakMilestone,
    BoosterGifted,
    EntitlementGranted,
}

impl ActivityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityKind::XpAwarded => "xp_awarded",
            ActivityKind::StreakMilestone => "streak_milestone",
            ActivityKind::BoosterGifted => "booster_gifted",
            ActivityKind::EntitlementGranted => "entitlement_granted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "xp_awarded" => Some(ActivityKind::XpAwarded),
            "streak_milestone" => Some(ActivityKind::StreakMilestone),
            "booster_gifted" => Some(ActivityKind::BoosterGifted),
            "entitlement_granted" => Some(ActivityKind::EntitlementGranted),
            _ => None,
        }
    }
}

/// One entry on a user's activity feed, written in the same transaction as
/// the state change it describes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub id: i64,
    pub user_id: String,
    pub kind: ActivityKind,
    pub detail: serde_json::Value,
    pub created_at: Option<DateTime<Utc>>,
}
