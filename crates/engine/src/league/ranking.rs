//! Pure weekly ranking pass - no storage access

use habitforge_core::{
    League, LeagueMember, RankDecision, PROMOTION_SLOTS, PROMOTION_XP_THRESHOLD, RELEGATION_ZONE,
};

/// Rank every member within their league and decide promotions and
/// relegations.
///
/// Leagues are walked from the top tier down so the single global rank
/// counter is correct in one pass: every Diamond member outranks every
/// Gold member regardless of raw weekly XP. Within a league, members are
/// ordered by weekly XP with lifetime XP as the tie-break.
pub fn rank_and_reassign(members: &[LeagueMember]) -> Vec<RankDecision> {
    let mut decisions = Vec::with_capacity(members.len());
    let mut global_rank: u32 = 1;

    for league in League::TOP_DOWN {
        let mut tier: Vec<&LeagueMember> =
            members.iter().filter(|m| m.league == league).collect();
        tier.sort_by(|a, b| {
            b.weekly_xp
                .cmp(&a.weekly_xp)
                .then_with(|| b.lifetime_xp.cmp(&a.lifetime_xp))
        });

        // Capacity bounds only the relegation cutoff, not membership
        let relegation_cutoff = league.capacity().saturating_sub(RELEGATION_ZONE);

        for (idx, member) in tier.iter().enumerate() {
            let league_rank = idx + 1;

            let new_league = if league_rank <= PROMOTION_SLOTS
                && member.weekly_xp >= PROMOTION_XP_THRESHOLD
            {
                league.promoted()
            } else if league_rank > relegation_cutoff {
                league.relegated()
            } else {
                league
            };

            decisions.push(RankDecision {
                user_id: member.user_id.clone(),
                name: member.name.clone(),
                weekly_xp: member.weekly_xp,
                old_league: league,
                new_league,
                league_rank: league_rank as u32,
                global_rank,
            });
            global_rank += 1;
        }
    }

    decisions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(user_id: &str, weekly_xp: i64, lifetime_xp: i64, league: League) -> LeagueMember {
        LeagueMember {
            user_id: user_id.to_string(),
            name: user_id.to_string(),
            weekly_xp,
            lifetime_xp,
            league,
        }
    }

    fn decision_for<'a>(decisions: &'a [RankDecision], user_id: &str) -> &'a RankDecision {
        decisions.iter().find(|d| d.user_id == user_id).unwrap()
    }

    #[test]
    fn test_promotion_requires_rank_and_threshold() {
        let members = vec![
            member("a", 800, 0, League::Bronze),
            member("b", 600, 0, League::Bronze),
            member("c", 550, 0, League::Bronze),
            member("d", 300, 0, League::Bronze),
        ];

        let decisions = rank_and_reassign(&members);

        assert_eq!(decision_for(&decisions, "a").new_league, League::Silver);
        assert_eq!(decision_for(&decisions, "b").new_league, League::Silver);
        assert_eq!(decision_for(&decisions, "c").new_league, League::Silver);
        assert_eq!(decision_for(&decisions, "d").new_league, League::Bronze);
    }

    #[test]
    fn test_top_rank_below_threshold_stays() {
        let members = vec![
            member("a", 499, 0, League::Bronze),
            member("b", 100, 0, League::Bronze),
        ];

        let decisions = rank_and_reassign(&members);
        assert_eq!(decision_for(&decisions, "a").new_league, League::Bronze);
    }

    #[test]
    fn test_diamond_never_promotes_above_itself() {
        let members = vec![member("a", 2000, 0, League::Diamond)];
        let decisions = rank_and_reassign(&members);
        assert_eq!(decision_for(&decisions, "a").new_league, League::Diamond);
    }

    #[test]
    fn test_relegation_from_full_silver() {
        // Full 30-member Silver league: ranks 26..=30 fall to Bronze
        let mut members = Vec::new();
        for i in 0..30 {
            // Descending weekly XP below the promotion threshold
            members.push(member(&format!("s{}", i), 400 - i as i64, 0, League::Silver));
        }

        let decisions = rank_and_reassign(&members);

        let relegated: Vec<&str> = decisions
            .iter()
            .filter(|d| d.relegated())
            .map(|d| d.user_id.as_str())
            .collect();
        assert_eq!(relegated.len(), 5);
        assert!(relegated.contains(&"s28"));
        assert!(relegated.contains(&"s29"));

        // Rank 25 sits exactly on the cutoff and stays
        assert_eq!(decision_for(&decisions, "s24").league_rank, 25);
        assert_eq!(decision_for(&decisions, "s24").new_league, League::Silver);
    }

    #[test]
    fn test_bronze_never_relegates_below_itself() {
        let mut members = Vec::new();
        for i in 0..50 {
            members.push(member(&format!("b{}", i), 0, 50 - i as i64, League::Bronze));
        }

        let decisions = rank_and_reassign(&members);
        assert!(decisions.iter().all(|d| d.new_league == League::Bronze));
    }

    #[test]
    fn test_global_rank_is_tier_dominant() {
        let members = vec![
            member("bronze_hero", 5000, 0, League::Bronze),
            member("diamond_idle", 10, 0, League::Diamond),
            member("gold_mid", 200, 0, League::Gold),
        ];

        let decisions = rank_and_reassign(&members);

        assert_eq!(decision_for(&decisions, "diamond_idle").global_rank, 1);
        assert_eq!(decision_for(&decisions, "gold_mid").global_rank, 2);
        assert_eq!(decision_for(&decisions, "bronze_hero").global_rank, 3);
    }

    #[test]
    fn test_tie_break_by_lifetime_xp() {
        let members = vec![
            member("veteran", 600, 9000, League::Bronze),
            member("rookie", 600, 100, League::Bronze),
        ];

        let decisions = rank_and_reassign(&members);
        assert_eq!(decision_for(&decisions, "veteran").league_rank, 1);
        assert_eq!(decision_for(&decisions, "rookie").league_rank, 2);
    }
}
