use serde::Serialize;

use super::{cumulative::XpCalculator, queries::MemberLevel};
use crate::snowflake::{self, from_i64};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    #[serde(serialize_with = "snowflake::serialize")]
    pub user_id: u64,
    pub username: String,
    pub avatar: Option<String>,
    pub level: i64,
    /// Cumulative xp, truncated
    pub xp: i64,
}

/// Rank members by cumulative xp, highest first.
///
/// Members with the same cumulative xp keep their input order, and ranks are
/// the 1-based positions in the sorted list.
pub fn rank_members(xp: &XpCalculator, members: Vec<MemberLevel>) -> Vec<LeaderboardEntry> {
    let mut scored: Vec<(f64, MemberLevel)> = members
        .into_iter()
        .map(|member| (xp.cumulative_xp(member.level, member.xp as f64), member))
        .collect();

    // Stable sort
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));

    scored
        .into_iter()
        .enumerate()
        .map(|(i, (cumulative, member))| LeaderboardEntry {
            rank: i + 1,
            user_id: from_i64(member.user_id),
            username: member.username,
            avatar: member.avatar,
            level: member.level,
            xp: cumulative as i64,
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    fn member(user_id: i64, level: i64, xp: i64) -> MemberLevel {
        MemberLevel {
            user_id,
            username: format!("user{user_id}"),
            avatar: None,
            level,
            xp,
        }
    }

    fn order(entries: &[LeaderboardEntry]) -> Vec<u64> {
        entries.iter().map(|e| e.user_id).collect()
    }

    #[test]
    fn highest_cumulative_xp_first() {
        let xp = XpCalculator::default();
        let members = vec![member(1, 5, 0), member(2, 3, 900), member(3, 5, 10)];

        let ranked = rank_members(&xp, members);

        assert_eq!(order(&ranked), vec![3, 1, 2]);
        assert_eq!(
            ranked.iter().map(|e| e.rank).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(ranked[0].xp, 2393);
        assert_eq!(ranked[1].xp, 2383);
        assert_eq!(ranked[2].xp, 1348);
        assert_eq!(ranked[2].level, 3);
    }

    #[test]
    fn xp_in_level_can_outrank_a_higher_level() {
        let xp = XpCalculator::default();
        // 448 + 900 at level 3 against 1170 at the start of level 4
        let members = vec![member(1, 4, 0), member(2, 3, 900)];

        let ranked = rank_members(&xp, members);

        assert_eq!(order(&ranked), vec![2, 1]);
    }

    #[test]
    fn ties_keep_input_order() {
        let xp = XpCalculator::default();
        let members = vec![
            member(7, 2, 50),
            member(4, 2, 50),
            member(9, 0, 150),
            member(1, 10, 0),
        ];

        let ranked = rank_members(&xp, members);

        assert_eq!(order(&ranked), vec![1, 7, 4, 9]);
        assert_eq!(ranked[1].xp, 150);
        assert_eq!(ranked[3].xp, 150);
    }

    #[test]
    fn empty_guild() {
        let xp = XpCalculator::default();
        assert!(rank_members(&xp, vec![]).is_empty());
    }

    #[test]
    fn ids_serialized_as_strings() {
        let xp = XpCalculator::default();
        let ranked = rank_members(&xp, vec![member(-1, 1, 5)]);

        let json = serde_json::to_value(&ranked[0]).unwrap();
        assert_eq!(json["user_id"], "18446744073709551615");
        assert_eq!(json["rank"], 1);
        assert_eq!(json["xp"], 5);
    }
}
