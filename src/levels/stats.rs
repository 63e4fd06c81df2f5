use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, instrument};

use super::{cumulative::XpCalculator, queries, LevelsError};
use crate::database::Db;

/// Seconds without xp gain after which a member no longer counts as active.
pub const ACTIVE_WINDOW: i64 = 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GuildStats {
    pub member_count: i64,
    pub active_users: i64,
    pub total_xp: i64,
    pub total_levels: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserStats {
    pub username: Option<String>,
    pub total_xp: i64,
    pub total_guilds: i64,
    pub achievements: i64,
    pub average_level: f64,
    pub total_voice_seconds: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminStats {
    pub total_users: i64,
    pub total_guilds: i64,
    /// Raw xp stored in the levels table
    pub total_xp_earned: i64,
    pub total_achievements: i64,
}

/// Sum of the cumulative xp of every `(level, xp)` entry.
pub fn total_cumulative_xp<I>(xp: &XpCalculator, entries: I) -> f64
where
    I: IntoIterator<Item = (i64, i64)>,
{
    entries
        .into_iter()
        .map(|(level, current)| xp.cumulative_xp(level, current as f64))
        .sum()
}

/// Mean of `levels` rounded to one decimal, 0 if empty.
pub fn average_level(levels: &[i64]) -> f64 {
    if levels.is_empty() {
        return 0.0;
    }

    let mean = levels.iter().sum::<i64>() as f64 / levels.len() as f64;
    (mean * 10.0).round_ties_even() / 10.0
}

#[instrument(skip(db, xp))]
pub async fn guild_stats(
    db: &Db,
    xp: &Arc<XpCalculator>,
    guild_id: u64,
    active_since: i64,
) -> Result<GuildStats, LevelsError> {
    let member_count = queries::count_members(db, guild_id).await?;
    let active_users = queries::count_active_members(db, guild_id, active_since).await?;
    let levels = queries::get_guild_levels(db, guild_id).await?;
    let total_levels = queries::sum_guild_levels(db, guild_id).await?;

    let total_xp = xp
        .blocking(move |xp| total_cumulative_xp(xp, levels.iter().map(|l| (l.level, l.xp))))
        .await?;
    debug!("Guild {guild_id}: {member_count} members, {total_xp} cumulative xp");

    Ok(GuildStats {
        member_count,
        active_users,
        total_xp: total_xp as i64,
        total_levels,
    })
}

#[instrument(skip(db, xp))]
pub async fn user_stats(
    db: &Db,
    xp: &Arc<XpCalculator>,
    user_id: u64,
) -> Result<UserStats, LevelsError> {
    let rows = queries::get_user_levels(db, user_id).await?;

    let entries: Vec<(i64, i64)> = rows.iter().map(|r| (r.level, r.xp)).collect();
    let total_xp = xp
        .blocking(move |xp| total_cumulative_xp(xp, entries))
        .await?;
    let levels: Vec<i64> = rows.iter().map(|r| r.level).collect();
    let total_voice_seconds = rows
        .iter()
        .map(|r| r.voice_time_seconds.unwrap_or_default())
        .sum();

    Ok(UserStats {
        username: queries::get_username(db, user_id).await?,
        total_xp: total_xp as i64,
        total_guilds: queries::count_user_guilds(db, user_id).await?,
        achievements: queries::count_completed_achievements(db, Some(user_id)).await?,
        average_level: average_level(&levels),
        total_voice_seconds,
    })
}

#[instrument(skip(db))]
pub async fn admin_stats(db: &Db) -> Result<AdminStats, sqlx::Error> {
    Ok(AdminStats {
        total_users: queries::count_users(db).await?,
        total_guilds: queries::count_guilds(db).await?,
        total_xp_earned: queries::sum_stored_xp(db).await?,
        total_achievements: queries::count_completed_achievements(db, None).await?,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::snowflake::to_i64;

    async fn seeded_db() -> Db {
        let db = Db::in_memory().await;

        sqlx::query(
            "INSERT INTO guilds (guild_id, name) VALUES (1, 'one'), (2, 'two');
            INSERT INTO users (discord_id, username) VALUES (10, 'alice'), (11, 'bob'), (12, 'carol');
            INSERT INTO user_guild (user_id, guild_id) VALUES (10, 1), (10, 2), (11, 1);
            INSERT INTO levels (user_id, guild_id, level, xp, last_xp_time, voice_time_seconds) VALUES
                (10, 1, 5, 0, 1000, 120),
                (11, 1, 3, 900, 10, NULL),
                (12, 1, 5, 10, 999, 30),
                (10, 2, 2, 50, 5000, 60);
            INSERT INTO user_achievements (user_id, guild_id, achievement_id, completed) VALUES
                (10, 1, 1, TRUE), (10, 1, 2, FALSE), (10, 2, 3, TRUE), (11, 1, 1, TRUE);",
        )
        .execute(&db.pool)
        .await
        .unwrap();

        db
    }

    #[test]
    fn average_level_rounding() {
        assert_eq!(average_level(&[]), 0.0);
        assert_eq!(average_level(&[5, 2]), 3.5);
        assert_eq!(average_level(&[1, 1, 2]), 1.3);
        assert_eq!(average_level(&[7]), 7.0);
    }

    #[test]
    fn total_cumulative_xp_sums_entries() {
        let xp = XpCalculator::default();

        let total = total_cumulative_xp(&xp, [(0, -5), (0, 5), (2, 50)]);
        assert_eq!(total, 155.0);
    }

    #[tokio::test]
    async fn guild_stats_for_seeded_guild() {
        let db = seeded_db().await;
        let xp = Arc::new(XpCalculator::default());

        let stats = guild_stats(&db, &xp, 1, 999).await.unwrap();

        assert_eq!(stats.member_count, 3);
        assert_eq!(stats.active_users, 2);
        assert_eq!(stats.total_levels, 13);
        // 2383.26 + 1348.22 + 2393.26
        assert_eq!(stats.total_xp, 6124);
    }

    #[tokio::test]
    async fn guild_stats_for_empty_guild() {
        let db = seeded_db().await;
        let xp = Arc::new(XpCalculator::default());

        let stats = guild_stats(&db, &xp, 3, 0).await.unwrap();

        assert_eq!(
            stats,
            GuildStats {
                member_count: 0,
                active_users: 0,
                total_xp: 0,
                total_levels: 0,
            }
        );
    }

    #[tokio::test]
    async fn user_stats_across_guilds() {
        let db = seeded_db().await;
        let xp = Arc::new(XpCalculator::default());

        let stats = user_stats(&db, &xp, 10).await.unwrap();

        assert_eq!(stats.username.as_deref(), Some("alice"));
        // 2383.26 + 150
        assert_eq!(stats.total_xp, 2533);
        assert_eq!(stats.total_guilds, 2);
        assert_eq!(stats.achievements, 2);
        assert_eq!(stats.average_level, 3.5);
        assert_eq!(stats.total_voice_seconds, 180);
    }

    #[tokio::test]
    async fn user_stats_without_levels() {
        let db = seeded_db().await;
        let xp = Arc::new(XpCalculator::default());

        let stats = user_stats(&db, &xp, 99).await.unwrap();

        assert_eq!(stats.username, None);
        assert_eq!(stats.total_xp, 0);
        assert_eq!(stats.average_level, 0.0);
    }

    #[tokio::test]
    async fn large_ids_are_found() {
        let db = seeded_db().await;
        let xp = Arc::new(XpCalculator::default());
        let user_id = u64::MAX - 1;

        sqlx::query("INSERT INTO levels (user_id, guild_id, level, xp) VALUES (?, 2, 1, 40)")
            .bind(to_i64(user_id))
            .execute(&db.pool)
            .await
            .unwrap();

        let stats = user_stats(&db, &xp, user_id).await.unwrap();
        assert_eq!(stats.total_xp, 40);
    }

    #[tokio::test]
    async fn admin_stats_totals() {
        let db = seeded_db().await;

        let stats = admin_stats(&db).await.unwrap();

        assert_eq!(
            stats,
            AdminStats {
                total_users: 3,
                total_guilds: 2,
                total_xp_earned: 960,
                total_achievements: 3,
            }
        );
    }
}
