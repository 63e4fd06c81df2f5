use sqlx::FromRow;
use tracing::instrument;

use crate::database::Db;
use crate::snowflake::to_i64;

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct GuildSql {
    pub owner_id: Option<i64>,
    pub created_at: Option<i64>,
    pub channel_count: Option<i64>,
    pub preferred_locale: Option<String>,
}

/// Last xp gain of a member.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct XpGainSql {
    pub username: String,
    pub level: i64,
    pub last_xp_time: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct UnlockSql {
    pub username: String,
    pub achievement_name: String,
    pub last_tier_achieved_at: i64,
}

#[instrument]
pub async fn get_guild(db: &Db, guild_id: u64) -> Result<Option<GuildSql>, sqlx::Error> {
    let guild_id = to_i64(guild_id);

    sqlx::query_as::<_, GuildSql>(
        "SELECT owner_id, created_at, channel_count, preferred_locale
            FROM guilds WHERE guild_id = ?",
    )
    .bind(guild_id)
    .fetch_optional(&db.pool)
    .await
}

/// Members who gained xp most recently.
#[instrument]
pub async fn recent_xp_gains(
    db: &Db,
    guild_id: u64,
    limit: i64,
) -> Result<Vec<XpGainSql>, sqlx::Error> {
    let guild_id = to_i64(guild_id);

    sqlx::query_as::<_, XpGainSql>(
        "SELECT u.username, lvl.level, lvl.last_xp_time
            FROM levels lvl
            JOIN users u ON lvl.user_id = u.discord_id
            WHERE lvl.guild_id = ? AND lvl.last_xp_time IS NOT NULL
            ORDER BY lvl.last_xp_time DESC
            LIMIT ?",
    )
    .bind(guild_id)
    .bind(limit)
    .fetch_all(&db.pool)
    .await
}

/// Achievements most recently completed in the guild.
#[instrument]
pub async fn recent_unlocks(
    db: &Db,
    guild_id: u64,
    limit: i64,
) -> Result<Vec<UnlockSql>, sqlx::Error> {
    let guild_id = to_i64(guild_id);

    sqlx::query_as::<_, UnlockSql>(
        "SELECT u.username, a.name AS achievement_name, ua.last_tier_achieved_at
            FROM user_achievements ua
            JOIN users u ON ua.user_id = u.discord_id
            JOIN achievements a ON ua.achievement_id = a.id
            WHERE ua.guild_id = ?
                AND ua.completed = TRUE
                AND ua.last_tier_achieved_at IS NOT NULL
            ORDER BY ua.last_tier_achieved_at DESC
            LIMIT ?",
    )
    .bind(guild_id)
    .bind(limit)
    .fetch_all(&db.pool)
    .await
}

/// Distinct members whose last xp gain is in `[from, to)`.
#[instrument]
pub async fn count_xp_gainers(
    db: &Db,
    guild_id: u64,
    from: i64,
    to: i64,
) -> Result<i64, sqlx::Error> {
    let guild_id = to_i64(guild_id);

    sqlx::query_scalar(
        "SELECT COUNT(DISTINCT user_id) FROM levels
            WHERE guild_id = ? AND last_xp_time >= ? AND last_xp_time < ?",
    )
    .bind(guild_id)
    .bind(from)
    .bind(to)
    .fetch_one(&db.pool)
    .await
}
