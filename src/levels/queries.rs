use sqlx::FromRow;
use tracing::instrument;

use crate::database::Db;
use crate::snowflake::to_i64;

/// Level progress of a user in a guild, as stored by the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow)]
pub struct LevelXp {
    pub level: i64,
    pub xp: i64,
}

/// A `levels` row joined with the user's profile.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct MemberLevel {
    pub user_id: i64,
    pub username: String,
    pub avatar: Option<String>,
    pub level: i64,
    pub xp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow)]
pub struct UserLevelSql {
    pub level: i64,
    pub xp: i64,
    pub voice_time_seconds: Option<i64>,
}

/// Number of distinct users with a level entry in the guild.
#[instrument]
pub async fn count_members(db: &Db, guild_id: u64) -> Result<i64, sqlx::Error> {
    let guild_id = to_i64(guild_id);

    sqlx::query_scalar("SELECT COUNT(DISTINCT user_id) FROM levels WHERE guild_id = ?")
        .bind(guild_id)
        .fetch_one(&db.pool)
        .await
}

/// Number of distinct users who gained xp since the `since` unix timestamp.
#[instrument]
pub async fn count_active_members(db: &Db, guild_id: u64, since: i64) -> Result<i64, sqlx::Error> {
    let guild_id = to_i64(guild_id);

    sqlx::query_scalar(
        "SELECT COUNT(DISTINCT user_id) FROM levels
            WHERE guild_id = ? AND last_xp_time >= ?",
    )
    .bind(guild_id)
    .bind(since)
    .fetch_one(&db.pool)
    .await
}

#[instrument]
pub async fn get_guild_levels(db: &Db, guild_id: u64) -> Result<Vec<LevelXp>, sqlx::Error> {
    let guild_id = to_i64(guild_id);

    sqlx::query_as::<_, LevelXp>("SELECT level, xp FROM levels WHERE guild_id = ?")
        .bind(guild_id)
        .fetch_all(&db.pool)
        .await
}

#[instrument]
pub async fn sum_guild_levels(db: &Db, guild_id: u64) -> Result<i64, sqlx::Error> {
    let guild_id = to_i64(guild_id);

    let sum = sqlx::query_scalar::<_, Option<i64>>("SELECT SUM(level) FROM levels WHERE guild_id = ?")
        .bind(guild_id)
        .fetch_one(&db.pool)
        .await?;

    Ok(sum.unwrap_or_default())
}

/// Get at most `limit` members of the guild, highest level and xp first.
///
/// Only a pre-selection: the final order is given by the cumulative xp.
#[instrument]
pub async fn get_top_members(
    db: &Db,
    guild_id: u64,
    limit: i64,
) -> Result<Vec<MemberLevel>, sqlx::Error> {
    let guild_id = to_i64(guild_id);

    sqlx::query_as::<_, MemberLevel>(
        "SELECT u.discord_id AS user_id, u.username, u.avatar, lvl.level, lvl.xp
            FROM levels lvl
            JOIN users u ON lvl.user_id = u.discord_id
            WHERE lvl.guild_id = ?
            ORDER BY lvl.level DESC, lvl.xp DESC
            LIMIT ?",
    )
    .bind(guild_id)
    .bind(limit)
    .fetch_all(&db.pool)
    .await
}

/// All level entries of a user, one per guild.
#[instrument]
pub async fn get_user_levels(db: &Db, user_id: u64) -> Result<Vec<UserLevelSql>, sqlx::Error> {
    let user_id = to_i64(user_id);

    sqlx::query_as::<_, UserLevelSql>(
        "SELECT level, xp, voice_time_seconds FROM levels WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_all(&db.pool)
    .await
}

#[instrument]
pub async fn get_username(db: &Db, user_id: u64) -> Result<Option<String>, sqlx::Error> {
    let user_id = to_i64(user_id);

    sqlx::query_scalar("SELECT username FROM users WHERE discord_id = ?")
        .bind(user_id)
        .fetch_optional(&db.pool)
        .await
}

#[instrument]
pub async fn count_user_guilds(db: &Db, user_id: u64) -> Result<i64, sqlx::Error> {
    let user_id = to_i64(user_id);

    sqlx::query_scalar("SELECT COUNT(*) FROM user_guild WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(&db.pool)
        .await
}

/// Completed achievements of one user, or of everyone if `user_id` is `None`.
#[instrument]
pub async fn count_completed_achievements(
    db: &Db,
    user_id: Option<u64>,
) -> Result<i64, sqlx::Error> {
    match user_id {
        Some(user_id) => {
            sqlx::query_scalar(
                "SELECT COUNT(*) FROM user_achievements WHERE user_id = ? AND completed = TRUE",
            )
            .bind(to_i64(user_id))
            .fetch_one(&db.pool)
            .await
        }
        None => {
            sqlx::query_scalar("SELECT COUNT(*) FROM user_achievements WHERE completed = TRUE")
                .fetch_one(&db.pool)
                .await
        }
    }
}

#[instrument]
pub async fn count_users(db: &Db) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&db.pool)
        .await
}

#[instrument]
pub async fn count_guilds(db: &Db) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM guilds")
        .fetch_one(&db.pool)
        .await
}

/// Sum of the xp stored in every `levels` row, without converting to cumulative xp.
#[instrument]
pub async fn sum_stored_xp(db: &Db) -> Result<i64, sqlx::Error> {
    let sum = sqlx::query_scalar::<_, Option<i64>>("SELECT SUM(xp) FROM levels")
        .fetch_one(&db.pool)
        .await?;

    Ok(sum.unwrap_or_default())
}
