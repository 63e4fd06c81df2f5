use sqlx::FromRow;
use tracing::instrument;

use super::NewAchievement;
use crate::database::Db;
use crate::snowflake::to_i64;

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct AchievementSql {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub requirement_type: String,
    pub icon_path: Option<String>,
    /// `None` when the user has not started the achievement
    pub completed: Option<bool>,
    pub last_tier_achieved_at: Option<i64>,
    pub members_completed: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct TierSql {
    pub achievement_id: i64,
    pub tier_level: i64,
    pub title: String,
    pub requirement_value: i64,
    pub reward_xp: i64,
    pub reward_role_id: Option<i64>,
    pub icon_path: Option<String>,
}

/// Achievements of the guild, newest first, with the progress of `user_id`.
#[instrument]
pub async fn get_achievements(
    db: &Db,
    guild_id: u64,
    user_id: Option<u64>,
) -> Result<Vec<AchievementSql>, sqlx::Error> {
    let guild_id = to_i64(guild_id);

    sqlx::query_as::<_, AchievementSql>(
        "SELECT a.id, a.name, a.description, a.requirement_type, a.icon_path,
                ua.completed, ua.last_tier_achieved_at,
                (SELECT COUNT(*) FROM user_achievements ua2
                    WHERE ua2.achievement_id = a.id
                        AND ua2.guild_id = a.guild_id
                        AND ua2.completed = TRUE) AS members_completed
            FROM achievements a
            LEFT JOIN user_achievements ua ON ua.achievement_id = a.id
                AND ua.guild_id = a.guild_id
                AND ua.user_id = ?
            WHERE a.guild_id = ?
            ORDER BY a.created_at DESC, a.id DESC",
    )
    .bind(user_id.map(to_i64))
    .bind(guild_id)
    .fetch_all(&db.pool)
    .await
}

/// Tiers of every achievement of the guild, by achievement then tier level.
#[instrument]
pub async fn get_tiers(db: &Db, guild_id: u64) -> Result<Vec<TierSql>, sqlx::Error> {
    let guild_id = to_i64(guild_id);

    sqlx::query_as::<_, TierSql>(
        "SELECT achievement_id, tier_level, title, requirement_value, reward_xp,
                reward_role_id, icon_path
            FROM achievement_tiers
            WHERE achievement_id IN (SELECT id FROM achievements WHERE guild_id = ?)
            ORDER BY achievement_id, tier_level",
    )
    .bind(guild_id)
    .fetch_all(&db.pool)
    .await
}

/// Insert the achievement and its tiers, and return the achievement id.
#[instrument(skip(new))]
pub async fn insert_achievement(
    db: &Db,
    guild_id: u64,
    new: &NewAchievement,
    created_at: i64,
) -> Result<i64, sqlx::Error> {
    let guild_id = to_i64(guild_id);
    let mut tx = db.pool.begin().await?;

    let id = sqlx::query(
        "INSERT INTO achievements
            (guild_id, name, description, requirement_type, requirement_value, created_at)
            VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(guild_id)
    .bind(&new.name)
    .bind(&new.description)
    .bind(&new.requirement_type)
    .bind(new.requirement_value)
    .bind(created_at)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    for tier in &new.tiers {
        sqlx::query(
            "INSERT INTO achievement_tiers
                (achievement_id, tier_level, title, requirement_value, reward_xp, reward_role_id)
                VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(tier.tier_level)
        .bind(&tier.title)
        .bind(tier.requirement_value)
        .bind(tier.reward_xp)
        .bind(tier.reward_role_id.map(to_i64))
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(id)
}
