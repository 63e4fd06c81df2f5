use sqlx::FromRow;
use tracing::{instrument, warn};

use super::{EventSettings, GuildSettings, LevelRole, NewLevelRole};
use crate::database::Db;
use crate::snowflake::{from_i64, to_i64};

#[derive(Debug, Clone, Copy, FromRow)]
struct GuildSettingsSql {
    min_xp: i64,
    max_xp: i64,
    cooldown: i64,
    level_up_channel: Option<i64>,
    event_channel: Option<i64>,
    achievement_channel: Option<i64>,
}

impl From<GuildSettingsSql> for GuildSettings {
    fn from(value: GuildSettingsSql) -> Self {
        Self {
            min_xp: value.min_xp,
            max_xp: value.max_xp,
            cooldown: value.cooldown,
            level_up_channel: value.level_up_channel.map(from_i64),
            event_channel: value.event_channel.map(from_i64),
            achievement_channel: value.achievement_channel.map(from_i64),
        }
    }
}

#[derive(Debug, Clone, Copy, FromRow)]
struct EventSettingsSql {
    attendance_bonus_xp: i64,
    event_channel: Option<i64>,
}

impl From<EventSettingsSql> for EventSettings {
    fn from(value: EventSettingsSql) -> Self {
        Self {
            attendance_bonus_xp: value.attendance_bonus_xp,
            event_channel: value.event_channel.map(from_i64),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
struct LevelRoleSql {
    id: i64,
    level: i64,
    role_id: i64,
    role_name: Option<String>,
    behavior: String,
}

impl From<LevelRoleSql> for LevelRole {
    fn from(value: LevelRoleSql) -> Self {
        let behavior = value.behavior.parse().unwrap_or_else(|e| {
            warn!("Level role {}: {e}, using default", value.id);
            Default::default()
        });

        Self {
            id: value.id,
            level: value.level,
            role_id: from_i64(value.role_id),
            role_name: value.role_name,
            behavior,
        }
    }
}

/// Return the settings of the guild.
///
/// If the guild has no settings yet, rows holding the default values are
/// created first.
#[instrument]
pub async fn fetch_guild_settings(db: &Db, guild_id: u64) -> Result<GuildSettings, sqlx::Error> {
    let guild_id = to_i64(guild_id);

    sqlx::query(
        "INSERT OR IGNORE INTO server_xp_settings (guild_id) VALUES (?);
        INSERT OR IGNORE INTO server_config (guild_id) VALUES (?)",
    )
    .bind(guild_id)
    .bind(guild_id)
    .execute(&db.pool)
    .await?;

    let settings = sqlx::query_as::<_, GuildSettingsSql>(
        "SELECT x.min_xp, x.max_xp, x.cooldown,
                c.level_up_channel, c.event_channel, c.achievement_channel
            FROM server_xp_settings x
            JOIN server_config c ON c.guild_id = x.guild_id
            WHERE x.guild_id = ?",
    )
    .bind(guild_id)
    .fetch_one(&db.pool)
    .await?;

    Ok(settings.into())
}

/// Update the guild's settings rows with new values.
#[instrument]
pub async fn save_guild_settings(
    db: &Db,
    guild_id: u64,
    settings: &GuildSettings,
) -> Result<(), sqlx::Error> {
    let guild_id = to_i64(guild_id);
    let mut tx = db.pool.begin().await?;

    sqlx::query(
        "UPDATE server_xp_settings
            SET min_xp = ?, max_xp = ?, cooldown = ?
            WHERE guild_id = ?",
    )
    .bind(settings.min_xp)
    .bind(settings.max_xp)
    .bind(settings.cooldown)
    .bind(guild_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "UPDATE server_config
            SET level_up_channel = ?, event_channel = ?, achievement_channel = ?
            WHERE guild_id = ?",
    )
    .bind(settings.level_up_channel.map(to_i64))
    .bind(settings.event_channel.map(to_i64))
    .bind(settings.achievement_channel.map(to_i64))
    .bind(guild_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await
}

/// Return the event settings of the guild, created with default values if missing.
#[instrument]
pub async fn fetch_event_settings(db: &Db, guild_id: u64) -> Result<EventSettings, sqlx::Error> {
    let guild_id = to_i64(guild_id);

    sqlx::query(
        "INSERT OR IGNORE INTO guild_event_settings (guild_id) VALUES (?);
        INSERT OR IGNORE INTO server_config (guild_id) VALUES (?)",
    )
    .bind(guild_id)
    .bind(guild_id)
    .execute(&db.pool)
    .await?;

    let settings = sqlx::query_as::<_, EventSettingsSql>(
        "SELECT e.attendance_bonus_xp, c.event_channel
            FROM guild_event_settings e
            JOIN server_config c ON c.guild_id = e.guild_id
            WHERE e.guild_id = ?",
    )
    .bind(guild_id)
    .fetch_one(&db.pool)
    .await?;

    Ok(settings.into())
}

#[instrument]
pub async fn save_event_settings(
    db: &Db,
    guild_id: u64,
    settings: &EventSettings,
) -> Result<(), sqlx::Error> {
    let guild_id = to_i64(guild_id);
    let mut tx = db.pool.begin().await?;

    sqlx::query("UPDATE guild_event_settings SET attendance_bonus_xp = ? WHERE guild_id = ?")
        .bind(settings.attendance_bonus_xp)
        .bind(guild_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("UPDATE server_config SET event_channel = ? WHERE guild_id = ?")
        .bind(settings.event_channel.map(to_i64))
        .bind(guild_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await
}

/// Level roles of the guild, lowest level first.
#[instrument]
pub async fn fetch_level_roles(db: &Db, guild_id: u64) -> Result<Vec<LevelRole>, sqlx::Error> {
    let guild_id = to_i64(guild_id);

    let roles = sqlx::query_as::<_, LevelRoleSql>(
        "SELECT id, level, role_id, role_name, behavior FROM level_roles
            WHERE guild_id = ?
            ORDER BY level, id",
    )
    .bind(guild_id)
    .fetch_all(&db.pool)
    .await?;

    Ok(roles.into_iter().map(LevelRole::from).collect())
}

#[instrument]
pub async fn level_role_exists(
    db: &Db,
    guild_id: u64,
    level: i64,
    role_id: u64,
) -> Result<bool, sqlx::Error> {
    let found = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM level_roles WHERE guild_id = ? AND level = ? AND role_id = ?",
    )
    .bind(to_i64(guild_id))
    .bind(level)
    .bind(to_i64(role_id))
    .fetch_one(&db.pool)
    .await?;

    Ok(found > 0)
}

/// Insert a level role and return its id.
#[instrument]
pub async fn insert_level_role(
    db: &Db,
    guild_id: u64,
    role_id: u64,
    role: &NewLevelRole,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO level_roles (guild_id, level, role_id, role_name, behavior)
            VALUES (?, ?, ?, ?, ?)",
    )
    .bind(to_i64(guild_id))
    .bind(role.level)
    .bind(to_i64(role_id))
    .bind(role.role_name.as_deref())
    .bind(role.behavior.as_str())
    .execute(&db.pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Delete a level role of the guild. Returns false if there was none with this id.
#[instrument]
pub async fn delete_level_role(db: &Db, guild_id: u64, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM level_roles WHERE id = ? AND guild_id = ?")
        .bind(id)
        .bind(to_i64(guild_id))
        .execute(&db.pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
