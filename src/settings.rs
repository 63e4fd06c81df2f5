//! Guild configuration edited from the dashboard: xp gain settings,
//! announcement channels, event settings and level roles.

pub mod queries;

use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;
use thiserror::Error;
use tracing::{info, instrument};

use crate::database::{self, Db};
use crate::snowflake;

pub const MAX_ATTENDANCE_BONUS_XP: i64 = 10_000;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Guild not found")]
    GuildNotFound,
    #[error("Level role not found")]
    LevelRoleNotFound,
    #[error("Minimum xp ({min}) must be between 0 and maximum xp ({max})")]
    InvalidXpRange { min: i64, max: i64 },
    #[error("Xp cooldown must not be negative")]
    NegativeCooldown,
    #[error("Attendance Bonus XP must be between 0 and 10000")]
    BonusOutOfRange,
    #[error("Invalid channel id: {0}")]
    InvalidChannel(String),
    #[error("Invalid level provided")]
    InvalidLevel,
    #[error("Invalid role ID provided")]
    InvalidRoleId,
    #[error("A level role for role {role} at level {level} already exists.")]
    DuplicateLevelRole { role: String, level: i64 },
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

// ---------------------------------------- Inputs -----------------------------------------

/// A channel id sent by the dashboard, either as a string or a number.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ChannelInput {
    Number(u64),
    Text(String),
}

impl ChannelInput {
    /// An empty string or 0 unsets the channel.
    fn resolve(input: Option<Self>) -> Result<Option<u64>, SettingsError> {
        match input {
            None | Some(Self::Number(0)) => Ok(None),
            Some(Self::Number(id)) => Ok(Some(id)),
            Some(Self::Text(text)) if text.trim().is_empty() => Ok(None),
            Some(Self::Text(text)) => snowflake::parse(&text)
                .map(Some)
                .ok_or(SettingsError::InvalidChannel(text)),
        }
    }
}

/// Tells a `null` field (`Some(None)`) apart from a missing one (`None`).
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

// ------------------------------------- Guild settings ----------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GuildSettings {
    pub min_xp: i64,
    pub max_xp: i64,
    #[serde(rename = "xp_cooldown")]
    pub cooldown: i64,
    #[serde(rename = "level_up_channel_id", serialize_with = "snowflake::serialize_opt")]
    pub level_up_channel: Option<u64>,
    #[serde(
        rename = "event_announcement_channel_id",
        serialize_with = "snowflake::serialize_opt"
    )]
    pub event_channel: Option<u64>,
    #[serde(rename = "achievement_channel_id", serialize_with = "snowflake::serialize_opt")]
    pub achievement_channel: Option<u64>,
}

impl Default for GuildSettings {
    fn default() -> Self {
        Self {
            min_xp: 5,
            max_xp: 15,
            cooldown: 60,
            level_up_channel: None,
            event_channel: None,
            achievement_channel: None,
        }
    }
}

impl GuildSettings {
    fn validate(&self) -> Result<(), SettingsError> {
        if self.min_xp < 0 || self.min_xp > self.max_xp {
            return Err(SettingsError::InvalidXpRange {
                min: self.min_xp,
                max: self.max_xp,
            });
        }
        if self.cooldown < 0 {
            return Err(SettingsError::NegativeCooldown);
        }
        Ok(())
    }
}

/// Partial update of [`GuildSettings`]. Only the fields present in the body change.
#[derive(Debug, Default, Deserialize)]
pub struct SettingsUpdate {
    pub min_xp: Option<i64>,
    pub max_xp: Option<i64>,
    pub xp_cooldown: Option<i64>,
    #[serde(default, deserialize_with = "present")]
    pub level_up_channel: Option<Option<ChannelInput>>,
    #[serde(default, deserialize_with = "present")]
    pub event_announcement_channel: Option<Option<ChannelInput>>,
    #[serde(default, deserialize_with = "present")]
    pub achievement_channel: Option<Option<ChannelInput>>,
}

impl SettingsUpdate {
    /// Apply the update to `settings`, which is left untouched if the result is invalid.
    pub fn apply(self, settings: &mut GuildSettings) -> Result<(), SettingsError> {
        let mut updated = *settings;
        if let Some(min_xp) = self.min_xp {
            updated.min_xp = min_xp;
        }
        if let Some(max_xp) = self.max_xp {
            updated.max_xp = max_xp;
        }
        if let Some(cooldown) = self.xp_cooldown {
            updated.cooldown = cooldown;
        }
        if let Some(channel) = self.level_up_channel {
            updated.level_up_channel = ChannelInput::resolve(channel)?;
        }
        if let Some(channel) = self.event_announcement_channel {
            updated.event_channel = ChannelInput::resolve(channel)?;
        }
        if let Some(channel) = self.achievement_channel {
            updated.achievement_channel = ChannelInput::resolve(channel)?;
        }

        updated.validate()?;
        *settings = updated;
        Ok(())
    }
}

// ------------------------------------- Event settings ----------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EventSettings {
    pub attendance_bonus_xp: i64,
    #[serde(rename = "event_channel_id", serialize_with = "snowflake::serialize_opt")]
    pub event_channel: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventSettingsUpdate {
    #[serde(default, deserialize_with = "present")]
    pub event_channel: Option<Option<ChannelInput>>,
    pub attendance_bonus_xp: Option<i64>,
}

impl EventSettingsUpdate {
    /// Apply the update to `settings`. Returns false if there was nothing to change.
    pub fn apply(self, settings: &mut EventSettings) -> Result<bool, SettingsError> {
        let mut updated = *settings;
        let mut changed = false;

        if let Some(channel) = self.event_channel {
            updated.event_channel = ChannelInput::resolve(channel)?;
            changed = true;
        }
        if let Some(bonus) = self.attendance_bonus_xp {
            if !(0..=MAX_ATTENDANCE_BONUS_XP).contains(&bonus) {
                return Err(SettingsError::BonusOutOfRange);
            }
            updated.attendance_bonus_xp = bonus;
            changed = true;
        }

        *settings = updated;
        Ok(changed)
    }
}

// --------------------------------------- Level roles -----------------------------------------

/// What happens to the role when a member reaches the level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleBehavior {
    #[default]
    Add,
    Remove,
}

impl RoleBehavior {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Remove => "remove",
        }
    }
}

impl FromStr for RoleBehavior {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" => Ok(Self::Add),
            "remove" => Ok(Self::Remove),
            other => Err(format!("unknown role behavior: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelRole {
    pub id: i64,
    pub level: i64,
    #[serde(serialize_with = "snowflake::serialize")]
    pub role_id: u64,
    pub role_name: Option<String>,
    pub behavior: RoleBehavior,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewLevelRole {
    pub level: i64,
    pub role_id: String,
    pub role_name: Option<String>,
    #[serde(default)]
    pub behavior: RoleBehavior,
}

impl NewLevelRole {
    /// Check the level and return the parsed role id.
    fn validate(&self) -> Result<u64, SettingsError> {
        if self.level < 1 {
            return Err(SettingsError::InvalidLevel);
        }
        snowflake::parse(&self.role_id).ok_or(SettingsError::InvalidRoleId)
    }
}

// ---------------------------------------- Operations -----------------------------------------

async fn ensure_guild(db: &Db, guild_id: u64) -> Result<(), SettingsError> {
    if database::guild_exists(db, guild_id).await? {
        Ok(())
    } else {
        Err(SettingsError::GuildNotFound)
    }
}

/// Settings of the guild. Rows holding the defaults are created if missing.
#[instrument(skip(db))]
pub async fn get_guild_settings(db: &Db, guild_id: u64) -> Result<GuildSettings, SettingsError> {
    ensure_guild(db, guild_id).await?;
    Ok(queries::fetch_guild_settings(db, guild_id).await?)
}

#[instrument(skip(db))]
pub async fn update_guild_settings(
    db: &Db,
    guild_id: u64,
    update: SettingsUpdate,
) -> Result<GuildSettings, SettingsError> {
    ensure_guild(db, guild_id).await?;

    let mut settings = queries::fetch_guild_settings(db, guild_id).await?;
    update.apply(&mut settings)?;
    queries::save_guild_settings(db, guild_id, &settings).await?;
    info!("Updated settings of guild {guild_id}: {settings:?}");

    Ok(settings)
}

#[instrument(skip(db))]
pub async fn get_event_settings(db: &Db, guild_id: u64) -> Result<EventSettings, SettingsError> {
    ensure_guild(db, guild_id).await?;
    Ok(queries::fetch_event_settings(db, guild_id).await?)
}

/// Returns false if the update had nothing to change.
#[instrument(skip(db))]
pub async fn update_event_settings(
    db: &Db,
    guild_id: u64,
    update: EventSettingsUpdate,
) -> Result<bool, SettingsError> {
    ensure_guild(db, guild_id).await?;

    let mut settings = queries::fetch_event_settings(db, guild_id).await?;
    if !update.apply(&mut settings)? {
        return Ok(false);
    }
    queries::save_event_settings(db, guild_id, &settings).await?;
    info!("Updated event settings of guild {guild_id}: {settings:?}");

    Ok(true)
}

#[instrument(skip(db))]
pub async fn list_level_roles(db: &Db, guild_id: u64) -> Result<Vec<LevelRole>, SettingsError> {
    ensure_guild(db, guild_id).await?;
    Ok(queries::fetch_level_roles(db, guild_id).await?)
}

/// Add a level role and return its id.
#[instrument(skip(db))]
pub async fn add_level_role(
    db: &Db,
    guild_id: u64,
    new_role: NewLevelRole,
) -> Result<i64, SettingsError> {
    ensure_guild(db, guild_id).await?;
    let role_id = new_role.validate()?;

    if queries::level_role_exists(db, guild_id, new_role.level, role_id).await? {
        return Err(SettingsError::DuplicateLevelRole {
            role: new_role.role_name.unwrap_or(new_role.role_id),
            level: new_role.level,
        });
    }

    let id = queries::insert_level_role(db, guild_id, role_id, &new_role).await?;
    info!("Added level role {id} to guild {guild_id}");

    Ok(id)
}

#[instrument(skip(db))]
pub async fn delete_level_role(db: &Db, guild_id: u64, id: i64) -> Result<(), SettingsError> {
    if queries::delete_level_role(db, guild_id, id).await? {
        info!("Deleted level role {id} of guild {guild_id}");
        Ok(())
    } else {
        Err(SettingsError::LevelRoleNotFound)
    }
}
