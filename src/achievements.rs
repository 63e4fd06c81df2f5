//! Achievements of a guild. They are defined from the dashboard and
//! unlocked by the bot, tier by tier.

pub mod queries;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::{info, instrument};

use crate::database::{self, Db};
use crate::levels::queries as levels;
use crate::snowflake;
use crate::timestamp;

/// Icon shown for achievements without an uploaded one.
pub const DEFAULT_ICON: &str = "medal";

#[derive(Debug, Error)]
pub enum AchievementError {
    #[error("Guild not found")]
    GuildNotFound,
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("Requirement value must not be negative")]
    NegativeRequirement,
    #[error("Tier {0} is defined more than once")]
    DuplicateTier(i64),
    #[error("Invalid role ID provided for tier {0}")]
    InvalidRewardRole(i64),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tier {
    pub tier_level: i64,
    pub title: String,
    pub requirement_value: i64,
    pub reward_xp: i64,
    #[serde(serialize_with = "snowflake::serialize_opt")]
    pub reward_role_id: Option<u64>,
    pub icon_path: Option<String>,
}

impl From<queries::TierSql> for Tier {
    fn from(value: queries::TierSql) -> Self {
        Self {
            tier_level: value.tier_level,
            title: value.title,
            requirement_value: value.requirement_value,
            reward_xp: value.reward_xp,
            reward_role_id: value.reward_role_id.map(snowflake::from_i64),
            icon_path: value.icon_path,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Achievement {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub category: String,
    pub icon: String,
    pub tiers: Vec<Tier>,
    /// Progress of the requested user, `None` if not started or no user given
    pub completed: Option<bool>,
    pub last_tier_achieved_at: Option<String>,
    pub members_completed: i64,
    pub member_count: i64,
}

/// Body of an achievement creation request. Required fields are checked by
/// [`AchievementForm::validate`] to name the missing one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AchievementForm {
    pub name: Option<String>,
    pub description: Option<String>,
    pub requirement_type: Option<String>,
    pub requirement_value: Option<i64>,
    #[serde(default)]
    pub tiers: Vec<TierForm>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TierForm {
    pub tier_level: i64,
    pub title: String,
    pub requirement_value: i64,
    #[serde(default)]
    pub reward_xp: i64,
    pub reward_role_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAchievement {
    pub name: String,
    pub description: String,
    pub requirement_type: String,
    pub requirement_value: i64,
    pub tiers: Vec<NewTier>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTier {
    pub tier_level: i64,
    pub title: String,
    pub requirement_value: i64,
    pub reward_xp: i64,
    pub reward_role_id: Option<u64>,
}

fn required<T>(field: Option<T>, name: &'static str) -> Result<T, AchievementError> {
    field.ok_or(AchievementError::MissingField(name))
}

impl AchievementForm {
    pub fn validate(self) -> Result<NewAchievement, AchievementError> {
        let name = required(self.name, "name")?;
        let description = required(self.description, "description")?;
        let requirement_type = required(self.requirement_type, "requirement_type")?;
        let requirement_value = required(self.requirement_value, "requirement_value")?;
        if requirement_value < 0 {
            return Err(AchievementError::NegativeRequirement);
        }

        let mut tier_levels = BTreeSet::new();
        let tiers = self
            .tiers
            .into_iter()
            .map(|tier| {
                if !tier_levels.insert(tier.tier_level) {
                    return Err(AchievementError::DuplicateTier(tier.tier_level));
                }
                let reward_role_id = match tier.reward_role_id.as_deref() {
                    None | Some("") => None,
                    Some(id) => Some(
                        snowflake::parse(id)
                            .ok_or(AchievementError::InvalidRewardRole(tier.tier_level))?,
                    ),
                };

                Ok(NewTier {
                    tier_level: tier.tier_level,
                    title: tier.title,
                    requirement_value: tier.requirement_value,
                    reward_xp: tier.reward_xp,
                    reward_role_id,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(NewAchievement {
            name,
            description,
            requirement_type,
            requirement_value,
            tiers,
        })
    }
}

async fn ensure_guild(db: &Db, guild_id: u64) -> Result<(), AchievementError> {
    if database::guild_exists(db, guild_id).await? {
        Ok(())
    } else {
        Err(AchievementError::GuildNotFound)
    }
}

/// Achievements of the guild, newest first.
///
/// `completed` and `last_tier_achieved_at` are the progress of `user_id`.
#[instrument(skip(db))]
pub async fn list_achievements(
    db: &Db,
    guild_id: u64,
    user_id: Option<u64>,
) -> Result<Vec<Achievement>, AchievementError> {
    ensure_guild(db, guild_id).await?;

    let member_count = levels::count_members(db, guild_id).await?;
    let achievements = queries::get_achievements(db, guild_id, user_id).await?;

    let mut tiers: BTreeMap<i64, Vec<Tier>> = BTreeMap::new();
    for tier in queries::get_tiers(db, guild_id).await? {
        tiers.entry(tier.achievement_id).or_default().push(tier.into());
    }

    let achievements = achievements
        .into_iter()
        .map(|a| Achievement {
            tiers: tiers.remove(&a.id).unwrap_or_default(),
            id: a.id,
            name: a.name,
            description: a.description,
            category: a.requirement_type,
            icon: a.icon_path.unwrap_or_else(|| DEFAULT_ICON.to_string()),
            completed: a.completed,
            last_tier_achieved_at: a.last_tier_achieved_at.and_then(timestamp::iso),
            members_completed: a.members_completed,
            member_count,
        })
        .collect();

    Ok(achievements)
}

/// Create an achievement and return its id.
#[instrument(skip(db, form))]
pub async fn create_achievement(
    db: &Db,
    guild_id: u64,
    form: AchievementForm,
    now: i64,
) -> Result<i64, AchievementError> {
    ensure_guild(db, guild_id).await?;
    let new = form.validate()?;

    let id = queries::insert_achievement(db, guild_id, &new, now).await?;
    info!(
        "Created achievement {id} '{}' with {} tiers in guild {guild_id}",
        new.name,
        new.tiers.len()
    );

    Ok(id)
}

#[cfg(test)]
mod test {
    use super::*;

    fn form(json: &str) -> AchievementForm {
        serde_json::from_str(json).unwrap()
    }

    async fn db_with_guild() -> Db {
        let db = Db::in_memory().await;
        sqlx::query(
            "INSERT INTO guilds (guild_id, name) VALUES (1, 'guild');
            INSERT INTO users (discord_id, username) VALUES (10, 'alice'), (11, 'bob');
            INSERT INTO levels (user_id, guild_id, level, xp) VALUES (10, 1, 1, 0), (11, 1, 2, 0);",
        )
        .execute(&db.pool)
        .await
        .unwrap();
        db
    }

    #[test]
    fn missing_fields_are_named() {
        let result = form(r#"{"name": "Chatterbox", "requirement_type": "messages"}"#).validate();
        assert!(matches!(
            result,
            Err(AchievementError::MissingField("description"))
        ));

        let result = form(
            r#"{"name": "a", "description": "b", "requirement_type": "messages"}"#,
        )
        .validate();
        assert_eq!(
            result.unwrap_err().to_string(),
            "Missing required field: requirement_value"
        );
    }

    #[test]
    fn tiers_are_checked() {
        let base = r#""name": "a", "description": "b", "requirement_type": "messages", "requirement_value": 10"#;

        let duplicate = form(&format!(
            r#"{{{base}, "tiers": [
                {{"tier_level": 1, "title": "Bronze", "requirement_value": 10}},
                {{"tier_level": 1, "title": "Silver", "requirement_value": 50}}
            ]}}"#
        ));
        assert!(matches!(
            duplicate.validate(),
            Err(AchievementError::DuplicateTier(1))
        ));

        let bad_role = form(&format!(
            r#"{{{base}, "tiers": [
                {{"tier_level": 2, "title": "Gold", "requirement_value": 10, "reward_role_id": "gold"}}
            ]}}"#
        ));
        assert!(matches!(
            bad_role.validate(),
            Err(AchievementError::InvalidRewardRole(2))
        ));

        let valid = form(&format!(
            r#"{{{base}, "tiers": [
                {{"tier_level": 1, "title": "Bronze", "requirement_value": 10, "reward_role_id": ""}},
                {{"tier_level": 2, "title": "Gold", "requirement_value": 90, "reward_xp": 500, "reward_role_id": "77"}}
            ]}}"#
        ))
        .validate()
        .unwrap();
        assert_eq!(valid.tiers[0].reward_role_id, None);
        assert_eq!(valid.tiers[1].reward_role_id, Some(77));
        assert_eq!(valid.tiers[1].reward_xp, 500);
    }

    #[tokio::test]
    async fn created_achievements_are_listed() {
        let db = db_with_guild().await;

        let first = create_achievement(
            &db,
            1,
            form(r#"{"name": "Chatterbox", "description": "Talk", "requirement_type": "messages",
                "requirement_value": 100, "tiers": [
                    {"tier_level": 2, "title": "Silver", "requirement_value": 500, "reward_xp": 50},
                    {"tier_level": 1, "title": "Bronze", "requirement_value": 100, "reward_role_id": "900"}
                ]}"#),
            1000,
        )
        .await
        .unwrap();
        let second = create_achievement(
            &db,
            1,
            form(r#"{"name": "Regular", "description": "Stay", "requirement_type": "voice",
                "requirement_value": 3600}"#),
            2000,
        )
        .await
        .unwrap();

        sqlx::query(
            "INSERT INTO user_achievements (user_id, guild_id, achievement_id, completed, last_tier_achieved_at)
                VALUES (10, 1, ?, TRUE, 1792420200), (11, 1, ?, TRUE, NULL)",
        )
        .bind(first)
        .bind(first)
        .execute(&db.pool)
        .await
        .unwrap();

        let achievements = list_achievements(&db, 1, Some(10)).await.unwrap();
        assert_eq!(
            achievements.iter().map(|a| a.id).collect::<Vec<_>>(),
            vec![second, first]
        );

        let regular = &achievements[0];
        assert_eq!(regular.icon, DEFAULT_ICON);
        assert_eq!(regular.category, "voice");
        assert_eq!(regular.completed, None);
        assert!(regular.tiers.is_empty());
        assert_eq!(regular.member_count, 2);

        let chatterbox = &achievements[1];
        assert_eq!(chatterbox.completed, Some(true));
        assert_eq!(
            chatterbox.last_tier_achieved_at.as_deref(),
            Some("2026-10-19T14:30:00Z")
        );
        assert_eq!(chatterbox.members_completed, 2);
        assert_eq!(
            chatterbox
                .tiers
                .iter()
                .map(|t| (t.tier_level, t.title.as_str(), t.reward_role_id))
                .collect::<Vec<_>>(),
            vec![(1, "Bronze", Some(900)), (2, "Silver", None)]
        );

        // Without a user, no personal progress
        let anonymous = list_achievements(&db, 1, None).await.unwrap();
        assert_eq!(anonymous[1].completed, None);
        assert_eq!(anonymous[1].members_completed, 2);
    }

    #[tokio::test]
    async fn unknown_guild() {
        let db = db_with_guild().await;

        assert!(matches!(
            list_achievements(&db, 2, None).await,
            Err(AchievementError::GuildNotFound)
        ));
        assert!(matches!(
            create_achievement(&db, 2, AchievementForm::default(), 0).await,
            Err(AchievementError::GuildNotFound)
        ));
    }
}
