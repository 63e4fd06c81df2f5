//! Guild overview: details of the guild, its recent activity and the
//! activity chart of the last days.

pub mod queries;

use serde::Serialize;
use std::cmp::Reverse;
use tracing::{debug, instrument};

use crate::database::Db;
use crate::levels::queries as levels;
use crate::snowflake::from_i64;
use crate::timestamp::{self, DAY};

/// Entries shown in the activity feed.
pub const ACTIVITY_LIMIT: i64 = 5;
pub const CHART_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuildInfo {
    pub owner: String,
    pub created_at: Option<String>,
    pub region: String,
    pub channels: Option<i64>,
    pub member_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Activity {
    pub description: String,
    pub time: String,
    pub details: String,
}

impl Activity {
    fn placeholder() -> Self {
        Self {
            description: "No recent activity tracked".to_string(),
            time: "just now".to_string(),
            details: "Level ups and achievements will appear here.".to_string(),
        }
    }
}

/// Chart.js line chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityChart {
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub label: &'static str,
    pub data: Vec<i64>,
    pub border_color: &'static str,
    pub background_color: &'static str,
    pub fill: bool,
    pub tension: f64,
}

/// Rough number of messages behind a day with `active` members gaining xp.
/// The bot does not count messages.
const fn estimated_messages(active: i64) -> i64 {
    if active > 0 {
        active * 10 + 50
    } else {
        0
    }
}

/// `None` if the bot has not registered the guild.
#[instrument(skip(db))]
pub async fn guild_info(db: &Db, guild_id: u64) -> Result<Option<GuildInfo>, sqlx::Error> {
    let Some(guild) = queries::get_guild(db, guild_id).await? else {
        return Ok(None);
    };

    let owner = match guild.owner_id {
        Some(owner_id) => levels::get_username(db, from_i64(owner_id)).await?,
        None => None,
    };

    Ok(Some(GuildInfo {
        owner: owner.unwrap_or_else(|| "Unknown".to_string()),
        created_at: guild.created_at.and_then(timestamp::iso),
        region: guild.preferred_locale.unwrap_or_else(|| "Unknown".to_string()),
        channels: guild.channel_count,
        member_count: levels::count_members(db, guild_id).await?,
    }))
}

/// Latest xp gains and achievement unlocks, most recent first.
#[instrument(skip(db))]
pub async fn recent_activity(db: &Db, guild_id: u64, now: i64) -> Result<Vec<Activity>, sqlx::Error> {
    let gains = queries::recent_xp_gains(db, guild_id, ACTIVITY_LIMIT).await?;
    let unlocks = queries::recent_unlocks(db, guild_id, ACTIVITY_LIMIT).await?;
    debug!("{} xp gains and {} unlocks", gains.len(), unlocks.len());

    let gains = gains.into_iter().map(|gain| {
        let activity = Activity {
            description: format!("{} recently gained XP", gain.username),
            time: timestamp::time_ago(now - gain.last_xp_time),
            details: format!("Reached Level {}", gain.level),
        };
        (gain.last_xp_time, activity)
    });
    let unlocks = unlocks.into_iter().map(|unlock| {
        let activity = Activity {
            description: format!("{} earned achievement", unlock.username),
            time: timestamp::time_ago(now - unlock.last_tier_achieved_at),
            details: unlock.achievement_name,
        };
        (unlock.last_tier_achieved_at, activity)
    });

    // Stable: xp gains come first at equal times
    let mut activities: Vec<_> = gains.chain(unlocks).collect();
    activities.sort_by_key(|(time, _)| Reverse(*time));

    let activities: Vec<_> = activities
        .into_iter()
        .take(ACTIVITY_LIMIT as usize)
        .map(|(_, activity)| activity)
        .collect();

    if activities.is_empty() {
        Ok(vec![Activity::placeholder()])
    } else {
        Ok(activities)
    }
}

/// Members gaining xp on each of the last [`CHART_DAYS`] UTC days, today last.
#[instrument(skip(db))]
pub async fn activity_chart(db: &Db, guild_id: u64, now: i64) -> Result<ActivityChart, sqlx::Error> {
    let today = timestamp::day_start(now);

    let mut labels = Vec::with_capacity(CHART_DAYS as usize);
    let mut active = Vec::with_capacity(CHART_DAYS as usize);
    for days_ago in (0..CHART_DAYS).rev() {
        let start = today - days_ago * DAY;
        labels.push(timestamp::weekday(start).unwrap_or_default());
        active.push(queries::count_xp_gainers(db, guild_id, start, start + DAY).await?);
    }
    let messages = active.iter().copied().map(estimated_messages).collect();

    Ok(ActivityChart {
        labels,
        datasets: vec![
            Dataset {
                label: "Active Users (XP Gain)",
                data: active,
                border_color: "rgba(255, 102, 102, 1)",
                background_color: "rgba(255, 102, 102, 0.2)",
                fill: true,
                tension: 0.4,
            },
            Dataset {
                label: "Messages Sent (Est.)",
                data: messages,
                border_color: "rgba(0, 204, 204, 1)",
                background_color: "rgba(0, 204, 204, 0.2)",
                fill: true,
                tension: 0.4,
            },
        ],
    })
}

#[cfg(test)]
mod test {
    use super::*;

    // Monday 19 October 2026, 14:30:00 UTC
    const NOW: i64 = 1_792_420_200;

    async fn seeded_db() -> Db {
        let db = Db::in_memory().await;

        sqlx::query(
            "INSERT INTO guilds (guild_id, name, owner_id, created_at, channel_count, preferred_locale)
                VALUES (1, 'one', 10, 1600000000, 12, 'fr'), (2, 'two', 99, NULL, NULL, NULL);
            INSERT INTO users (discord_id, username) VALUES (10, 'alice'), (11, 'bob'), (12, 'carol');
            INSERT INTO levels (user_id, guild_id, level, xp, last_xp_time) VALUES
                (10, 1, 5, 0, 1792420170),
                (11, 1, 3, 10, 1792413000),
                (12, 1, 2, 0, 1792160000),
                (10, 2, 1, 0, NULL);
            INSERT INTO achievements (id, guild_id, name, description, requirement_type, requirement_value, created_at)
                VALUES (1, 1, 'Chatterbox', 'Send messages', 'messages', 100, 0);
            INSERT INTO user_achievements (user_id, guild_id, achievement_id, completed, last_tier_achieved_at)
                VALUES (11, 1, 1, TRUE, 1792416600), (12, 1, 1, FALSE, 1792420000);",
        )
        .execute(&db.pool)
        .await
        .unwrap();

        db
    }

    #[tokio::test]
    async fn info_of_registered_guild() {
        let db = seeded_db().await;

        let info = guild_info(&db, 1).await.unwrap().unwrap();
        assert_eq!(
            info,
            GuildInfo {
                owner: "alice".to_string(),
                created_at: Some("2020-09-13T12:26:40Z".to_string()),
                region: "fr".to_string(),
                channels: Some(12),
                member_count: 3,
            }
        );

        let info = guild_info(&db, 2).await.unwrap().unwrap();
        assert_eq!(info.owner, "Unknown");
        assert_eq!(info.created_at, None);
        assert_eq!(info.region, "Unknown");
        assert_eq!(info.channels, None);

        assert_eq!(guild_info(&db, 3).await.unwrap(), None);
    }

    #[tokio::test]
    async fn activity_is_merged_by_time() {
        let db = seeded_db().await;

        let activity = recent_activity(&db, 1, NOW).await.unwrap();

        let summary: Vec<_> = activity
            .iter()
            .map(|a| (a.description.as_str(), a.time.as_str(), a.details.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("alice recently gained XP", "just now", "Reached Level 5"),
                ("bob earned achievement", "1 hour ago", "Chatterbox"),
                ("bob recently gained XP", "2 hours ago", "Reached Level 3"),
                ("carol recently gained XP", "3 days ago", "Reached Level 2"),
            ]
        );
    }

    #[tokio::test]
    async fn activity_placeholder_when_empty() {
        let db = seeded_db().await;

        let activity = recent_activity(&db, 2, NOW).await.unwrap();
        assert_eq!(activity, vec![Activity::placeholder()]);
    }

    #[tokio::test]
    async fn chart_of_last_week() {
        let db = seeded_db().await;

        let chart = activity_chart(&db, 1, NOW).await.unwrap();

        assert_eq!(
            chart.labels,
            vec!["Tue", "Wed", "Thu", "Fri", "Sat", "Sun", "Mon"]
        );
        assert_eq!(chart.datasets[0].data, vec![0, 0, 0, 1, 0, 0, 2]);
        assert_eq!(chart.datasets[1].data, vec![0, 0, 0, 60, 0, 0, 70]);
    }

    #[test]
    fn chart_serialized_for_chart_js() {
        let dataset = Dataset {
            label: "Active Users (XP Gain)",
            data: vec![1],
            border_color: "red",
            background_color: "blue",
            fill: true,
            tension: 0.4,
        };

        let json = serde_json::to_value(dataset).unwrap();
        assert_eq!(json["borderColor"], "red");
        assert_eq!(json["backgroundColor"], "blue");
    }
}
