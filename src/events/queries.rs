use sqlx::FromRow;
use tracing::instrument;

use super::{NewEvent, StatusFilter, ATTENDING, EVENT_LIST_LIMIT};
use crate::database::Db;
use crate::snowflake::to_i64;

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct EventSql {
    pub internal_id: i64,
    pub event_id: String,
    pub guild_id: i64,
    pub name: String,
    pub description: String,
    pub start_time: i64,
    pub end_time: Option<i64>,
    pub event_type: String,
    pub status: String,
    pub creator_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct AttendeeSql {
    pub username: String,
    pub avatar: Option<String>,
    pub status: String,
    pub joined_at: Option<i64>,
}

const EVENT_COLUMNS: &str = "internal_id, event_id, guild_id, name, description, start_time,
    end_time, event_type, UPPER(status) AS status, creator_id";

/// Events of the guild matching `filter` at the `now` unix timestamp.
#[instrument]
pub async fn get_events(
    db: &Db,
    guild_id: u64,
    filter: StatusFilter,
    now: i64,
) -> Result<Vec<EventSql>, sqlx::Error> {
    let guild_id = to_i64(guild_id);

    let condition = match filter {
        StatusFilter::Upcoming => {
            "UPPER(status) IN ('SCHEDULED', 'ACTIVE') AND (end_time IS NULL OR end_time > ?)
                ORDER BY start_time ASC, internal_id ASC"
        }
        StatusFilter::Past => {
            "(UPPER(status) IN ('COMPLETED', 'CANCELLED')
                    OR (UPPER(status) = 'ACTIVE' AND end_time IS NOT NULL AND end_time <= ?))
                ORDER BY start_time DESC, internal_id DESC"
        }
    };
    let query = format!(
        "SELECT {EVENT_COLUMNS} FROM events WHERE guild_id = ? AND {condition} LIMIT ?"
    );

    sqlx::query_as::<_, EventSql>(&query)
        .bind(guild_id)
        .bind(now)
        .bind(EVENT_LIST_LIMIT)
        .fetch_all(&db.pool)
        .await
}

#[instrument]
pub async fn get_guild_event(
    db: &Db,
    guild_id: u64,
    event_id: &str,
) -> Result<Option<EventSql>, sqlx::Error> {
    let guild_id = to_i64(guild_id);
    let query = format!("SELECT {EVENT_COLUMNS} FROM events WHERE event_id = ? AND guild_id = ?");

    sqlx::query_as::<_, EventSql>(&query)
        .bind(event_id)
        .bind(guild_id)
        .fetch_optional(&db.pool)
        .await
}

#[instrument]
pub async fn get_event_by_internal_id(
    db: &Db,
    internal_id: i64,
) -> Result<Option<EventSql>, sqlx::Error> {
    let query = format!("SELECT {EVENT_COLUMNS} FROM events WHERE internal_id = ?");

    sqlx::query_as::<_, EventSql>(&query)
        .bind(internal_id)
        .fetch_optional(&db.pool)
        .await
}

#[instrument(skip(new))]
pub async fn insert_event(
    db: &Db,
    guild_id: u64,
    event_id: &str,
    new: &NewEvent,
) -> Result<i64, sqlx::Error> {
    let guild_id = to_i64(guild_id);

    let result = sqlx::query(
        "INSERT INTO events
            (event_id, guild_id, name, description, start_time, end_time, event_type, status, creator_id)
            VALUES (?, ?, ?, ?, ?, ?, ?, 'SCHEDULED', ?)",
    )
    .bind(event_id)
    .bind(guild_id)
    .bind(&new.name)
    .bind(&new.description)
    .bind(new.start_time)
    .bind(new.end_time)
    .bind(&new.event_type)
    .bind(new.creator_id.map(to_i64))
    .execute(&db.pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Mark the user as attending, joining again refreshes the join time.
#[instrument]
pub async fn upsert_attendance(
    db: &Db,
    guild_id: u64,
    event_id: &str,
    user_id: u64,
    joined_at: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO event_attendance (event_id, user_id, guild_id, status, joined_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (event_id, user_id)
            DO UPDATE SET status = excluded.status, joined_at = excluded.joined_at",
    )
    .bind(event_id)
    .bind(to_i64(user_id))
    .bind(to_i64(guild_id))
    .bind(ATTENDING)
    .bind(joined_at)
    .execute(&db.pool)
    .await?;

    Ok(())
}

/// Attendees of the event, first to join first.
#[instrument]
pub async fn get_attendees(
    db: &Db,
    guild_id: i64,
    event_id: &str,
) -> Result<Vec<AttendeeSql>, sqlx::Error> {
    sqlx::query_as::<_, AttendeeSql>(
        "SELECT u.username, u.avatar, ea.status, ea.joined_at
            FROM event_attendance ea
            JOIN users u ON ea.user_id = u.discord_id
            WHERE ea.event_id = ? AND ea.guild_id = ?
            ORDER BY ea.joined_at ASC, ea.id ASC",
    )
    .bind(event_id)
    .bind(guild_id)
    .fetch_all(&db.pool)
    .await
}
