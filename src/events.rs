//! Guild events: Discord scheduled events synced by the bot and events
//! created from the dashboard, with their attendance.

pub mod queries;

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::database::{self, Db};
use crate::snowflake;
use crate::timestamp;

/// Most events returned by a listing.
pub const EVENT_LIST_LIMIT: i64 = 20;
/// Attendance status of members who joined from the dashboard.
pub const ATTENDING: &str = "going";

#[derive(Debug, Error)]
pub enum EventError {
    #[error("Guild not found")]
    GuildNotFound,
    #[error("Event not found")]
    EventNotFound,
    #[error("Invalid status filter. Use 'upcoming' or 'past'.")]
    InvalidStatusFilter,
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("Invalid date for {0}")]
    InvalidTime(&'static str),
    #[error("Event must end after it starts")]
    EndBeforeStart,
    #[error("Invalid user ID provided")]
    InvalidUserId,
    #[error("Event hasn't started yet")]
    NotStarted,
    #[error("Event has ended")]
    Ended,
    #[error("Event is not open for joining")]
    NotOpen,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventStatus {
    Scheduled,
    Active,
    Completed,
    Cancelled,
}

impl EventStatus {
    /// Members can join scheduled events and events in progress.
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Scheduled | Self::Active)
    }
}

impl FromStr for EventStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "SCHEDULED" => Ok(Self::Scheduled),
            "ACTIVE" => Ok(Self::Active),
            "COMPLETED" => Ok(Self::Completed),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(format!("unknown event status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    /// Scheduled or active, not ended yet
    #[default]
    Upcoming,
    /// Completed, cancelled, or active past their end
    Past,
}

impl FromStr for StatusFilter {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "upcoming" => Ok(Self::Upcoming),
            "past" => Ok(Self::Past),
            _ => Err(EventError::InvalidStatusFilter),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    pub internal_id: i64,
    pub event_id: String,
    pub name: String,
    pub description: String,
    pub start_time_iso: Option<String>,
    pub end_time_iso: Option<String>,
    pub start_time_formatted: String,
    pub end_time_formatted: String,
    pub event_type: String,
    pub status: Option<EventStatus>,
    #[serde(serialize_with = "snowflake::serialize_opt")]
    pub creator_id: Option<u64>,
}

impl From<queries::EventSql> for Event {
    fn from(value: queries::EventSql) -> Self {
        Self {
            internal_id: value.internal_id,
            event_id: value.event_id,
            name: value.name,
            description: value.description,
            start_time_iso: timestamp::iso(value.start_time),
            end_time_iso: value.end_time.and_then(timestamp::iso),
            start_time_formatted: timestamp::readable(value.start_time).unwrap_or_default(),
            end_time_formatted: value
                .end_time
                .and_then(timestamp::readable)
                .unwrap_or_else(|| "-".to_string()),
            event_type: value.event_type,
            status: value.status.parse().ok(),
            creator_id: value.creator_id.map(snowflake::from_i64),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attendee {
    pub username: String,
    pub avatar: Option<String>,
    pub status: String,
    pub joined_at: String,
}

impl From<queries::AttendeeSql> for Attendee {
    fn from(value: queries::AttendeeSql) -> Self {
        Self {
            username: value.username,
            avatar: value.avatar,
            status: value.status,
            joined_at: value
                .joined_at
                .and_then(timestamp::full)
                .unwrap_or_else(|| "N/A".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attendees {
    pub attendees: Vec<Attendee>,
    pub event_name: String,
}

/// Body of an event creation request. Dates are RFC 3339, or UTC without offset.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventForm {
    pub name: Option<String>,
    pub description: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub event_type: Option<String>,
    pub creator_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub name: String,
    pub description: String,
    pub start_time: i64,
    pub end_time: i64,
    pub event_type: String,
    pub creator_id: Option<u64>,
}

fn required<T>(field: Option<T>, name: &'static str) -> Result<T, EventError> {
    field.ok_or(EventError::MissingField(name))
}

fn parse_time(text: &str, field: &'static str) -> Result<i64, EventError> {
    timestamp::parse(text).ok_or(EventError::InvalidTime(field))
}

impl EventForm {
    pub fn validate(self) -> Result<NewEvent, EventError> {
        let name = required(self.name, "name")?;
        let description = required(self.description, "description")?;
        let start_time = required(self.start_time, "start_time")?;
        let end_time = required(self.end_time, "end_time")?;
        let event_type = required(self.event_type, "event_type")?;

        let start_time = parse_time(&start_time, "start_time")?;
        let end_time = parse_time(&end_time, "end_time")?;
        if end_time < start_time {
            return Err(EventError::EndBeforeStart);
        }

        let creator_id = match self.creator_id.as_deref() {
            None | Some("") => None,
            Some(id) => Some(snowflake::parse(id).ok_or(EventError::InvalidUserId)?),
        };

        Ok(NewEvent {
            name,
            description,
            start_time,
            end_time,
            event_type,
            creator_id,
        })
    }
}

/// Body of a join request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JoinRequest {
    pub user_id: Option<String>,
}

impl JoinRequest {
    fn user_id(&self) -> Result<u64, EventError> {
        let user_id = self
            .user_id
            .as_deref()
            .ok_or(EventError::MissingField("user_id"))?;
        snowflake::parse(user_id).ok_or(EventError::InvalidUserId)
    }
}

#[instrument(skip(db))]
pub async fn list_events(
    db: &Db,
    guild_id: u64,
    filter: StatusFilter,
    now: i64,
) -> Result<Vec<Event>, EventError> {
    let events = queries::get_events(db, guild_id, filter, now).await?;
    Ok(events.into_iter().map(Event::from).collect())
}

/// Create a scheduled event and return its event id.
#[instrument(skip(db, form))]
pub async fn create_event(db: &Db, guild_id: u64, form: EventForm) -> Result<String, EventError> {
    if !database::guild_exists(db, guild_id).await? {
        return Err(EventError::GuildNotFound);
    }
    let new = form.validate()?;

    let event_id = Uuid::new_v4().to_string();
    let internal_id = queries::insert_event(db, guild_id, &event_id, &new).await?;
    info!("Created event {internal_id} ({event_id}) '{}' in guild {guild_id}", new.name);

    Ok(event_id)
}

/// Register the user as attending an event in progress.
#[instrument(skip(db))]
pub async fn join_event(
    db: &Db,
    guild_id: u64,
    event_id: &str,
    request: JoinRequest,
    now: i64,
) -> Result<(), EventError> {
    let user_id = request.user_id()?;
    let event = queries::get_guild_event(db, guild_id, event_id)
        .await?
        .ok_or(EventError::EventNotFound)?;

    if event.start_time > now {
        return Err(EventError::NotStarted);
    }
    if event.end_time.is_some_and(|end| end < now) {
        return Err(EventError::Ended);
    }
    if !event
        .status
        .parse::<EventStatus>()
        .is_ok_and(EventStatus::is_open)
    {
        return Err(EventError::NotOpen);
    }

    queries::upsert_attendance(db, guild_id, event_id, user_id, now).await?;
    info!("User {user_id} joined event {event_id} of guild {guild_id}");

    Ok(())
}

#[instrument(skip(db))]
pub async fn attendees(db: &Db, internal_id: i64) -> Result<Attendees, EventError> {
    let event = queries::get_event_by_internal_id(db, internal_id)
        .await?
        .ok_or(EventError::EventNotFound)?;

    let attendees = queries::get_attendees(db, event.guild_id, &event.event_id).await?;

    Ok(Attendees {
        attendees: attendees.into_iter().map(Attendee::from).collect(),
        event_name: event.name,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    // Monday 19 October 2026, 14:30:00 UTC
    const NOW: i64 = 1_792_420_200;
    const HOUR: i64 = 60 * 60;

    async fn seeded_db() -> Db {
        let db = Db::in_memory().await;

        sqlx::query(
            "INSERT INTO guilds (guild_id, name) VALUES (1, 'guild');
            INSERT INTO users (discord_id, username, avatar) VALUES (10, 'alice', 'a.png'), (11, 'bob', NULL);",
        )
        .execute(&db.pool)
        .await
        .unwrap();

        let events = [
            ("soon", NOW + HOUR, Some(NOW + 2 * HOUR), "SCHEDULED"),
            ("running", NOW - HOUR, Some(NOW + HOUR), "active"),
            ("open-ended", NOW - HOUR, None, "SCHEDULED"),
            ("overdue", NOW - 3 * HOUR, Some(NOW - HOUR), "ACTIVE"),
            ("done", NOW - 5 * HOUR, Some(NOW - 4 * HOUR), "COMPLETED"),
            ("called-off", NOW - HOUR, Some(NOW + HOUR), "CANCELLED"),
        ];
        for (event_id, start, end, status) in events {
            sqlx::query(
                "INSERT INTO events (event_id, guild_id, name, start_time, end_time, event_type, status)
                    VALUES (?, 1, ?, ?, ?, 'VOICE', ?)",
            )
            .bind(event_id)
            .bind(format!("{event_id} event"))
            .bind(start)
            .bind(end)
            .bind(status)
            .execute(&db.pool)
            .await
            .unwrap();
        }

        db
    }

    fn ids(events: &[Event]) -> Vec<&str> {
        events.iter().map(|e| e.event_id.as_str()).collect()
    }

    fn join_as(user_id: &str) -> JoinRequest {
        JoinRequest {
            user_id: Some(user_id.to_string()),
        }
    }

    #[test]
    fn status_filter_parsing() {
        assert_eq!("upcoming".parse::<StatusFilter>().unwrap(), StatusFilter::Upcoming);
        assert_eq!("PAST".parse::<StatusFilter>().unwrap(), StatusFilter::Past);
        assert!(matches!(
            "all".parse::<StatusFilter>(),
            Err(EventError::InvalidStatusFilter)
        ));
        assert_eq!("active".parse::<EventStatus>(), Ok(EventStatus::Active));
    }

    #[test]
    fn event_form_validation() {
        let form = |start: &str, end: &str| EventForm {
            name: Some("Game night".to_string()),
            description: Some("Bring snacks".to_string()),
            start_time: Some(start.to_string()),
            end_time: Some(end.to_string()),
            event_type: Some("VOICE".to_string()),
            creator_id: None,
        };

        let event = form("2026-10-19T14:30:00Z", "2026-10-19T16:30").validate().unwrap();
        assert_eq!(event.start_time, NOW);
        assert_eq!(event.end_time, NOW + 2 * HOUR);

        assert!(matches!(
            form("2026-10-19T14:30:00Z", "2026-10-19T12:00:00Z").validate(),
            Err(EventError::EndBeforeStart)
        ));
        assert!(matches!(
            form("tonight", "2026-10-19T12:00:00Z").validate(),
            Err(EventError::InvalidTime("start_time"))
        ));
        assert!(matches!(
            EventForm {
                event_type: None,
                ..form("2026-10-19T14:30:00Z", "2026-10-19T16:30:00Z")
            }
            .validate(),
            Err(EventError::MissingField("event_type"))
        ));
    }

    #[test]
    fn event_display() {
        let event = Event::from(queries::EventSql {
            internal_id: 1,
            event_id: "abc".to_string(),
            guild_id: 1,
            name: "Game night".to_string(),
            description: String::new(),
            start_time: NOW,
            end_time: None,
            event_type: "VOICE".to_string(),
            status: "SCHEDULED".to_string(),
            creator_id: Some(-1),
        });

        let json = serde_json::to_value(event).unwrap();
        assert_eq!(json["start_time_iso"], "2026-10-19T14:30:00Z");
        assert_eq!(json["start_time_formatted"], "Oct 19, 2026 02:30 PM UTC");
        assert!(json["end_time_iso"].is_null());
        assert_eq!(json["end_time_formatted"], "-");
        assert_eq!(json["status"], "SCHEDULED");
        assert_eq!(json["creator_id"], "18446744073709551615");
    }

    #[tokio::test]
    async fn upcoming_and_past_events() {
        let db = seeded_db().await;

        let upcoming = list_events(&db, 1, StatusFilter::Upcoming, NOW).await.unwrap();
        assert_eq!(ids(&upcoming), vec!["running", "open-ended", "soon"]);
        assert_eq!(upcoming[0].status, Some(EventStatus::Active));

        let past = list_events(&db, 1, StatusFilter::Past, NOW).await.unwrap();
        assert_eq!(ids(&past), vec!["called-off", "overdue", "done"]);

        assert!(list_events(&db, 2, StatusFilter::Upcoming, NOW)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn created_event_is_upcoming() {
        let db = seeded_db().await;

        let event_id = create_event(
            &db,
            1,
            EventForm {
                name: Some("Movie".to_string()),
                description: Some(String::new()),
                start_time: Some("2026-10-20T20:00:00Z".to_string()),
                end_time: Some("2026-10-20T22:00:00Z".to_string()),
                event_type: Some("EXTERNAL".to_string()),
                creator_id: Some("10".to_string()),
            },
        )
        .await
        .unwrap();
        assert!(Uuid::parse_str(&event_id).is_ok());

        let upcoming = list_events(&db, 1, StatusFilter::Upcoming, NOW).await.unwrap();
        let created = upcoming.last().unwrap();
        assert_eq!(created.event_id, event_id);
        assert_eq!(created.status, Some(EventStatus::Scheduled));
        assert_eq!(created.creator_id, Some(10));

        assert!(matches!(
            create_event(&db, 2, EventForm::default()).await,
            Err(EventError::GuildNotFound)
        ));
    }

    #[tokio::test]
    async fn join_checks_event_window_and_status() {
        let db = seeded_db().await;

        let db = &db;
        let join = move |event_id: &'static str| join_event(db, 1, event_id, join_as("10"), NOW);

        assert!(matches!(join("soon").await, Err(EventError::NotStarted)));
        assert!(matches!(join("overdue").await, Err(EventError::Ended)));
        assert!(matches!(join("called-off").await, Err(EventError::NotOpen)));
        assert!(matches!(join("unknown").await, Err(EventError::EventNotFound)));
        assert!(matches!(
            join_event(db, 2, "running", join_as("10"), NOW).await,
            Err(EventError::EventNotFound)
        ));
        assert!(matches!(
            join_event(db, 1, "running", JoinRequest::default(), NOW).await,
            Err(EventError::MissingField("user_id"))
        ));

        join("running").await.unwrap();
        join("open-ended").await.unwrap();
    }

    #[tokio::test]
    async fn attendees_in_join_order() {
        let db = seeded_db().await;

        join_event(&db, 1, "running", join_as("11"), NOW - 60).await.unwrap();
        join_event(&db, 1, "running", join_as("10"), NOW).await.unwrap();
        // Joining twice keeps a single entry
        join_event(&db, 1, "running", join_as("10"), NOW).await.unwrap();

        let internal_id: i64 =
            sqlx::query_scalar("SELECT internal_id FROM events WHERE event_id = 'running'")
                .fetch_one(&db.pool)
                .await
                .unwrap();

        let attendees = attendees(&db, internal_id).await.unwrap();
        assert_eq!(attendees.event_name, "running event");
        assert_eq!(
            attendees.attendees,
            vec![
                Attendee {
                    username: "bob".to_string(),
                    avatar: None,
                    status: ATTENDING.to_string(),
                    joined_at: "2026-10-19 14:29:00 UTC".to_string(),
                },
                Attendee {
                    username: "alice".to_string(),
                    avatar: Some("a.png".to_string()),
                    status: ATTENDING.to_string(),
                    joined_at: "2026-10-19 14:30:00 UTC".to_string(),
                },
            ]
        );

        assert!(matches!(
            super::attendees(&db, 999).await,
            Err(EventError::EventNotFound)
        ));
    }
}
