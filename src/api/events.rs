use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{parse_id, payload, ApiError, ApiResponse};
use crate::{
    events::{self, Attendees, Event, EventForm, JoinRequest, StatusFilter},
    timestamp, Data,
};

#[derive(Debug, Deserialize)]
pub struct EventQuery {
    /// `upcoming` (default) or `past`
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatedEvent {
    pub event_id: String,
}

#[instrument(skip(data))]
pub async fn list_events(
    State(data): State<Data>,
    Path(guild_id): Path<String>,
    Query(query): Query<EventQuery>,
) -> Result<Json<ApiResponse<Vec<Event>>>, ApiError> {
    let guild_id = parse_id(&guild_id)?;
    let filter = match query.status.as_deref() {
        Some(status) => status.parse()?,
        None => StatusFilter::default(),
    };

    let events = events::list_events(&data.db, guild_id, filter, timestamp::now()).await?;

    Ok(ApiResponse::data(events))
}

#[instrument(skip(data, body))]
pub async fn create_event(
    State(data): State<Data>,
    Path(guild_id): Path<String>,
    body: Bytes,
) -> Result<Json<ApiResponse<CreatedEvent>>, ApiError> {
    let guild_id = parse_id(&guild_id)?;
    let form: EventForm = payload(&body)?;

    let event_id = events::create_event(&data.db, guild_id, form).await?;

    Ok(ApiResponse::with_message(
        CreatedEvent { event_id },
        "Event created successfully",
    ))
}

#[instrument(skip(data, body))]
pub async fn join_event(
    State(data): State<Data>,
    Path((guild_id, event_id)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let guild_id = parse_id(&guild_id)?;
    let request: JoinRequest = payload(&body)?;

    events::join_event(&data.db, guild_id, &event_id, request, timestamp::now()).await?;

    Ok(ApiResponse::message("Successfully joined event"))
}

#[instrument(skip(data))]
pub async fn attendees(
    State(data): State<Data>,
    Path(internal_id): Path<String>,
) -> Result<Json<ApiResponse<Attendees>>, ApiError> {
    let internal_id = internal_id
        .parse::<i64>()
        .map_err(|_| ApiError::BadRequest(format!("Invalid event id: {internal_id}")))?;
    let attendees = events::attendees(&data.db, internal_id).await?;

    Ok(ApiResponse::data(attendees))
}
