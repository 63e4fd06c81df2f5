use axum::{
    body::Bytes,
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use tracing::instrument;

use super::{parse_id, payload, ApiError, ApiResponse};
use crate::{
    settings::{
        self, EventSettings, EventSettingsUpdate, GuildSettings, LevelRole, NewLevelRole,
        SettingsUpdate,
    },
    Data,
};

#[derive(Debug, Serialize)]
pub struct CreatedId {
    pub id: i64,
}

#[instrument(skip(data))]
pub async fn get_settings(
    State(data): State<Data>,
    Path(guild_id): Path<String>,
) -> Result<Json<ApiResponse<GuildSettings>>, ApiError> {
    let guild_id = parse_id(&guild_id)?;
    let settings = settings::get_guild_settings(&data.db, guild_id).await?;

    Ok(ApiResponse::data(settings))
}

#[instrument(skip(data, body))]
pub async fn update_settings(
    State(data): State<Data>,
    Path(guild_id): Path<String>,
    body: Bytes,
) -> Result<Json<ApiResponse<GuildSettings>>, ApiError> {
    let guild_id = parse_id(&guild_id)?;
    let update: SettingsUpdate = payload(&body)?;
    let settings = settings::update_guild_settings(&data.db, guild_id, update).await?;

    Ok(ApiResponse::with_message(
        settings,
        "Settings updated successfully",
    ))
}

#[instrument(skip(data))]
pub async fn get_event_settings(
    State(data): State<Data>,
    Path(guild_id): Path<String>,
) -> Result<Json<ApiResponse<EventSettings>>, ApiError> {
    let guild_id = parse_id(&guild_id)?;
    let settings = settings::get_event_settings(&data.db, guild_id).await?;

    Ok(ApiResponse::data(settings))
}

#[instrument(skip(data, body))]
pub async fn update_event_settings(
    State(data): State<Data>,
    Path(guild_id): Path<String>,
    body: Bytes,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let guild_id = parse_id(&guild_id)?;
    let update: EventSettingsUpdate = payload(&body)?;

    let message = if settings::update_event_settings(&data.db, guild_id, update).await? {
        "Event settings updated successfully"
    } else {
        "No changes detected"
    };

    Ok(ApiResponse::message(message))
}

#[instrument(skip(data))]
pub async fn list_level_roles(
    State(data): State<Data>,
    Path(guild_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<LevelRole>>>, ApiError> {
    let guild_id = parse_id(&guild_id)?;
    let roles = settings::list_level_roles(&data.db, guild_id).await?;

    Ok(ApiResponse::data(roles))
}

#[instrument(skip(data, body))]
pub async fn add_level_role(
    State(data): State<Data>,
    Path(guild_id): Path<String>,
    body: Bytes,
) -> Result<Json<ApiResponse<CreatedId>>, ApiError> {
    let guild_id = parse_id(&guild_id)?;
    let new_role: NewLevelRole = payload(&body)?;
    let id = settings::add_level_role(&data.db, guild_id, new_role).await?;

    Ok(ApiResponse::with_message(
        CreatedId { id },
        "Role reward added successfully",
    ))
}

#[instrument(skip(data))]
pub async fn delete_level_role(
    State(data): State<Data>,
    Path((guild_id, role_reward_id)): Path<(String, i64)>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let guild_id = parse_id(&guild_id)?;
    settings::delete_level_role(&data.db, guild_id, role_reward_id).await?;

    Ok(ApiResponse::message("Level role deleted successfully"))
}
