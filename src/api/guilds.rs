use axum::{
    extract::{Path, State},
    Json,
};
use tracing::instrument;

use super::{parse_id, ApiError, ApiResponse};
use crate::{
    database,
    guilds::{self, Activity, ActivityChart, GuildInfo},
    timestamp, Data,
};

#[instrument(skip(data))]
pub async fn guild_info(
    State(data): State<Data>,
    Path(guild_id): Path<String>,
) -> Result<Json<ApiResponse<GuildInfo>>, ApiError> {
    let guild_id = parse_id(&guild_id)?;
    let info = guilds::guild_info(&data.db, guild_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Guild not found".to_string()))?;

    Ok(ApiResponse::data(info))
}

#[instrument(skip(data))]
pub async fn recent_activity(
    State(data): State<Data>,
    Path(guild_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<Activity>>>, ApiError> {
    let guild_id = parse_id(&guild_id)?;
    if !database::guild_exists(&data.db, guild_id).await? {
        return Err(ApiError::NotFound("Guild not found".to_string()));
    }

    let activity = guilds::recent_activity(&data.db, guild_id, timestamp::now()).await?;

    Ok(ApiResponse::data(activity))
}

#[instrument(skip(data))]
pub async fn activity_chart(
    State(data): State<Data>,
    Path(guild_id): Path<String>,
) -> Result<Json<ApiResponse<ActivityChart>>, ApiError> {
    let guild_id = parse_id(&guild_id)?;
    let chart = guilds::activity_chart(&data.db, guild_id, timestamp::now()).await?;

    Ok(ApiResponse::data(chart))
}
