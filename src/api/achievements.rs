use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use tracing::instrument;

use super::{guild_settings::CreatedId, parse_id, payload, ApiError, ApiResponse};
use crate::{
    achievements::{self, Achievement, AchievementForm},
    timestamp, Data,
};

#[derive(Debug, Deserialize)]
pub struct AchievementQuery {
    /// Member whose progress is reported
    pub user_id: Option<String>,
}

#[instrument(skip(data))]
pub async fn list_achievements(
    State(data): State<Data>,
    Path(guild_id): Path<String>,
    Query(query): Query<AchievementQuery>,
) -> Result<Json<ApiResponse<Vec<Achievement>>>, ApiError> {
    let guild_id = parse_id(&guild_id)?;
    let user_id = query.user_id.as_deref().map(parse_id).transpose()?;

    let achievements = achievements::list_achievements(&data.db, guild_id, user_id).await?;

    Ok(ApiResponse::data(achievements))
}

#[instrument(skip(data, body))]
pub async fn create_achievement(
    State(data): State<Data>,
    Path(guild_id): Path<String>,
    body: Bytes,
) -> Result<Json<ApiResponse<CreatedId>>, ApiError> {
    let guild_id = parse_id(&guild_id)?;
    let form: AchievementForm = payload(&body)?;

    let id =
        achievements::create_achievement(&data.db, guild_id, form, timestamp::now()).await?;

    Ok(ApiResponse::with_message(
        CreatedId { id },
        "Achievement created successfully",
    ))
}
