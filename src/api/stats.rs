use axum::{
    extract::{Path, State},
    Json,
};
use tracing::{info, instrument};

use super::{parse_id, ApiError, ApiResponse};
use crate::{
    database,
    levels::{
        leaderboard::{self, LeaderboardEntry},
        queries,
        stats::{self, AdminStats, GuildStats, UserStats, ACTIVE_WINDOW},
    },
    timestamp, Data,
};

#[instrument(skip(data))]
pub async fn guild_stats(
    State(data): State<Data>,
    Path(guild_id): Path<String>,
) -> Result<Json<ApiResponse<GuildStats>>, ApiError> {
    let guild_id = parse_id(&guild_id)?;

    if !database::guild_exists(&data.db, guild_id).await? {
        return Err(ApiError::NotFound(
            "Guild not found or bot is not in this guild".to_string(),
        ));
    }

    let active_since = timestamp::now() - ACTIVE_WINDOW;
    let stats = stats::guild_stats(&data.db, &data.xp, guild_id, active_since).await?;

    Ok(ApiResponse::data(stats))
}

#[instrument(skip(data))]
pub async fn leaderboard(
    State(data): State<Data>,
    Path(guild_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<LeaderboardEntry>>>, ApiError> {
    let guild_id = parse_id(&guild_id)?;
    let limit = data.config.server.leaderboard_limit;

    let members = queries::get_top_members(&data.db, guild_id, limit).await?;
    let ranked = data
        .xp
        .blocking(move |xp| leaderboard::rank_members(xp, members))
        .await?;
    info!(
        "Leaderboard of guild {guild_id}: {} members, {} levels cached",
        ranked.len(),
        data.xp.cached_levels()
    );

    Ok(ApiResponse::data(ranked))
}

#[instrument(skip(data))]
pub async fn user_stats(
    State(data): State<Data>,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<UserStats>>, ApiError> {
    let user_id = parse_id(&user_id)?;
    let stats = stats::user_stats(&data.db, &data.xp, user_id).await?;

    Ok(ApiResponse::data(stats))
}

#[instrument(skip(data))]
pub async fn admin_stats(
    State(data): State<Data>,
) -> Result<Json<ApiResponse<AdminStats>>, ApiError> {
    let stats = stats::admin_stats(&data.db).await?;

    Ok(ApiResponse::data(stats))
}
