//! JSON API consumed by the dashboard front-end.
//!
//! Every response uses the same envelope:
//! `{"success": bool, "message": string, "data": ...}`.

mod achievements;
mod error;
mod events;
mod guild_settings;
mod guilds;
mod stats;

use axum::{
    body::Bytes,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

pub use error::ApiError;

use crate::{snowflake, Data};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn data(data: T) -> Json<Self> {
        Self::with_message(data, "Success")
    }

    pub fn with_message(data: T, message: &str) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.to_string(),
            data: Some(data),
        })
    }
}

impl ApiResponse<()> {
    pub fn message(message: &str) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.to_string(),
            data: None,
        })
    }
}

const NO_DATA: &str = "No data provided";

fn parse_id(id: &str) -> Result<u64, ApiError> {
    snowflake::parse(id).ok_or_else(|| ApiError::BadRequest(format!("Invalid id: {id}")))
}

/// JSON body of a request. A missing body, `null` or `{}` carries no data.
fn payload<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiError::BadRequest(NO_DATA.to_string()));
    }

    let value: Value = serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid JSON: {e}")))?;
    match &value {
        Value::Null => return Err(ApiError::BadRequest(NO_DATA.to_string())),
        Value::Object(fields) if fields.is_empty() => {
            return Err(ApiError::BadRequest(NO_DATA.to_string()))
        }
        _ => {}
    }

    serde_json::from_value(value).map_err(|e| ApiError::BadRequest(format!("Invalid data: {e}")))
}

pub fn router(data: Data) -> Router {
    Router::new()
        .route("/api/guilds/{guild_id}/stats", get(stats::guild_stats))
        .route("/api/guilds/{guild_id}/leaderboard", get(stats::leaderboard))
        .route("/api/guilds/{guild_id}/info", get(guilds::guild_info))
        .route("/api/guilds/{guild_id}/activity", get(guilds::recent_activity))
        .route(
            "/api/guilds/{guild_id}/activity-chart",
            get(guilds::activity_chart),
        )
        .route(
            "/api/guilds/{guild_id}/achievements",
            get(achievements::list_achievements).post(achievements::create_achievement),
        )
        .route(
            "/api/guilds/{guild_id}/events",
            get(events::list_events).post(events::create_event),
        )
        .route(
            "/api/guilds/{guild_id}/events/{event_id}/join",
            post(events::join_event),
        )
        .route(
            "/api/events/{internal_event_id}/attendees",
            get(events::attendees),
        )
        .route(
            "/api/guilds/{guild_id}/settings",
            get(guild_settings::get_settings).post(guild_settings::update_settings),
        )
        .route(
            "/api/guilds/{guild_id}/event-settings",
            get(guild_settings::get_event_settings).post(guild_settings::update_event_settings),
        )
        .route(
            "/api/guilds/{guild_id}/level_roles",
            get(guild_settings::list_level_roles).post(guild_settings::add_level_role),
        )
        .route(
            "/api/guilds/{guild_id}/level_roles/{role_reward_id}",
            delete(guild_settings::delete_level_role),
        )
        .route("/api/users/{user_id}/stats", get(stats::user_stats))
        .route("/api/admin/stats", get(stats::admin_stats))
        .with_state(data)
}
