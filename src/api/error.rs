use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tokio::task::JoinError;
use tracing::{error, warn};

use crate::achievements::AchievementError;
use crate::events::EventError;
use crate::levels::LevelsError;
use crate::settings::SettingsError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AchievementError> for ApiError {
    fn from(error: AchievementError) -> Self {
        match error {
            AchievementError::Database(e) => Self::Database(e),
            AchievementError::GuildNotFound => Self::NotFound(error.to_string()),
            other => Self::BadRequest(other.to_string()),
        }
    }
}

impl From<EventError> for ApiError {
    fn from(error: EventError) -> Self {
        match error {
            EventError::Database(e) => Self::Database(e),
            EventError::GuildNotFound | EventError::EventNotFound => {
                Self::NotFound(error.to_string())
            }
            other => Self::BadRequest(other.to_string()),
        }
    }
}

impl From<LevelsError> for ApiError {
    fn from(error: LevelsError) -> Self {
        match error {
            LevelsError::Database(e) => Self::Database(e),
            LevelsError::Task(e) => e.into(),
        }
    }
}

impl From<JoinError> for ApiError {
    fn from(error: JoinError) -> Self {
        Self::Internal(error.to_string())
    }
}

impl From<SettingsError> for ApiError {
    fn from(error: SettingsError) -> Self {
        match error {
            SettingsError::Database(e) => Self::Database(e),
            SettingsError::GuildNotFound | SettingsError::LevelRoleNotFound => {
                Self::NotFound(error.to_string())
            }
            other => Self::BadRequest(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::BadRequest(message) => {
                warn!("Bad request: {message}");
                (StatusCode::BAD_REQUEST, message.clone())
            }
            Self::NotFound(message) => (StatusCode::NOT_FOUND, message.clone()),
            Self::Database(e) => {
                error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal database error".to_string(),
                )
            }
            Self::Internal(e) => {
                error!("Internal error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "success": false,
            "message": message,
        }));
        (status, body).into_response()
    }
}
