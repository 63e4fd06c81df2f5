pub mod cumulative;
pub mod curve;
pub mod leaderboard;
pub mod queries;
pub mod stats;

use thiserror::Error;
use tokio::task::JoinError;

pub use cumulative::XpCalculator;
pub use curve::{CurveError, LevelCurve};

#[derive(Debug, Error)]
pub enum LevelsError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("xp computation failed: {0}")]
    Task(#[from] JoinError),
}
