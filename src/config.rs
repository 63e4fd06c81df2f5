use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::levels::{CurveError, LevelCurve};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot access config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("cannot serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid level curve: {0}")]
    Curve(#[from] CurveError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: String,
    pub max_connections: u32,
    pub server: ServerCfg,
    /// Must be the same curve as the bot's
    pub curve: LevelCurve,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerCfg {
    pub ip_addr: String,
    pub port: u16,
    /// Members fetched before ranking by cumulative xp
    pub leaderboard_limit: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: "sqlite://lvlboard.db?mode=rwc".to_string(),
            max_connections: 5,
            server: ServerCfg::default(),
            curve: LevelCurve::default(),
        }
    }
}

impl Default for ServerCfg {
    fn default() -> Self {
        Self {
            ip_addr: "127.0.0.1".to_string(),
            port: 8080,
            leaderboard_limit: 100,
        }
    }
}

impl Config {
    /// Load the config file at `path`, or write a default one if there is none.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        let config = if path.is_file() {
            let config = Self::from_toml(&std::fs::read_to_string(path)?)?;
            info!("{} successfully loaded.", path.display());
            config
        } else {
            info!("No {} found. Creating default configuration.", path.display());
            let config = Self::default();
            config.save(path)?;
            config
        };

        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.curve.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        info!("{} successfully written.", path.display());

        Ok(())
    }
}
