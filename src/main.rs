#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]

mod achievements;
mod api;
mod config;
mod database;
mod events;
mod guilds;
mod levels;
mod settings;
mod snowflake;
mod timestamp;

use std::sync::Arc;
use tokio::{net::TcpListener, signal};
use tracing::{error, info, instrument, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter};

use config::Config;
use database::Db;
use levels::{LevelCurve, XpCalculator};

const CONFIG_FILE: &str = "config.toml";

/// Shared by every request handler
#[derive(Debug, Clone)]
pub struct Data {
    pub config: Arc<Config>,
    pub db: Arc<Db>,
    pub xp: Arc<XpCalculator>,
}

// ---------------------------------------- Main -----------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("No .env file loaded: {e}");
    }
    let filter = EnvFilter::from_default_env();

    let file_appender = tracing_appender::rolling::daily("./logs", "log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::Layer::new().pretty().with_writer(std::io::stdout))
        .with(
            fmt::Layer::new()
                .compact()
                .with_ansi(false)
                .with_line_number(true)
                .with_writer(non_blocking),
        );
    tracing::subscriber::set_global_default(subscriber)?;

    run().await
}

#[instrument]
async fn run() -> anyhow::Result<()> {
    let config = Config::load(CONFIG_FILE)?;

    if config.curve != LevelCurve::default() {
        warn!(
            "Using non-default level curve {:?}, it must match the bot's curve",
            config.curve
        );
    }

    let db_url = &config.database;
    info!("Connecting to database: {}", &db_url);
    let db = Db::new(db_url, config.max_connections).await?;
    info!("Connected to database. Running migrations");
    db.run_migrations().await?;

    let xp = XpCalculator::new(config.curve);
    info!("Level curve: {:?}", xp.curve());

    let address = format!("{}:{}", config.server.ip_addr, config.server.port);
    let data = Data {
        config: Arc::new(config),
        db: Arc::new(db),
        xp: Arc::new(xp),
    };
    let app = api::router(data.clone());

    let listener = TcpListener::bind(&address).await?;
    info!("Dashboard API listening on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutting down...");
    data.db.close().await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to listen for Ctrl+C: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install terminate signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
