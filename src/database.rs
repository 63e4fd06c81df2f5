use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::instrument;

use crate::snowflake::to_i64;

#[derive(Debug)]
pub struct Db {
    pub pool: SqlitePool,
}

impl Db {
    pub async fn new(db_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(db_url)
            .await?;
        Ok(Self { pool })
    }

    /// Single connection to a private in-memory database, with migrations applied.
    #[cfg(test)]
    pub async fn in_memory() -> Self {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let db = Self { pool };
        db.run_migrations().await.unwrap();
        db
    }

    #[instrument]
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    #[instrument]
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Whether the bot has registered the guild.
#[instrument]
pub async fn guild_exists(db: &Db, guild_id: u64) -> Result<bool, sqlx::Error> {
    let guild_id = to_i64(guild_id);

    let found = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM guilds WHERE guild_id = ?")
        .bind(guild_id)
        .fetch_one(&db.pool)
        .await?;

    Ok(found > 0)
}
