use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Bounded acquire timeout so a stalled backing store surfaces as an
        // error instead of hanging the hydration path.
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;

        // Connectivity sanity check
        sqlx::query("SELECT 1").execute(&pool).await?;

        Ok(Self { pool })
    }
}
