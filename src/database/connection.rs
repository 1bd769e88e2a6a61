use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use std::time::{Duration, Instant};

use crate::config::mask_dsn_password;
use crate::logging::log_registry_operation;

/// Pooled connection to the organization registry
#[derive(Debug, Clone)]
pub struct RegistryConnection {
    pool: PgPool,
}

impl RegistryConnection {
    /// Open the pool and verify it with a health check. Failing here is the
    /// one condition that aborts a run.
    pub async fn connect(dsn: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let started = Instant::now();
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(dsn)
            .await?;

        let connection = Self { pool };
        let healthy = connection.health_check().await?;
        log_registry_operation(
            "connect",
            0,
            if healthy { "healthy" } else { "unhealthy" },
            Some(started.elapsed().as_millis() as u64),
            Some(&mask_dsn_password(dsn)),
        );

        Ok(connection)
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 as health")
            .fetch_one(&self.pool)
            .await?;

        let health: i32 = row.get("health");
        Ok(health == 1)
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}
