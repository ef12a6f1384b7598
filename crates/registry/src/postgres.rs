//! PostgreSQL-backed registry.

use crate::error::{RegistryError, RegistryResult};
use crate::store::{Registry, SCHEMA_SQL, upload_id_from_row};
use async_trait::async_trait;
use satchel_core::UploadId;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Pool, Postgres};
use std::str::FromStr;

/// PostgreSQL-backed registry.
pub struct PostgresRegistry {
    pool: Pool<Postgres>,
}

impl PostgresRegistry {
    /// Connect using a `postgres://` URL.
    pub async fn from_url(url: &str, max_connections: u32) -> RegistryResult<Self> {
        let opts = PgConnectOptions::from_str(url)?;

        tracing::info!(
            host = opts.get_host(),
            port = opts.get_port(),
            database = opts.get_database().unwrap_or("<default>"),
            "Connecting to PostgreSQL registry"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_with(opts)
            .await?;

        let registry = Self { pool };
        registry.migrate().await?;
        Ok(registry)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }
}

#[async_trait]
impl Registry for PostgresRegistry {
    async fn resolve(&self, file_name: &str) -> RegistryResult<UploadId> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT upload_id FROM file_id_map WHERE file_name = $1")
                .bind(file_name)
                .fetch_optional(&self.pool)
                .await?;

        match value {
            Some(value) => upload_id_from_row(file_name, value),
            None => Err(RegistryError::NotFound(file_name.to_string())),
        }
    }

    async fn record(&self, file_name: &str, upload_id: &UploadId) -> RegistryResult<()> {
        sqlx::query(
            r#"
            INSERT INTO file_id_map (file_name, upload_id)
            VALUES ($1, $2)
            ON CONFLICT(file_name) DO UPDATE
            SET upload_id = EXCLUDED.upload_id
            "#,
        )
        .bind(file_name)
        .bind(upload_id.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn migrate(&self) -> RegistryResult<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> RegistryResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
