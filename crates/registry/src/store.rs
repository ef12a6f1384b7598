//! Registry trait and the SQLite implementation.

use crate::error::{RegistryError, RegistryResult};
use async_trait::async_trait;
use satchel_core::UploadId;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Table holding one row per file name.
pub(crate) const SCHEMA_SQL: &str = "CREATE TABLE IF NOT EXISTS file_id_map (\
     file_name TEXT PRIMARY KEY NOT NULL, \
     upload_id TEXT NOT NULL\
     )";

/// Durable file name to upload identifier association store.
///
/// Implementations must be safe to call from any number of tasks at once;
/// each operation is a single statement so per-key atomicity comes from the
/// backing database.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Look up the upload recorded for `file_name`.
    ///
    /// Fails with [`RegistryError::NotFound`] when nothing has been recorded.
    async fn resolve(&self, file_name: &str) -> RegistryResult<UploadId>;

    /// Associate `file_name` with `upload_id`, replacing any previous association.
    async fn record(&self, file_name: &str, upload_id: &UploadId) -> RegistryResult<()>;

    /// Create the backing table if it does not exist.
    async fn migrate(&self) -> RegistryResult<()>;

    /// Check backend connectivity.
    async fn health_check(&self) -> RegistryResult<()>;
}

pub(crate) fn upload_id_from_row(file_name: &str, value: String) -> RegistryResult<UploadId> {
    UploadId::parse(&value).map_err(|e| RegistryError::Corrupt {
        file_name: file_name.to_string(),
        reason: e.to_string(),
    })
}

/// SQLite-backed registry.
pub struct SqliteRegistry {
    pool: Pool<Sqlite>,
}

impl SqliteRegistry {
    /// Open (creating if needed) a registry database file.
    pub async fn new(path: impl AsRef<Path>) -> RegistryResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        Self::from_url(&format!("sqlite:{}", path.display())).await
    }

    /// Open a registry from a `sqlite:` connection URL.
    pub async fn from_url(url: &str) -> RegistryResult<Self> {
        let opts = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        // A single connection keeps writers from tripping over "database is locked".
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let registry = Self { pool };
        registry.migrate().await?;
        tracing::debug!(url = %url, "SQLite registry ready");
        Ok(registry)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl Registry for SqliteRegistry {
    async fn resolve(&self, file_name: &str) -> RegistryResult<UploadId> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT upload_id FROM file_id_map WHERE file_name = ?")
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
            VALUES (?, ?)
            ON CONFLICT(file_name) DO UPDATE
            SET upload_id = excluded.upload_id
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
