//! Common test utilities for registry tests.

use satchel_core::UploadId;
use satchel_registry::{PostgresRegistry, Registry, RegistryError, RegistryResult, SqliteRegistry};
use std::sync::Arc;
use tempfile::TempDir;
use testcontainers::{ContainerAsync, ImageExt, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;

/// A SQLite registry living in a temporary directory.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestRegistry {
    pub registry: SqliteRegistry,
    pub temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestRegistry {
    /// Create a fresh registry.
    pub async fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let registry = SqliteRegistry::new(temp_dir.path().join("registry.db"))
            .await
            .expect("Failed to create registry");
        Self { registry, temp_dir }
    }

    /// Path of the database file.
    pub fn db_path(&self) -> std::path::PathBuf {
        self.temp_dir.path().join("registry.db")
    }
}

/// Parse an upload id, panicking on invalid input.
#[allow(dead_code)]
pub fn upload_id(s: &str) -> UploadId {
    UploadId::parse(s).expect("valid upload id")
}

/// Stable prefix for container startup failures in Postgres test setup.
/// Tests use this marker to decide whether to skip due to unavailable Docker.
#[allow(dead_code)]
pub const POSTGRES_CONTAINER_START_ERR_PREFIX: &str = "postgres-container-start:";

/// A PostgreSQL registry backed by a throwaway container.
#[allow(dead_code)]
pub struct PostgresTestRegistry {
    pub registry: Arc<PostgresRegistry>,
    _container: ContainerAsync<Postgres>,
}

#[allow(dead_code)]
impl PostgresTestRegistry {
    /// Start a container and connect a registry to it.
    pub async fn new() -> RegistryResult<Self> {
        let container = Postgres::default()
            .with_tag("15-alpine")
            .start()
            .await
            .map_err(|e| {
                RegistryError::Config(format!(
                    "{POSTGRES_CONTAINER_START_ERR_PREFIX} Failed to start PostgreSQL container: {e}"
                ))
            })?;

        let host = container.get_host().await.expect("Failed to get host");
        let port = container
            .get_host_port_ipv4(5432)
            .await
            .expect("Failed to get port");

        // Default credentials from testcontainers-modules postgres
        let url = format!("postgres://postgres:postgres@{host}:{port}/postgres");
        let registry = PostgresRegistry::from_url(&url, 8).await?;

        Ok(Self {
            registry: Arc::new(registry),
            _container: container,
        })
    }

    /// The registry as a trait object.
    pub fn registry(&self) -> Arc<dyn Registry> {
        self.registry.clone()
    }
}
