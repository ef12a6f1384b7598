//! File name to upload identifier registry for Satchel.
//!
//! The registry is the only persistent state the gateway owns. It maps the
//! human-readable name a client uploaded under to the opaque identifier the
//! upload handler assigned, one row per name, last write wins.

pub mod error;
pub mod postgres;
pub mod store;

pub use error::{RegistryError, RegistryResult};
pub use postgres::PostgresRegistry;
pub use store::{Registry, SqliteRegistry};

use satchel_core::config::RegistryConfig;
use std::sync::Arc;

/// Backend selected by a registry connection URL.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegistryBackend {
    Sqlite,
    Postgres,
}

impl RegistryBackend {
    /// Pick the backend from the URL scheme.
    pub fn from_url(url: &str) -> RegistryResult<Self> {
        let scheme = url
            .split_once(':')
            .map(|(scheme, _)| scheme.to_ascii_lowercase())
            .ok_or_else(|| {
                RegistryError::Config(format!("registry url has no scheme: {url:?}"))
            })?;

        match scheme.as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            other => Err(RegistryError::Config(format!(
                "unsupported registry url scheme {other:?} (expected sqlite or postgres)"
            ))),
        }
    }
}

/// Create a registry from configuration.
///
/// Connects and creates the backing table; an unreachable backend is an error.
pub async fn from_config(config: &RegistryConfig) -> RegistryResult<Arc<dyn Registry>> {
    config.validate().map_err(RegistryError::Config)?;

    match RegistryBackend::from_url(&config.url)? {
        RegistryBackend::Sqlite => {
            let registry = SqliteRegistry::from_url(&config.url).await?;
            Ok(Arc::new(registry) as Arc<dyn Registry>)
        }
        RegistryBackend::Postgres => {
            let registry = PostgresRegistry::from_url(&config.url, config.max_connections).await?;
            Ok(Arc::new(registry) as Arc<dyn Registry>)
        }
    }
}
