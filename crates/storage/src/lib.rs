//! Object store access for Satchel.
//!
//! Uploads are persisted by the upstream upload handler, not by the gateway.
//! This crate only carries what the gateway needs from the store: a client
//! built from configuration and a reachability probe run before serving.

pub mod backends;
pub mod error;
pub mod traits;

pub use backends::s3::S3Backend;
pub use error::{StorageError, StorageResult};
pub use traits::ObjectStore;

use satchel_core::config::StorageConfig;
use std::sync::Arc;

/// Create an object store client from configuration.
pub async fn from_config(config: &StorageConfig) -> StorageResult<Arc<dyn ObjectStore>> {
    let backend = S3Backend::new(config).await?;
    Ok(Arc::new(backend))
}
