//! Registry test doubles.

use async_trait::async_trait;
use satchel_core::UploadId;
use satchel_registry::{Registry, RegistryError, RegistryResult};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Registry whose backend is always down.
#[allow(dead_code)]
#[derive(Default)]
pub struct FailingRegistry {
    pub calls: AtomicUsize,
}

#[allow(dead_code)]
impl FailingRegistry {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Registry for FailingRegistry {
    async fn resolve(&self, _file_name: &str) -> RegistryResult<UploadId> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(RegistryError::Unavailable(sqlx::Error::PoolTimedOut))
    }

    async fn record(&self, _file_name: &str, _upload_id: &UploadId) -> RegistryResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(RegistryError::Unavailable(sqlx::Error::PoolTimedOut))
    }

    async fn migrate(&self) -> RegistryResult<()> {
        Ok(())
    }

    async fn health_check(&self) -> RegistryResult<()> {
        Err(RegistryError::Unavailable(sqlx::Error::PoolTimedOut))
    }
}
