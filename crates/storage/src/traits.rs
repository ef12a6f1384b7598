//! Storage trait definitions.

use crate::error::StorageResult;
use async_trait::async_trait;

/// The object store the upload handler persists uploads to.
///
/// The gateway never reads or writes objects itself; it only needs to know
/// the store is reachable before it starts accepting uploads.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;

    /// Human-readable location (endpoint and bucket) for logs.
    fn location(&self) -> String;

    /// Verify the store is reachable and the bucket exists.
    async fn health_check(&self) -> StorageResult<()>;
}
