//! Core domain types and shared logic for the Satchel attachment gateway.
//!
//! This crate defines the data model used across all other crates:
//! - Opaque upload identifiers and completion notifications
//! - The shared secret guarding mutating requests
//! - Application configuration

pub mod config;
pub mod error;
pub mod secret;
pub mod upload;

pub use error::{Error, Result};
pub use secret::SharedSecret;
pub use upload::{CompletedUpload, FILE_NAME_METADATA_KEY, UploadId};

/// Default mount point of the upload handler chain.
pub const DEFAULT_BASE_PATH: &str = "/attachments";

/// Liveness endpoint path.
pub const HEALTH_PATH: &str = "/health";

/// Prometheus scrape endpoint path.
pub const METRICS_PATH: &str = "/metrics";

/// Upload server hook endpoint path.
pub const HOOKS_PATH: &str = "/hooks/tus";

/// Fixed routes the upload chain may not be mounted over.
pub const RESERVED_PATHS: [&str; 3] = [HEALTH_PATH, METRICS_PATH, HOOKS_PATH];

/// Default capacity of the completion notification queue.
pub const DEFAULT_COMPLETION_QUEUE_CAPACITY: usize = 1024;
