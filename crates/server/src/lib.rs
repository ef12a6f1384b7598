//! HTTP gateway for name-addressed attachments.
//!
//! This crate provides the request chain in front of a tus upload server:
//! - Shared-secret gate for every non-retrieval request
//! - Retrieval by file name, rewritten to the upload identifier
//! - Completion hook receiver and the listener feeding the registry
//! - Streaming proxy to the upstream upload server

pub mod auth;
pub mod completion;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod rewrite;
pub mod routes;
pub mod state;
pub mod upstream;

pub use auth::TraceId;
pub use completion::{CompletionListener, CompletionOutcome, CompletionSender};
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
pub use upstream::Upstream;
