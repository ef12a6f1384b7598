//! Application state shared across handlers.

use crate::completion::CompletionSender;
use satchel_core::SharedSecret;
use satchel_core::config::AppConfig;
use satchel_registry::Registry;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// File name to upload identifier registry.
    pub registry: Arc<dyn Registry>,
    /// Decoded shared secret for mutating requests.
    pub secret: Arc<SharedSecret>,
    /// Producer side of the completion queue.
    pub completions: CompletionSender,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Fails if the server section is invalid (so the router can be built)
    /// or the configured shared secret cannot be decoded.
    pub fn new(
        config: AppConfig,
        registry: Arc<dyn Registry>,
        completions: CompletionSender,
    ) -> satchel_core::Result<Self> {
        config
            .server
            .validate()
            .map_err(satchel_core::Error::Config)?;
        let secret = config.auth.shared_secret()?;

        Ok(Self {
            config: Arc::new(config),
            registry,
            secret: Arc::new(secret),
            completions,
        })
    }

    /// Path prefix the upload chain is mounted under, without trailing separator.
    pub fn base_path(&self) -> &str {
        self.config.server.base_path()
    }
}
