//! Satchel gateway binary.

use anyhow::{Context, Result};
use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use satchel_core::config::AppConfig;
use satchel_server::completion::{self, CompletionListener};
use satchel_server::{AppState, Upstream, create_router};
use serde::Serialize;
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Satchel - name-addressed attachments in front of a tus upload server
#[derive(Parser, Debug)]
#[command(name = "satchel")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "SATCHEL_CONFIG",
        default_value = "config/satchel.toml"
    )]
    config: String,

    /// Identifier registry URL (sqlite:<path> or postgres://...)
    #[arg(long)]
    registry_url: Option<String>,

    /// Object store endpoint URL
    #[arg(long)]
    storage_endpoint: Option<String>,

    /// Base64-encoded shared secret for mutating requests
    #[arg(long)]
    secret: Option<String>,
}

/// Command-line values layered over file and environment configuration.
#[derive(Serialize)]
struct CliOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    registry: Option<RegistryOverride>,
    #[serde(skip_serializing_if = "Option::is_none")]
    storage: Option<StorageOverride>,
    #[serde(skip_serializing_if = "Option::is_none")]
    auth: Option<AuthOverride>,
}

#[derive(Serialize)]
struct RegistryOverride {
    url: String,
}

#[derive(Serialize)]
struct StorageOverride {
    endpoint: String,
}

#[derive(Serialize)]
struct AuthOverride {
    secret: String,
}

impl From<&Args> for CliOverrides {
    fn from(args: &Args) -> Self {
        Self {
            registry: args
                .registry_url
                .clone()
                .map(|url| RegistryOverride { url }),
            storage: args
                .storage_endpoint
                .clone()
                .map(|endpoint| StorageOverride { endpoint }),
            auth: args.secret.clone().map(|secret| AuthOverride { secret }),
        }
    }
}

/// Load configuration: optional TOML file, then `SATCHEL_` env vars, then CLI flags.
fn load_config(args: &Args) -> Result<AppConfig> {
    let config_path = std::path::Path::new(&args.config);
    let mut figment = Figment::new();

    if config_path.exists() {
        tracing::info!(config_path = %args.config, "Loading configuration from file");
        figment = figment.merge(Toml::file(&args.config));
    } else {
        tracing::debug!("No config file found at {}", args.config);
    }

    let config: AppConfig = figment
        .merge(Env::prefixed("SATCHEL_").ignore(&["config"]).split("__"))
        .merge(Serialized::defaults(CliOverrides::from(args)))
        .extract()
        .context("failed to load configuration")?;

    config.validate().context("invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Satchel v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args)?;

    satchel_server::metrics::register_metrics();
    tracing::info!("Prometheus metrics registered");

    // Verify object store connectivity before accepting requests.
    let storage = satchel_storage::from_config(&config.storage)
        .await
        .context("failed to initialize storage")?;
    storage
        .health_check()
        .await
        .with_context(|| format!("object store {} is unreachable", storage.location()))?;
    tracing::info!(location = %storage.location(), "Object store connectivity verified");

    let registry = satchel_registry::from_config(&config.registry)
        .await
        .context("failed to connect to identifier registry")?;
    tracing::info!("Identifier registry initialized");

    let (completions, rx) = completion::channel(config.server.completion_queue_capacity);
    let listener_task = CompletionListener::new(registry.clone(), rx).spawn();

    let upstream = Upstream::from_config(&config).context("invalid upload handler")?;
    tracing::info!(upstream = %config.upload.upstream, "Forwarding uploads");

    let state =
        AppState::new(config.clone(), registry, completions).context("invalid shared secret")?;
    let app = create_router(state, upstream.into_router());

    let addr: SocketAddr = config.server.bind.parse().context("invalid bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    tracing::info!(base_path = %config.server.base_path(), "Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router held the last producer handles; let the listener drain.
    if let Err(e) = listener_task.await {
        tracing::error!(error = %e, "Completion listener task failed");
    }

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
