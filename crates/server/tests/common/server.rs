//! Server test utilities.

use axum::Router;
use axum::body::Body;
use axum::extract::Request;
use axum::http::{Response, StatusCode};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use satchel_core::config::AppConfig;
use satchel_core::{CompletedUpload, UploadId};
use satchel_registry::{Registry, SqliteRegistry};
use satchel_server::completion;
use satchel_server::{AppState, create_router};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;

/// Password matching `AppConfig::for_testing()`.
#[allow(dead_code)]
pub const TEST_PASSWORD: &str = "test-secret";

/// `Authorization` header value for the given username and password.
#[allow(dead_code)]
pub fn basic_auth(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
}

/// Stand-in upload handler: counts calls and echoes what it received.
#[allow(dead_code)]
pub fn echo_router(calls: Arc<AtomicUsize>) -> Router {
    Router::new().fallback(move |req: Request| {
        let calls = calls.clone();
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            let (parts, body) = req.into_parts();
            let body = axum::body::to_bytes(body, usize::MAX)
                .await
                .unwrap_or_default();
            let echoed = json!({
                "method": parts.method.as_str(),
                "path": parts.uri.path(),
                "query": parts.uri.query(),
                "x_test": parts.headers.get("x-test").and_then(|v| v.to_str().ok()),
                "body": String::from_utf8_lossy(&body),
            });
            (StatusCode::OK, axum::Json(echoed))
        }
    })
}

/// A test server wrapper with all dependencies.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: Router,
    pub state: AppState,
    /// The upload handler without gate or rewriter in front.
    pub inner: Router,
    pub inner_calls: Arc<AtomicUsize>,
    /// Consumer side of the completion queue; no listener runs unless a test starts one.
    pub completions: Option<mpsc::Receiver<CompletedUpload>>,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    /// Create a new test server backed by a temporary SQLite registry.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server with custom config modifications.
    pub async fn with_config<F>(modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let registry: Arc<dyn Registry> = Arc::new(
            SqliteRegistry::new(temp_dir.path().join("registry.db"))
                .await
                .expect("Failed to create registry"),
        );
        Self::build(temp_dir, registry, modifier)
    }

    /// Create a test server around the given registry.
    pub async fn with_registry(registry: Arc<dyn Registry>) -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        Self::build(temp_dir, registry, |_| {})
    }

    fn build<F>(temp_dir: TempDir, registry: Arc<dyn Registry>, modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut config = AppConfig::for_testing();
        modifier(&mut config);

        let (tx, rx) = completion::channel(config.server.completion_queue_capacity);
        let state = AppState::new(config, registry, tx).expect("Failed to create state");

        let inner_calls = Arc::new(AtomicUsize::new(0));
        let inner = echo_router(inner_calls.clone());
        let router = create_router(state.clone(), inner.clone());

        Self {
            router,
            state,
            inner,
            inner_calls,
            completions: Some(rx),
            _temp_dir: temp_dir,
        }
    }

    /// Get access to the registry.
    pub fn registry(&self) -> Arc<dyn Registry> {
        self.state.registry.clone()
    }

    /// Record an association directly.
    pub async fn record(&self, file_name: &str, upload_id: &str) {
        self.state
            .registry
            .record(file_name, &UploadId::parse(upload_id).unwrap())
            .await
            .expect("Failed to record association");
    }

    /// Number of requests that reached the upload handler.
    pub fn inner_calls(&self) -> usize {
        self.inner_calls.load(Ordering::SeqCst)
    }

    /// Send a request through the full router.
    pub async fn send(&self, request: axum::http::Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Send a request straight to the upload handler.
    pub async fn send_inner(&self, request: axum::http::Request<Body>) -> Response<Body> {
        self.inner.clone().oneshot(request).await.unwrap()
    }
}

/// Read a response body as JSON (`Value::Null` when empty).
#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> Value {
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    if body_bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
    }
}

/// Read a response body as raw bytes.
#[allow(dead_code)]
pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}
