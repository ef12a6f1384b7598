//! Request tracing context and the shared-secret gate.

use crate::error::ApiError;
use crate::metrics;
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderName, Method};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::headers::authorization::Basic;
use axum_extra::headers::{Authorization, HeaderMapExt};
use tracing::Instrument;
use uuid::Uuid;

/// Maximum length for trace IDs.
/// Longer trace IDs are truncated to prevent log bloat and potential log injection.
const MAX_TRACE_ID_LEN: usize = 128;

/// Header carrying the trace ID in both directions.
pub const X_TRACE_ID: HeaderName = HeaderName::from_static("x-trace-id");

/// Trace ID for request correlation.
#[derive(Clone, Debug)]
pub struct TraceId(pub String);

impl TraceId {
    /// Generate a new random trace ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create a trace ID from a client-provided value.
    /// The value is truncated to MAX_TRACE_ID_LEN characters and non-printable characters removed.
    pub fn from_client(value: &str) -> Self {
        let sanitized: String = value
            .chars()
            .take(MAX_TRACE_ID_LEN)
            .filter(|c| c.is_ascii_graphic() || *c == ' ')
            .collect();

        if sanitized.is_empty() {
            Self::new()
        } else {
            Self(sanitized)
        }
    }

    /// Get the trace ID as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TraceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Extract trace ID from X-Trace-Id header or generate a new one.
fn extract_or_generate_trace_id(req: &Request) -> TraceId {
    req.headers()
        .get(&X_TRACE_ID)
        .and_then(|v| v.to_str().ok())
        .map(TraceId::from_client)
        .unwrap_or_else(TraceId::new)
}

/// Attach a trace ID to the request and run the rest of the chain in its span.
pub async fn trace_middleware(mut req: Request, next: Next) -> Response {
    let trace_id = extract_or_generate_trace_id(&req);
    let span = tracing::info_span!(
        "request",
        trace_id = %trace_id,
        method = %req.method(),
        path = %req.uri().path()
    );
    req.extensions_mut().insert(trace_id);

    next.run(req).instrument(span).await
}

/// Trace ID attached by [`trace_middleware`], if the request went through it.
pub fn get_trace_id(req: &Request) -> Option<&TraceId> {
    req.extensions().get::<TraceId>()
}

/// Password from an `Authorization: Basic` header.
///
/// The scheme is matched case-insensitively and the username is ignored.
/// Returns `None` when the header is missing or malformed.
pub fn basic_auth_password(headers: &HeaderMap) -> Option<String> {
    headers
        .typed_get::<Authorization<Basic>>()
        .map(|auth| auth.password().to_string())
}

/// Whether a request method is let through without credentials.
pub fn is_retrieval(method: &Method) -> bool {
    method == Method::GET
}

/// Gate middleware: retrieval passes, everything else needs the shared secret.
///
/// Failures answer 401 with no body and never reach the inner handler.
pub async fn auth_middleware(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if is_retrieval(req.method()) {
        return next.run(req).await;
    }

    let authorized = basic_auth_password(req.headers())
        .is_some_and(|password| state.secret.verify(password.as_bytes()));

    if !authorized {
        metrics::AUTH_FAILURES.inc();
        tracing::debug!(
            method = %req.method(),
            path = %req.uri().path(),
            "Rejected request without valid credentials"
        );
        return ApiError::Unauthorized.into_response();
    }

    next.run(req).await
}
