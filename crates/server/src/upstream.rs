//! Streaming reverse proxy to the tus upload server.
//!
//! This is the inner handler of the upload chain. `{base}/{rest}` is forwarded
//! to `{upstream}{rest}` with the query string intact, bodies streamed in both
//! directions. `Location` headers pointing into the upstream are mapped back
//! under the public base path so clients keep talking to the gateway. The
//! request's trace ID travels upstream in `X-Trace-Id`.

use crate::auth::{X_TRACE_ID, get_trace_id};
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use axum::Router;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use axum::response::Response;
use reqwest::Url;
use satchel_core::config::{AppConfig, UploadConfig};

/// Hop-by-hop headers that must not be forwarded (RFC 9110 section 7.6.1).
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");
const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

/// Connection to the upstream tus server.
#[derive(Clone, Debug)]
pub struct Upstream {
    client: reqwest::Client,
    /// Upstream base URL, always ending in '/'.
    base_url: Url,
    /// Public mount path without trailing separator.
    base_path: String,
}

impl Upstream {
    /// Build from configuration.
    pub fn from_config(config: &AppConfig) -> ApiResult<Self> {
        Self::new(&config.upload, config.server.base_path())
    }

    pub fn new(config: &UploadConfig, base_path: &str) -> ApiResult<Self> {
        config.validate().map_err(ApiError::Internal)?;

        let mut base_url = Url::parse(&config.upstream)
            .map_err(|e| ApiError::Internal(format!("invalid upstream url: {e}")))?;
        base_url.set_query(None);
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        // Redirects and Location headers are the client's business.
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| ApiError::Internal(format!("failed to build http client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            base_path: base_path.trim_end_matches('/').to_string(),
        })
    }

    /// Router that forwards every request it receives.
    pub fn into_router(self) -> Router {
        Router::new().fallback(proxy).with_state(self)
    }

    /// Upstream URL for a request path under the public base path.
    pub fn target_url(&self, path: &str, query: Option<&str>) -> ApiResult<Url> {
        let rest = path
            .strip_prefix(&self.base_path)
            .map(|rest| rest.trim_start_matches('/'))
            .ok_or_else(|| ApiError::NotFound(format!("{path} is not under {}", self.base_path)))?;

        let mut url = Url::parse(&format!("{}{rest}", self.base_url))
            .map_err(|e| ApiError::BadRequest(format!("invalid upload path: {e}")))?;
        url.set_query(query);
        Ok(url)
    }

    /// Map an upstream `Location` back under the public base path.
    ///
    /// Locations outside the upstream base are returned unchanged.
    pub fn public_location(&self, location: &str) -> String {
        let upstream_path = self.base_url.path();

        let (path, query) = match Url::parse(location) {
            Ok(url) => (url.path().to_string(), url.query().map(str::to_string)),
            Err(_) => match location.split_once('?') {
                Some((path, query)) => (path.to_string(), Some(query.to_string())),
                None => (location.to_string(), None),
            },
        };

        let Some(rest) = path.strip_prefix(upstream_path) else {
            return location.to_string();
        };

        match query {
            Some(query) => format!("{}/{rest}?{query}", self.base_path),
            None => format!("{}/{rest}", self.base_path),
        }
    }
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in &HOP_BY_HOP {
        headers.remove(name);
    }
}

/// Forward one request to the upstream server.
pub async fn proxy(State(upstream): State<Upstream>, req: Request) -> ApiResult<Response> {
    let trace_id = get_trace_id(&req).cloned();
    let (parts, body) = req.into_parts();
    let url = upstream.target_url(parts.uri.path(), parts.uri.query())?;

    let mut headers = parts.headers;
    let has_body = headers.contains_key(header::CONTENT_LENGTH)
        || headers.contains_key(header::TRANSFER_ENCODING);
    strip_hop_by_hop(&mut headers);
    headers.remove(header::AUTHORIZATION);
    if let Some(host) = headers.remove(header::HOST)
        && !headers.contains_key(&X_FORWARDED_HOST)
    {
        headers.insert(X_FORWARDED_HOST, host);
    }
    if !headers.contains_key(&X_FORWARDED_PROTO) {
        headers.insert(X_FORWARDED_PROTO, HeaderValue::from_static("http"));
    }
    if let Some(trace_id) = &trace_id
        && let Ok(value) = HeaderValue::from_str(trace_id.as_str())
    {
        headers.insert(X_TRACE_ID, value);
    }

    let mut request = upstream
        .client
        .request(parts.method.clone(), url.clone())
        .headers(headers);
    if has_body {
        request = request.body(reqwest::Body::wrap_stream(body.into_data_stream()));
    }

    let response = request.send().await.map_err(|e| {
        metrics::UPSTREAM_ERRORS.inc();
        tracing::error!(method = %parts.method, url = %url, error = %e, "Upstream request failed");
        ApiError::Upstream("upload server unreachable".to_string())
    })?;

    let status = response.status();
    let mut headers = response.headers().clone();
    strip_hop_by_hop(&mut headers);
    let mapped = headers
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(|location| upstream.public_location(location));
    if let Some(mapped) = mapped {
        let value = HeaderValue::from_str(&mapped)
            .map_err(|e| ApiError::Internal(format!("invalid location header: {e}")))?;
        headers.insert(header::LOCATION, value);
    }

    let mut builder = Response::builder().status(status);
    if let Some(target) = builder.headers_mut() {
        *target = headers;
    }
    builder
        .body(Body::from_stream(response.bytes_stream()))
        .map_err(|e| ApiError::Internal(format!("failed to build response: {e}")))
}
