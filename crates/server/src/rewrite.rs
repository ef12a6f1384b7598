//! Name-addressed retrieval.
//!
//! A `GET {base}/{name}` is resolved through the registry and forwarded as
//! `GET {base}/{upload id}`. Unknown names stop here with 404 and never reach
//! the upload handler. Other methods pass through untouched.

use crate::error::ApiError;
use crate::metrics;
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::{Method, Uri};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use satchel_core::UploadId;
use satchel_registry::RegistryError;

/// Characters escaped when an upload id is placed in a single path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// File name addressed by `path` under `base`, percent-decoded.
///
/// `None` for the bare mount (with or without trailing separator), for paths
/// outside `base`, and for names that are not valid UTF-8 once decoded.
pub fn candidate_name(base: &str, path: &str) -> Option<String> {
    let rest = path.strip_prefix(base)?.strip_prefix('/')?;
    if rest.is_empty() {
        return None;
    }
    percent_decode_str(rest)
        .decode_utf8()
        .ok()
        .map(|name| name.into_owned())
}

/// URI addressing `upload_id` under `base`, keeping the original query.
pub fn rewritten_uri(base: &str, upload_id: &UploadId, original: &Uri) -> Result<Uri, ApiError> {
    let encoded = utf8_percent_encode(upload_id.as_str(), PATH_SEGMENT);
    let path_and_query = match original.query() {
        Some(query) => format!("{base}/{encoded}?{query}"),
        None => format!("{base}/{encoded}"),
    };

    Uri::try_from(path_and_query)
        .map_err(|e| ApiError::Internal(format!("cannot address upload {upload_id}: {e}")))
}

/// Rewriter middleware for the upload chain.
pub async fn rewrite_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    if req.method() != Method::GET {
        return next.run(req).await;
    }

    let base = state.base_path();
    let Some(name) = candidate_name(base, req.uri().path()) else {
        metrics::record_lookup("not_found");
        tracing::debug!(path = %req.uri().path(), "No file name in retrieval path");
        return ApiError::NotFound("no file name in request path".to_string()).into_response();
    };

    let upload_id = match state.registry.resolve(&name).await {
        Ok(upload_id) => upload_id,
        Err(RegistryError::NotFound(_)) => {
            metrics::record_lookup("not_found");
            tracing::debug!(file_name = %name, "No upload recorded for file name");
            return ApiError::NotFound(format!("no upload recorded for {name}")).into_response();
        }
        Err(e) => {
            metrics::record_lookup("unavailable");
            tracing::error!(file_name = %name, error = %e, "Registry lookup failed");
            return ApiError::Unavailable("identifier registry unavailable".to_string())
                .into_response();
        }
    };

    let uri = match rewritten_uri(base, &upload_id, req.uri()) {
        Ok(uri) => uri,
        Err(e) => return e.into_response(),
    };

    metrics::record_lookup("found");
    tracing::debug!(file_name = %name, upload_id = %upload_id, "Resolved file name");

    let (mut parts, body) = req.into_parts();
    parts.uri = uri;
    next.run(Request::from_parts(parts, body)).await
}
