//! Upload server hook receiver.
//!
//! The tus server posts a JSON document for each enabled hook event. Only
//! `post-finish` carries information the gateway needs; it is turned into a
//! [`CompletedUpload`] and queued for the completion listener.

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use satchel_core::{CompletedUpload, UploadId};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;

/// Hook type emitted once all bytes of an upload have been received.
pub const POST_FINISH: &str = "post-finish";

/// Hook delivery body.
#[derive(Debug, Deserialize)]
pub struct HookRequest {
    #[serde(rename = "Type")]
    pub hook_type: String,
    #[serde(rename = "Event")]
    pub event: HookEvent,
}

#[derive(Debug, Deserialize)]
pub struct HookEvent {
    #[serde(rename = "Upload")]
    pub upload: HookUpload,
}

/// Upload description as sent by the tus server.
#[derive(Debug, Deserialize)]
pub struct HookUpload {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Size", default)]
    pub size: Option<u64>,
    #[serde(rename = "MetaData", default)]
    pub metadata: Option<HashMap<String, String>>,
}

impl HookUpload {
    /// Convert to a completion notification.
    pub fn into_completed(self) -> satchel_core::Result<CompletedUpload> {
        let id = UploadId::parse(&self.id)?;
        Ok(CompletedUpload {
            id,
            size: self.size,
            metadata: self.metadata.unwrap_or_default(),
        })
    }
}

/// POST /hooks/tus
///
/// Waits for room in the completion queue before acknowledging, so a slow
/// listener slows hook delivery down instead of buffering without bound.
pub async fn tus_hook(
    State(state): State<AppState>,
    Json(hook): Json<HookRequest>,
) -> ApiResult<Json<Value>> {
    metrics::HOOKS_RECEIVED
        .with_label_values(&[hook.hook_type.as_str()])
        .inc();

    if hook.hook_type != POST_FINISH {
        tracing::debug!(hook_type = %hook.hook_type, "Ignoring hook event");
        return Ok(Json(json!({})));
    }

    let upload = hook.event.upload.into_completed()?;
    tracing::debug!(upload_id = %upload.id, "Queueing completed upload");

    state.completions.send(upload).await.map_err(|e| {
        tracing::error!(upload_id = %e.0.id, "Completion listener is not running");
        ApiError::Unavailable("completion listener is not running".to_string())
    })?;

    Ok(Json(json!({})))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_post_finish() {
        let body = r#"{
            "Type": "post-finish",
            "Event": {
                "Upload": {
                    "ID": "abc123",
                    "Size": 42,
                    "SizeIsDeferred": false,
                    "Offset": 42,
                    "MetaData": {"fileName": "report.pdf", "filetype": "application/pdf"},
                    "IsPartial": false,
                    "IsFinal": false,
                    "PartialUploads": null,
                    "Storage": {"Type": "s3store", "Bucket": "attachment", "Key": "abc123"}
                },
                "HTTPRequest": {"Method": "PATCH", "URI": "/files/abc123", "RemoteAddr": "", "Header": {}}
            }
        }"#;

        let hook: HookRequest = serde_json::from_str(body).unwrap();
        assert_eq!(hook.hook_type, POST_FINISH);

        let upload = hook.event.upload.into_completed().unwrap();
        assert_eq!(upload.id.as_str(), "abc123");
        assert_eq!(upload.size, Some(42));
        assert_eq!(upload.file_name(), Some("report.pdf"));
    }

    #[test]
    fn decode_null_metadata() {
        let body = r#"{"Type": "post-finish", "Event": {"Upload": {"ID": "abc123", "MetaData": null}}}"#;
        let hook: HookRequest = serde_json::from_str(body).unwrap();
        let upload = hook.event.upload.into_completed().unwrap();
        assert!(upload.metadata.is_empty());
        assert_eq!(upload.file_name(), None);
    }

    #[test]
    fn empty_id_rejected() {
        let body = r#"{"Type": "post-finish", "Event": {"Upload": {"ID": ""}}}"#;
        let hook: HookRequest = serde_json::from_str(body).unwrap();
        assert!(hook.event.upload.into_completed().is_err());
    }
}
