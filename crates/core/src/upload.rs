//! Upload identifiers and completion notifications.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Metadata key carrying the human-readable file name of an upload.
///
/// Matched ignoring ASCII case, so both `filename` and `fileName` are accepted.
pub const FILE_NAME_METADATA_KEY: &str = "filename";

/// Exact spellings tried before any case-insensitive match, in order.
const PREFERRED_FILE_NAME_KEYS: [&str; 2] = ["fileName", "filename"];

/// Opaque identifier assigned to an upload by the upload handler.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UploadId(String);

impl UploadId {
    /// Parse from a string. Empty identifiers and identifiers containing
    /// a path separator are rejected since they cannot address an upload.
    pub fn parse(s: &str) -> crate::Result<Self> {
        if s.is_empty() {
            return Err(crate::Error::InvalidUploadId("empty".to_string()));
        }
        if s.contains('/') {
            return Err(crate::Error::InvalidUploadId(format!(
                "contains a path separator: {s}"
            )));
        }
        Ok(Self(s.to_string()))
    }

    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UploadId {
    type Error = crate::Error;

    fn try_from(value: String) -> crate::Result<Self> {
        Self::parse(&value)
    }
}

impl From<UploadId> for String {
    fn from(id: UploadId) -> Self {
        id.0
    }
}

impl fmt::Debug for UploadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UploadId({})", self.0)
    }
}

impl fmt::Display for UploadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Notification emitted by the upload handler once an upload has finished.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedUpload {
    /// Identifier assigned by the upload handler.
    pub id: UploadId,
    /// Final size in bytes, when reported.
    #[serde(default)]
    pub size: Option<u64>,
    /// Client-supplied metadata attached at creation time.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CompletedUpload {
    /// Create a notification without metadata.
    pub fn new(id: UploadId) -> Self {
        Self {
            id,
            size: None,
            metadata: HashMap::new(),
        }
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// The file name recorded in the upload metadata, if any.
    ///
    /// `fileName` wins over `filename`, which wins over other casings; among
    /// those the lexicographically smallest key is used. Empty values count as
    /// absent.
    pub fn file_name(&self) -> Option<&str> {
        PREFERRED_FILE_NAME_KEYS
            .iter()
            .find_map(|key| self.metadata.get(*key))
            .or_else(|| {
                self.metadata
                    .iter()
                    .filter(|(key, _)| key.eq_ignore_ascii_case(FILE_NAME_METADATA_KEY))
                    .min_by(|a, b| a.0.cmp(b.0))
                    .map(|(_, value)| value)
            })
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}
