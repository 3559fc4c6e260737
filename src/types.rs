//! Types for the content store client API

use crate::identifier::ContentId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Result of a successful upload
///
/// Serializes as `{ "hash", "size", "path"? }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    /// Content identifier of the stored payload
    #[serde(rename = "hash")]
    pub identifier: ContentId,
    /// Payload size in bytes
    #[serde(rename = "size")]
    pub size_bytes: u64,
    /// Source path, when the upload came from a file
    #[serde(rename = "path", skip_serializing_if = "Option::is_none", default)]
    pub source_path: Option<String>,
}

impl UploadResult {
    pub fn new(identifier: ContentId, size_bytes: u64) -> Self {
        Self {
            identifier,
            size_bytes,
            source_path: None,
        }
    }

    pub fn with_source_path(mut self, path: impl Into<String>) -> Self {
        self.source_path = Some(path.into());
        self
    }

    pub fn hash(&self) -> String {
        self.identifier.to_string()
    }
}

/// Upload progress snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    /// Bytes processed so far
    pub bytes: u64,
    /// Total payload size
    pub total: u64,
}

impl UploadProgress {
    /// Percentage complete, 100 for empty payloads
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        (self.bytes as f64 / self.total as f64) * 100.0
    }
}

/// Progress callback
pub type ProgressFn = Arc<dyn Fn(UploadProgress) + Send + Sync>;

/// Options for upload operations
#[derive(Clone, Default)]
pub struct UploadOptions {
    /// Called with non-decreasing progress values
    pub progress: Option<ProgressFn>,
    /// Recorded on the result as `path`
    pub source_path: Option<String>,
}

impl UploadOptions {
    pub fn with_progress<F>(mut self, f: F) -> Self
    where
        F: Fn(UploadProgress) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(f));
        self
    }

    pub fn with_source_path(mut self, path: impl Into<String>) -> Self {
        self.source_path = Some(path.into());
        self
    }
}

impl fmt::Debug for UploadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadOptions")
            .field("progress", &self.progress.is_some())
            .field("source_path", &self.source_path)
            .finish()
    }
}

/// NFT metadata document, uploaded unchanged through the JSON path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NftMetadata {
    pub name: String,
    pub description: String,
    pub image: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub attributes: Option<Vec<NftAttribute>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub external_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub background_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub animation_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NftAttribute {
    pub trait_type: String,
    pub value: AttributeValue,
}

/// Attribute value: string or number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Number(serde_json::Number),
    Text(String),
}

/// How a retrieved payload should be materialized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Json,
    String,
    Bytes,
}

impl std::str::FromStr for ContentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ContentKind::Json),
            "string" | "text" => Ok(ContentKind::String),
            "bytes" | "raw" => Ok(ContentKind::Bytes),
            other => Err(format!("unknown content kind: {}", other)),
        }
    }
}

/// Retrieved payload tagged with the kind it was read as
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Content {
    Json(serde_json::Value),
    #[serde(rename = "string")]
    Text(String),
    Bytes(Vec<u8>),
}

impl Content {
    pub fn kind(&self) -> ContentKind {
        match self {
            Content::Json(_) => ContentKind::Json,
            Content::Text(_) => ContentKind::String,
            Content::Bytes(_) => ContentKind::Bytes,
        }
    }

    /// Render the payload as bytes (JSON is pretty-printed)
    pub fn into_bytes(self) -> serde_json::Result<Vec<u8>> {
        Ok(match self {
            Content::Json(value) => serde_json::to_vec_pretty(&value)?,
            Content::Text(text) => text.into_bytes(),
            Content::Bytes(bytes) => bytes,
        })
    }
}
