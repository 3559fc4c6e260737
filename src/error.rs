//! Error types for the content store client

use thiserror::Error;

/// Error raised at the provider boundary (block store, pinning API)
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Local block store I/O failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Remote API returned an error
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    /// Block not present in the store
    #[error("Block not found: {0}")]
    NotFound(String),

    /// Stored payload could not be decoded or failed its integrity check
    #[error("Decode error: {0}")]
    Decode(String),

    /// Provider could not be reached or constructed
    #[error("Provider unavailable: {0}")]
    Unavailable(String),
}

/// Content store client error
#[derive(Debug, Error)]
pub enum ContentStoreError {
    /// Providers could not be constructed
    #[error("Initialization failed: {0}")]
    Initialization(#[source] ProviderError),

    /// Identifier does not parse as a CID
    #[error("Invalid content identifier {id:?}: {reason}")]
    InvalidIdentifier { id: String, reason: String },

    #[error("Upload failed: {0}")]
    Upload(#[source] ProviderError),

    #[error("Retrieval of {id} failed: {source}")]
    Retrieval {
        id: String,
        #[source]
        source: ProviderError,
    },

    #[error("Pin of {id} failed: {source}")]
    Pin {
        id: String,
        #[source]
        source: ProviderError,
    },

    #[error("Unpin of {id} failed: {source}")]
    Unpin {
        id: String,
        #[source]
        source: ProviderError,
    },

    /// No provider for the requested capability was configured
    #[error("{operation} is not supported: no {capability} provider configured")]
    UnsupportedOperation {
        operation: &'static str,
        capability: &'static str,
    },

    /// Configuration file could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContentStoreError {
    /// True for failures detected before any provider was touched
    pub fn is_invalid_identifier(&self) -> bool {
        matches!(self, ContentStoreError::InvalidIdentifier { .. })
    }
}

/// Result type for content store operations
pub type Result<T> = std::result::Result<T, ContentStoreError>;

/// Result type for provider calls
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;
