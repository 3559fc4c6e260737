//! Typed client for content-addressed storage
//!
//! Uploads bytes, JSON and strings, retrieves them by content identifier,
//! derives gateway URLs and manages pins through whichever providers the
//! configuration enables.
//!
//! ## Providers
//!
//! - [`KuboNode`] - Kubo RPC (local daemon or Infura) for uploads, retrieval
//!   and pinning
//! - [`LocalNode`] - in-process block store (memory or directory), used when
//!   no Kubo endpoint is configured
//! - [`PinataPinStore`] - Pinata pinning service
//!
//! # Example
//!
//! ```rust,no_run
//! use content_store_client::{ContentStoreClient, ContentStoreConfig, UploadOptions};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Arc::new(ContentStoreClient::new(ContentStoreConfig {
//!     use_local_node: true,
//!     ..Default::default()
//! }));
//!
//! let result = client.upload_bytes(b"hello", UploadOptions::default()).await?;
//! client.pin_content(&result.hash()).await?;
//!
//! let data = client.get_bytes(&result.hash()).await?;
//! assert_eq!(data, b"hello");
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod identifier;
pub mod providers;
pub mod tracker;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export main types
pub use client::{ClientState, ContentStoreClient};
pub use config::ContentStoreConfig;
pub use error::{ContentStoreError, ProviderError, ProviderResult, Result};
pub use http::{FileServer, MAX_FILE_SIZE};
pub use identifier::{is_valid_identifier, ContentId};
pub use providers::{
    ByteStore, DefaultProviderFactory, KuboNode, LocalNode, PinStore, PinataPinStore,
    ProviderFactory, ProviderSet, Shutdown, StructuredStore,
};
pub use tracker::{PinState, PinTracker, RetrieveState, RetrieveTracker, UploadState, UploadTracker};
pub use types::*;
