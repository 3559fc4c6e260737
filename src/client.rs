//! Content store client
//!
//! Lazily-initialized façade over the configured providers. Every operation
//! picks the provider slot for its capability and fails explicitly when the
//! slot is empty.
//!
//! # Example
//!
//! ```rust,no_run
//! use content_store_client::{ContentStoreClient, ContentStoreConfig, UploadOptions};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ContentStoreClient::new(ContentStoreConfig::default());
//!
//! let result = client
//!     .upload_json(&serde_json::json!({"a": 1}), UploadOptions::default())
//!     .await?;
//! let value: serde_json::Value = client.get_json(&result.hash()).await?;
//!
//! println!("{}", client.gateway_url(&result.hash(), None));
//! # Ok(())
//! # }
//! ```

use crate::config::ContentStoreConfig;
use crate::error::{ContentStoreError, ProviderError, Result};
use crate::identifier::{self, ContentId};
use crate::providers::{
    ByteStore, DefaultProviderFactory, PinStore, ProviderFactory, ProviderSet, StructuredStore,
};
use crate::types::{Content, ContentKind, NftMetadata, UploadOptions, UploadResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

/// Lifecycle state of a client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Uninitialized,
    Initializing,
    Ready,
    Stopped,
}

struct Inner {
    state: ClientState,
    providers: Option<ProviderSet>,
}

/// Content store client
///
/// Share one instance per process as `Arc<ContentStoreClient>`.
pub struct ContentStoreClient {
    config: ContentStoreConfig,
    factory: Arc<dyn ProviderFactory>,
    inner: RwLock<Inner>,
    /// Serializes first-time initialization
    init_lock: Mutex<()>,
}

impl ContentStoreClient {
    /// Create a client that builds providers from `config`
    pub fn new(config: ContentStoreConfig) -> Self {
        Self::with_factory(config, Arc::new(DefaultProviderFactory))
    }

    /// Create a client with a custom provider factory
    pub fn with_factory(config: ContentStoreConfig, factory: Arc<dyn ProviderFactory>) -> Self {
        Self {
            config,
            factory,
            inner: RwLock::new(Inner {
                state: ClientState::Uninitialized,
                providers: None,
            }),
            init_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &ContentStoreConfig {
        &self.config
    }

    pub async fn state(&self) -> ClientState {
        self.inner.read().await.state
    }

    pub async fn is_initialized(&self) -> bool {
        self.state().await == ClientState::Ready
    }

    /// Build providers if not already done
    ///
    /// Concurrent callers wait on one construction. A failure leaves the client
    /// uninitialized so the call can be retried.
    pub async fn initialize(&self) -> Result<()> {
        if self.is_initialized().await {
            return Ok(());
        }

        let _guard = self.init_lock.lock().await;
        if self.is_initialized().await {
            return Ok(());
        }

        let previous = {
            let mut inner = self.inner.write().await;
            let previous = inner.state;
            inner.state = ClientState::Initializing;
            previous
        };
        debug!(from = ?previous, "Initializing content store client");

        match self.factory.build(&self.config).await {
            Ok(providers) => {
                let mut inner = self.inner.write().await;
                inner.providers = Some(providers);
                inner.state = ClientState::Ready;
                info!("Content store client initialized");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Failed to initialize content store client");
                let mut inner = self.inner.write().await;
                inner.providers = None;
                inner.state = ClientState::Uninitialized;
                Err(ContentStoreError::Initialization(e))
            }
        }
    }

    /// Shut down live providers and mark the client stopped
    pub async fn stop(&self) -> Result<()> {
        let _guard = self.init_lock.lock().await;

        let providers = {
            let mut inner = self.inner.write().await;
            inner.state = ClientState::Stopped;
            inner.providers.take()
        };

        if let Some(providers) = providers {
            for handle in &providers.lifecycle {
                if let Err(e) = handle.shutdown().await {
                    warn!(error = %e, "Provider shutdown failed");
                }
            }
            info!("Content store client stopped");
        }

        Ok(())
    }

    async fn providers(&self) -> Result<ProviderSet> {
        self.initialize().await?;
        let inner = self.inner.read().await;
        // A concurrent stop() can land between initialize and this read
        inner
            .providers
            .clone()
            .ok_or_else(|| ContentStoreError::Initialization(ProviderError::Unavailable("client stopped".into())))
    }

    async fn byte_store(&self, operation: &'static str) -> Result<Arc<dyn ByteStore>> {
        self.providers().await?.bytes.ok_or(ContentStoreError::UnsupportedOperation {
            operation,
            capability: "byte store",
        })
    }

    async fn structured_store(&self, operation: &'static str) -> Result<Arc<dyn StructuredStore>> {
        self.providers()
            .await?
            .structured
            .ok_or(ContentStoreError::UnsupportedOperation {
                operation,
                capability: "structured store",
            })
    }

    async fn pin_store(&self, operation: &'static str) -> Result<Arc<dyn PinStore>> {
        self.providers().await?.pins.ok_or(ContentStoreError::UnsupportedOperation {
            operation,
            capability: "pinning",
        })
    }

    fn finish_upload(id: ContentId, size: usize, options: &UploadOptions) -> UploadResult {
        let mut result = UploadResult::new(id, size as u64);
        if let Some(ref path) = options.source_path {
            result = result.with_source_path(path.clone());
        }
        result
    }

    // ==================== Upload ====================

    pub async fn upload_bytes(&self, data: &[u8], options: UploadOptions) -> Result<UploadResult> {
        let store = self.byte_store("upload_bytes").await?;

        let id = store
            .add_bytes(data, options.progress.as_ref())
            .await
            .map_err(|e| {
                error!(error = %e, size = data.len(), "Failed to upload bytes");
                ContentStoreError::Upload(e)
            })?;

        info!(cid = %id, size = data.len(), "Uploaded bytes");
        Ok(Self::finish_upload(id, data.len(), &options))
    }

    /// Upload any serializable value through the JSON path
    ///
    /// The stored document is the compact JSON encoding of `data` with its
    /// field order intact, and `size` is its length.
    pub async fn upload_json<T: Serialize + ?Sized>(
        &self,
        data: &T,
        options: UploadOptions,
    ) -> Result<UploadResult> {
        let value = serde_json::to_value(data).map_err(|e| ContentStoreError::Upload(e.into()))?;
        let size = serde_json::to_vec(&value)
            .map_err(|e| ContentStoreError::Upload(e.into()))?
            .len();

        let store = self.structured_store("upload_json").await?;
        let id = store
            .add_json(&value, options.progress.as_ref())
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to upload JSON");
                ContentStoreError::Upload(e)
            })?;

        info!(cid = %id, size, "Uploaded JSON");
        Ok(Self::finish_upload(id, size, &options))
    }

    pub async fn upload_string(&self, text: &str, options: UploadOptions) -> Result<UploadResult> {
        let store = self.structured_store("upload_string").await?;

        let id = store
            .add_string(text, options.progress.as_ref())
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to upload string");
                ContentStoreError::Upload(e)
            })?;

        info!(cid = %id, size = text.len(), "Uploaded string");
        Ok(Self::finish_upload(id, text.len(), &options))
    }

    pub async fn upload_nft_metadata(
        &self,
        metadata: &NftMetadata,
        options: UploadOptions,
    ) -> Result<UploadResult> {
        self.upload_json(metadata, options).await
    }

    // ==================== Retrieval ====================

    /// Fetch the full payload of `id` as bytes
    pub async fn get_bytes(&self, id: &str) -> Result<Vec<u8>> {
        let cid = ContentId::parse(id)?;
        let store = self.byte_store("get_bytes").await?;

        store.cat(&cid).await.map_err(|e| {
            error!(cid = %cid, error = %e, "Failed to retrieve bytes");
            ContentStoreError::Retrieval {
                id: id.to_string(),
                source: e,
            }
        })
    }

    /// Fetch a JSON document and deserialize it into `T`
    pub async fn get_json<T: DeserializeOwned>(&self, id: &str) -> Result<T> {
        let cid = ContentId::parse(id)?;
        let store = self.structured_store("get_json").await?;

        let retrieval_error = |e: ProviderError| {
            error!(cid = %cid, error = %e, "Failed to retrieve JSON");
            ContentStoreError::Retrieval {
                id: id.to_string(),
                source: e,
            }
        };

        let value = store.get_json(&cid).await.map_err(retrieval_error)?;
        serde_json::from_value(value).map_err(|e| retrieval_error(e.into()))
    }

    pub async fn get_string(&self, id: &str) -> Result<String> {
        let cid = ContentId::parse(id)?;
        let store = self.structured_store("get_string").await?;

        store.get_string(&cid).await.map_err(|e| {
            error!(cid = %cid, error = %e, "Failed to retrieve string");
            ContentStoreError::Retrieval {
                id: id.to_string(),
                source: e,
            }
        })
    }

    /// Fetch `id` as the given kind
    ///
    /// The caller decides the kind. No probing between kinds is done, so a
    /// payload that is valid both as JSON and as text comes back as requested.
    pub async fn get_content(&self, id: &str, kind: ContentKind) -> Result<Content> {
        Ok(match kind {
            ContentKind::Json => Content::Json(self.get_json(id).await?),
            ContentKind::String => Content::Text(self.get_string(id).await?),
            ContentKind::Bytes => Content::Bytes(self.get_bytes(id).await?),
        })
    }

    // ==================== Addressing ====================

    /// `{gateway}{id}`, with `gateway_override` taking precedence
    pub fn gateway_url(&self, id: &str, gateway_override: Option<&str>) -> String {
        let base = gateway_override.unwrap_or(self.config.gateway_url.as_str());
        format!("{}{}", base, id)
    }

    pub fn is_valid_identifier(&self, id: &str) -> bool {
        identifier::is_valid_identifier(id)
    }

    // ==================== Pinning ====================

    pub async fn pin_content(&self, id: &str) -> Result<()> {
        let cid = ContentId::parse(id)?;
        let store = self.pin_store("pin_content").await?;

        store.pin(&cid).await.map_err(|e| {
            error!(cid = %cid, provider = store.name(), error = %e, "Failed to pin content");
            ContentStoreError::Pin {
                id: id.to_string(),
                source: e,
            }
        })?;

        info!(cid = %cid, provider = store.name(), "Pinned content");
        Ok(())
    }

    pub async fn unpin_content(&self, id: &str) -> Result<()> {
        let cid = ContentId::parse(id)?;
        let store = self.pin_store("unpin_content").await?;

        store.unpin(&cid).await.map_err(|e| {
            error!(cid = %cid, provider = store.name(), error = %e, "Failed to unpin content");
            ContentStoreError::Unpin {
                id: id.to_string(),
                source: e,
            }
        })?;

        info!(cid = %cid, provider = store.name(), "Unpinned content");
        Ok(())
    }
}
