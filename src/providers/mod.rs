//! Storage providers
//!
//! Each capability is a narrow trait. The client holds one optional slot per
//! capability and fails with `UnsupportedOperation` when a slot is empty.
//!
//! - [`ByteStore`] - add/cat raw bytes
//! - [`StructuredStore`] - add/get JSON values and strings
//! - [`PinStore`] - pin/unpin on a remote node or pinning service

pub mod kubo;
pub mod local;
pub mod pinata;

pub use kubo::KuboNode;
pub use local::LocalNode;
pub use pinata::PinataPinStore;

use crate::config::ContentStoreConfig;
use crate::error::ProviderResult;
use crate::identifier::ContentId;
use crate::types::ProgressFn;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// Raw byte storage
#[async_trait]
pub trait ByteStore: Send + Sync {
    async fn add_bytes(&self, data: &[u8], progress: Option<&ProgressFn>) -> ProviderResult<ContentId>;

    /// Fetch every block of `id` and gather it into one buffer
    async fn cat(&self, id: &ContentId) -> ProviderResult<Vec<u8>>;
}

/// JSON and string storage
#[async_trait]
pub trait StructuredStore: Send + Sync {
    async fn add_json(
        &self,
        value: &serde_json::Value,
        progress: Option<&ProgressFn>,
    ) -> ProviderResult<ContentId>;

    async fn get_json(&self, id: &ContentId) -> ProviderResult<serde_json::Value>;

    async fn add_string(&self, text: &str, progress: Option<&ProgressFn>) -> ProviderResult<ContentId>;

    async fn get_string(&self, id: &ContentId) -> ProviderResult<String>;
}

/// Pin management on a remote store
#[async_trait]
pub trait PinStore: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &'static str;

    async fn pin(&self, id: &ContentId) -> ProviderResult<()>;

    async fn unpin(&self, id: &ContentId) -> ProviderResult<()>;
}

/// Anything holding live connections that should be closed on `stop()`
#[async_trait]
pub trait Shutdown: Send + Sync {
    async fn shutdown(&self) -> ProviderResult<()>;
}

/// Live provider handles, one optional slot per capability
#[derive(Clone, Default)]
pub struct ProviderSet {
    pub bytes: Option<Arc<dyn ByteStore>>,
    pub structured: Option<Arc<dyn StructuredStore>>,
    pub pins: Option<Arc<dyn PinStore>>,
    /// Providers to shut down, each listed once
    pub lifecycle: Vec<Arc<dyn Shutdown>>,
}

/// Slot setters keep the first provider offered for a capability
impl ProviderSet {
    pub fn with_bytes(mut self, store: Arc<dyn ByteStore>) -> Self {
        if self.bytes.is_none() {
            self.bytes = Some(store);
        }
        self
    }

    pub fn with_structured(mut self, store: Arc<dyn StructuredStore>) -> Self {
        if self.structured.is_none() {
            self.structured = Some(store);
        }
        self
    }

    pub fn with_pins(mut self, store: Arc<dyn PinStore>) -> Self {
        if self.pins.is_none() {
            self.pins = Some(store);
        }
        self
    }

    pub fn with_lifecycle(mut self, handle: Arc<dyn Shutdown>) -> Self {
        self.lifecycle.push(handle);
        self
    }
}

impl std::fmt::Debug for ProviderSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSet")
            .field("bytes", &self.bytes.is_some())
            .field("structured", &self.structured.is_some())
            .field("pins", &self.pins.as_ref().map(|p| p.name()))
            .field("lifecycle", &self.lifecycle.len())
            .finish()
    }
}

/// Builds the provider set during `initialize()`
#[async_trait]
pub trait ProviderFactory: Send + Sync {
    async fn build(&self, config: &ContentStoreConfig) -> ProviderResult<ProviderSet>;
}

/// Factory driven purely by configuration
///
/// A configured Kubo endpoint (local daemon, then Infura) fills every slot so
/// uploads land where pins and gateways can see them. Without one, data goes
/// through a [`LocalNode`] and Pinata, if configured, takes the pin slot.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultProviderFactory;

#[async_trait]
impl ProviderFactory for DefaultProviderFactory {
    async fn build(&self, config: &ContentStoreConfig) -> ProviderResult<ProviderSet> {
        let mut set = ProviderSet::default();

        if let Some(endpoint) = config.kubo_endpoint() {
            let kubo = Arc::new(KuboNode::new(endpoint, config)?);
            debug!(endpoint = %endpoint, "Configured Kubo node");
            set = set
                .with_bytes(kubo.clone())
                .with_structured(kubo.clone())
                .with_pins(kubo);
        }

        if let Some((key, secret)) = config.pinata_credentials() {
            let pinata = PinataPinStore::new(&config.pinata_api_url, key, secret, config.timeout_secs)?;
            set = set.with_pins(Arc::new(pinata));
        }

        if set.bytes.is_none() || set.structured.is_none() {
            let node = match &config.blockstore_dir {
                Some(dir) => Arc::new(LocalNode::open(dir).await?),
                None => Arc::new(LocalNode::memory()),
            };
            set = set
                .with_bytes(node.clone())
                .with_structured(node.clone())
                .with_lifecycle(node);
        }

        info!(providers = ?set, "Built content store providers");
        Ok(set)
    }
}
