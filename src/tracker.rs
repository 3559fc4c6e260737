//! Observable state for UI layers
//!
//! Each tracker wraps a shared client and mirrors one call's lifecycle into a
//! snapshot a UI can poll: `{uploading, progress, error, result}` for uploads,
//! `{loading, data, error}` for retrieval and pinning. Errors are kept as
//! display strings and still returned to the caller.

use crate::client::ContentStoreClient;
use crate::error::{ContentStoreError, Result};
use crate::identifier;
use crate::types::{Content, ContentKind, NftMetadata, UploadOptions, UploadProgress, UploadResult};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadState {
    pub uploading: bool,
    /// Percentage of the current upload
    pub progress: f64,
    pub error: Option<String>,
    pub result: Option<UploadResult>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrieveState {
    pub loading: bool,
    pub data: Option<Content>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinState {
    pub loading: bool,
    pub error: Option<String>,
}

fn lock<T>(state: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panicking progress callback must not wedge the tracker
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn invalid(id: &str) -> ContentStoreError {
    ContentStoreError::InvalidIdentifier {
        id: id.to_string(),
        reason: "Invalid content identifier".to_string(),
    }
}

/// Upload tracker
pub struct UploadTracker {
    client: Arc<ContentStoreClient>,
    state: Arc<Mutex<UploadState>>,
}

impl UploadTracker {
    pub fn new(client: Arc<ContentStoreClient>) -> Self {
        Self {
            client,
            state: Arc::new(Mutex::new(UploadState::default())),
        }
    }

    pub fn state(&self) -> UploadState {
        lock(&self.state).clone()
    }

    /// Clear state so the user can try again
    pub fn reset(&self) {
        *lock(&self.state) = UploadState::default();
    }

    fn begin(&self, options: UploadOptions) -> UploadOptions {
        {
            let mut state = lock(&self.state);
            state.uploading = true;
            state.progress = 0.0;
            state.error = None;
        }

        let sink = self.state.clone();
        let forward = options.progress.clone();
        UploadOptions {
            progress: Some(Arc::new(move |p: UploadProgress| {
                lock(&sink).progress = p.percent();
                if let Some(ref forward) = forward {
                    forward(p);
                }
            })),
            source_path: options.source_path,
        }
    }

    fn finish(&self, outcome: Result<UploadResult>) -> Result<UploadResult> {
        let mut state = lock(&self.state);
        state.uploading = false;
        match outcome {
            Ok(result) => {
                state.result = Some(result.clone());
                Ok(result)
            }
            Err(e) => {
                state.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    pub async fn upload_bytes(&self, data: &[u8], options: UploadOptions) -> Result<UploadResult> {
        let options = self.begin(options);
        let outcome = self.client.upload_bytes(data, options).await;
        self.finish(outcome)
    }

    pub async fn upload_json<T: Serialize + ?Sized>(
        &self,
        data: &T,
        options: UploadOptions,
    ) -> Result<UploadResult> {
        let options = self.begin(options);
        let outcome = self.client.upload_json(data, options).await;
        self.finish(outcome)
    }

    pub async fn upload_string(&self, text: &str, options: UploadOptions) -> Result<UploadResult> {
        let options = self.begin(options);
        let outcome = self.client.upload_string(text, options).await;
        self.finish(outcome)
    }

    pub async fn upload_nft_metadata(
        &self,
        metadata: &NftMetadata,
        options: UploadOptions,
    ) -> Result<UploadResult> {
        self.upload_json(metadata, options).await
    }
}

/// Retrieval tracker
pub struct RetrieveTracker {
    client: Arc<ContentStoreClient>,
    state: Mutex<RetrieveState>,
}

impl RetrieveTracker {
    pub fn new(client: Arc<ContentStoreClient>) -> Self {
        Self {
            client,
            state: Mutex::new(RetrieveState::default()),
        }
    }

    pub fn state(&self) -> RetrieveState {
        lock(&self.state).clone()
    }

    /// Fetch `id` as `kind`; invalid ids are rejected without touching state
    pub async fn fetch(&self, id: &str, kind: ContentKind) -> Result<Content> {
        if !identifier::is_valid_identifier(id) {
            return Err(invalid(id));
        }

        {
            let mut state = lock(&self.state);
            state.loading = true;
            state.error = None;
        }

        let outcome = self.client.get_content(id, kind).await;

        let mut state = lock(&self.state);
        state.loading = false;
        match outcome {
            Ok(content) => {
                state.data = Some(content.clone());
                Ok(content)
            }
            Err(e) => {
                state.error = Some(e.to_string());
                Err(e)
            }
        }
    }
}

/// Pin tracker
pub struct PinTracker {
    client: Arc<ContentStoreClient>,
    state: Mutex<PinState>,
}

impl PinTracker {
    pub fn new(client: Arc<ContentStoreClient>) -> Self {
        Self {
            client,
            state: Mutex::new(PinState::default()),
        }
    }

    pub fn state(&self) -> PinState {
        lock(&self.state).clone()
    }

    pub async fn pin(&self, id: &str) -> Result<()> {
        self.run(id, true).await
    }

    pub async fn unpin(&self, id: &str) -> Result<()> {
        self.run(id, false).await
    }

    async fn run(&self, id: &str, pin: bool) -> Result<()> {
        if !identifier::is_valid_identifier(id) {
            return Err(invalid(id));
        }

        {
            let mut state = lock(&self.state);
            state.loading = true;
            state.error = None;
        }

        let outcome = if pin {
            self.client.pin_content(id).await
        } else {
            self.client.unpin_content(id).await
        };

        let mut state = lock(&self.state);
        state.loading = false;
        if let Err(ref e) = outcome {
            state.error = Some(e.to_string());
        }
        outcome
    }
}
