//! In-process content-addressed block store
//!
//! Derives CIDv1 identifiers locally (sha2-256, `raw` codec for bytes and
//! strings, `json` codec for JSON) and keeps one block per payload, either in
//! memory or under a directory:
//!
//! ```text
//! <root>/blocks/<first 4 chars after the multibase prefix>/<cid>
//! ```

use super::{ByteStore, Shutdown, StructuredStore};
use crate::error::{ProviderError, ProviderResult};
use crate::identifier::{ContentId, JSON_CODEC, RAW_CODEC};
use crate::types::{ProgressFn, UploadProgress};
use async_trait::async_trait;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::fs;
use tracing::{debug, info};

/// Granularity of progress reports (256 KiB)
pub const PROGRESS_CHUNK_SIZE: usize = 256 * 1024;

/// Distinguishes temp files of concurrent writers of the same block
static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

enum Backend {
    Memory(DashMap<ContentId, Vec<u8>>),
    Fs { root_dir: PathBuf },
}

/// Local block store node
pub struct LocalNode {
    backend: Backend,
    stopped: AtomicBool,
}

impl LocalNode {
    /// Block store that lives as long as the node
    pub fn memory() -> Self {
        Self {
            backend: Backend::Memory(DashMap::new()),
            stopped: AtomicBool::new(false),
        }
    }

    /// Block store persisted under `root_dir`
    pub async fn open<P: AsRef<Path>>(root_dir: P) -> ProviderResult<Self> {
        let root_dir = root_dir.as_ref().to_path_buf();
        fs::create_dir_all(root_dir.join("blocks")).await?;

        info!(path = %root_dir.display(), "Opened block store");

        Ok(Self {
            backend: Backend::Fs { root_dir },
            stopped: AtomicBool::new(false),
        })
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    fn block_path(root_dir: &Path, id: &ContentId) -> PathBuf {
        let name = id.to_string();
        // Skip the multibase prefix so shards spread over the digest
        let body = name.get(1..).unwrap_or(&name);
        let subdir = &body[..4.min(body.len())];
        root_dir.join("blocks").join(subdir).join(&name)
    }

    fn ensure_running(&self) -> ProviderResult<()> {
        if self.is_stopped() {
            return Err(ProviderError::Unavailable("local node has been stopped".into()));
        }
        Ok(())
    }

    async fn put(&self, codec: u64, data: &[u8], progress: Option<&ProgressFn>) -> ProviderResult<ContentId> {
        self.ensure_running()?;

        let id = ContentId::for_data(codec, data);

        match &self.backend {
            Backend::Memory(blocks) => {
                if blocks.contains_key(&id) {
                    debug!(cid = %id, "Block already exists");
                } else {
                    blocks.insert(id, data.to_vec());
                }
            }
            Backend::Fs { root_dir } => {
                let path = Self::block_path(root_dir, &id);
                if fs::metadata(&path).await.is_ok() {
                    debug!(cid = %id, "Block already exists");
                } else {
                    Self::write_block(&path, data).await?;
                }
            }
        }

        report_progress(data.len(), progress);
        debug!(cid = %id, size = data.len(), "Stored block");
        Ok(id)
    }

    /// Write then rename so readers never see a partial block
    ///
    /// Every writer gets its own temp file. Losing the rename race to another
    /// writer of the same block is fine since the contents are identical.
    async fn write_block(path: &Path, data: &[u8]) -> ProviderResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let seq = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let tmp = path.with_extension(format!("{}.{}.tmp", std::process::id(), seq));
        if let Err(e) = fs::write(&tmp, data).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        if let Err(e) = fs::rename(&tmp, path).await {
            let _ = fs::remove_file(&tmp).await;
            if fs::metadata(path).await.is_ok() {
                debug!(path = %path.display(), "Block written concurrently");
                return Ok(());
            }
            return Err(e.into());
        }

        Ok(())
    }

    async fn get(&self, id: &ContentId) -> ProviderResult<Vec<u8>> {
        self.ensure_running()?;

        let data = match &self.backend {
            Backend::Memory(blocks) => blocks
                .get(id)
                .map(|entry| entry.value().clone())
                .ok_or_else(|| ProviderError::NotFound(id.to_string()))?,
            Backend::Fs { root_dir } => {
                let path = Self::block_path(root_dir, id);
                match fs::read(&path).await {
                    Ok(data) => data,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                        return Err(ProviderError::NotFound(id.to_string()));
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        };

        if !id.matches(&data) {
            return Err(ProviderError::Decode(format!("block {} failed its hash check", id)));
        }

        Ok(data)
    }

    async fn get_with_codec(&self, id: &ContentId, codec: u64) -> ProviderResult<Vec<u8>> {
        if id.codec() != codec {
            return Err(ProviderError::Decode(format!(
                "{} has codec 0x{:x}, expected 0x{:x}",
                id,
                id.codec(),
                codec
            )));
        }
        self.get(id).await
    }
}

/// Report progress in fixed-size steps, ending at `total`
pub(crate) fn report_progress(total: usize, progress: Option<&ProgressFn>) {
    let Some(progress) = progress else {
        return;
    };
    let total_u64 = total as u64;
    if total == 0 {
        progress(UploadProgress { bytes: 0, total: 0 });
        return;
    }
    let mut done = 0usize;
    while done < total {
        done = (done + PROGRESS_CHUNK_SIZE).min(total);
        progress(UploadProgress {
            bytes: done as u64,
            total: total_u64,
        });
    }
}

#[async_trait]
impl ByteStore for LocalNode {
    async fn add_bytes(&self, data: &[u8], progress: Option<&ProgressFn>) -> ProviderResult<ContentId> {
        self.put(RAW_CODEC, data, progress).await
    }

    async fn cat(&self, id: &ContentId) -> ProviderResult<Vec<u8>> {
        self.get(id).await
    }
}

#[async_trait]
impl StructuredStore for LocalNode {
    async fn add_json(
        &self,
        value: &serde_json::Value,
        progress: Option<&ProgressFn>,
    ) -> ProviderResult<ContentId> {
        let encoded = serde_json::to_vec(value)?;
        self.put(JSON_CODEC, &encoded, progress).await
    }

    async fn get_json(&self, id: &ContentId) -> ProviderResult<serde_json::Value> {
        let data = self.get_with_codec(id, JSON_CODEC).await?;
        Ok(serde_json::from_slice(&data)?)
    }

    async fn add_string(&self, text: &str, progress: Option<&ProgressFn>) -> ProviderResult<ContentId> {
        self.put(RAW_CODEC, text.as_bytes(), progress).await
    }

    async fn get_string(&self, id: &ContentId) -> ProviderResult<String> {
        let data = self.get_with_codec(id, RAW_CODEC).await?;
        String::from_utf8(data).map_err(|e| ProviderError::Decode(format!("{} is not UTF-8: {}", id, e)))
    }
}

#[async_trait]
impl Shutdown for LocalNode {
    async fn shutdown(&self) -> ProviderResult<()> {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            info!("Local node stopped");
        }
        Ok(())
    }
}
