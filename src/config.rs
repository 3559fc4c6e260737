//! Configuration for the content store client

use crate::error::{ContentStoreError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Public gateway used when none is configured
pub const DEFAULT_GATEWAY_URL: &str = "https://ipfs.io/ipfs/";

/// Remote RPC endpoint used with Infura credentials
pub const DEFAULT_API_URL: &str = "https://ipfs.infura.io:5001/api/v0";

/// RPC endpoint of a Kubo daemon on this machine
pub const LOCAL_NODE_API_URL: &str = "http://localhost:5001/api/v0";

pub const DEFAULT_PINATA_API_URL: &str = "https://api.pinata.cloud";

/// Default block store directory for the CLI
pub fn default_blockstore_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("content-store")
        .join("blocks")
}

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentStoreConfig {
    /// Gateway base URL, concatenated with the CID
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,

    /// Remote Kubo-compatible RPC endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Use the Kubo daemon at localhost:5001 for pinning
    #[serde(default)]
    pub use_local_node: bool,

    #[serde(default)]
    pub infura_project_id: Option<String>,

    #[serde(default)]
    pub infura_project_secret: Option<String>,

    #[serde(default)]
    pub pinata_api_key: Option<String>,

    #[serde(default)]
    pub pinata_secret_key: Option<String>,

    #[serde(default = "default_pinata_api_url")]
    pub pinata_api_url: String,

    /// Persist blocks under this directory instead of in memory
    #[serde(default)]
    pub blockstore_dir: Option<PathBuf>,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_gateway_url() -> String {
    DEFAULT_GATEWAY_URL.to_string()
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_pinata_api_url() -> String {
    DEFAULT_PINATA_API_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ContentStoreConfig {
    fn default() -> Self {
        Self {
            gateway_url: default_gateway_url(),
            api_url: default_api_url(),
            use_local_node: false,
            infura_project_id: None,
            infura_project_secret: None,
            pinata_api_key: None,
            pinata_secret_key: None,
            pinata_api_url: default_pinata_api_url(),
            blockstore_dir: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ContentStoreConfig {
    /// Load config from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| ContentStoreError::Config(e.to_string()))
    }

    /// Save config to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ContentStoreError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// RPC endpoint for the Kubo pin provider, if one is configured
    ///
    /// A local node wins over remote credentials.
    pub fn kubo_endpoint(&self) -> Option<&str> {
        if self.use_local_node {
            Some(LOCAL_NODE_API_URL)
        } else if self.infura_project_id.is_some() {
            Some(&self.api_url)
        } else {
            None
        }
    }

    /// Pinata key pair, when both halves are present
    pub fn pinata_credentials(&self) -> Option<(&str, &str)> {
        match (&self.pinata_api_key, &self.pinata_secret_key) {
            (Some(key), Some(secret)) => Some((key, secret)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ContentStoreConfig::default();
        assert_eq!(config.gateway_url, "https://ipfs.io/ipfs/");
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert!(!config.use_local_node);
        assert!(config.kubo_endpoint().is_none());
        assert!(config.pinata_credentials().is_none());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: ContentStoreConfig = toml::from_str(r#"gateway_url = "https://gw.example/ipfs/""#).unwrap();
        assert_eq!(config.gateway_url, "https://gw.example/ipfs/");
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.pinata_api_url, DEFAULT_PINATA_API_URL);
    }

    #[test]
    fn test_kubo_endpoint_selection() {
        let mut config = ContentStoreConfig {
            infura_project_id: Some("project".into()),
            ..Default::default()
        };
        assert_eq!(config.kubo_endpoint(), Some(DEFAULT_API_URL));

        config.use_local_node = true;
        assert_eq!(config.kubo_endpoint(), Some(LOCAL_NODE_API_URL));
    }

    #[test]
    fn test_pinata_requires_both_keys() {
        let config = ContentStoreConfig {
            pinata_api_key: Some("key".into()),
            ..Default::default()
        };
        assert!(config.pinata_credentials().is_none());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let config = ContentStoreConfig {
            use_local_node: true,
            blockstore_dir: Some(dir.path().join("blocks")),
            ..Default::default()
        };
        config.save(&path).unwrap();

        let loaded = ContentStoreConfig::load(&path).unwrap();
        assert!(loaded.use_local_node);
        assert_eq!(loaded.blockstore_dir, config.blockstore_dir);
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "timeout_secs = \"soon\"").unwrap();
        assert!(matches!(
            ContentStoreConfig::load(&path),
            Err(ContentStoreError::Config(_))
        ));
    }
}
