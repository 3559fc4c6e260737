//! Content store command line
//!
//! ## Usage
//!
//! ```bash
//! # Upload a file and print its CID and gateway URL
//! content-store upload ./photo.png
//!
//! # Upload NFT metadata (or any JSON document)
//! content-store upload-json ./metadata.json
//!
//! # Read content back as JSON, text or raw bytes
//! content-store get bafkrei... --kind json
//! content-store get bafkrei... --out ./photo.png
//!
//! # Upload and pin through the local Kubo daemon
//! content-store --local-node upload ./photo.png
//! content-store --local-node pin bafkrei...
//!
//! # Serve POST /api/files (multipart field `file`)
//! content-store serve --port 8095
//! ```
//!
//! Without a Kubo endpoint, blocks are kept under the platform data directory
//! unless `--blockstore-dir` or the config file says otherwise, so uploads
//! survive between invocations.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use content_store_client::config::default_blockstore_dir;
use content_store_client::{
    Content, ContentKind, ContentStoreClient, ContentStoreConfig, FileServer, UploadOptions,
    UploadResult,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "content-store")]
#[command(about = "Upload, retrieve and pin content by CID")]
struct Args {
    /// Path to config file
    #[arg(short, long, env = "CONTENT_STORE_CONFIG")]
    config: Option<PathBuf>,

    /// Gateway base URL used for printed links
    #[arg(long, env = "CONTENT_STORE_GATEWAY_URL")]
    gateway_url: Option<String>,

    /// Use the Kubo daemon at localhost:5001 for data and pins
    #[arg(long)]
    local_node: bool,

    /// Block store directory
    #[arg(long, env = "CONTENT_STORE_BLOCKSTORE_DIR")]
    blockstore_dir: Option<PathBuf>,

    #[arg(long, env = "INFURA_PROJECT_ID")]
    infura_project_id: Option<String>,

    #[arg(long, env = "INFURA_PROJECT_SECRET", hide_env_values = true)]
    infura_project_secret: Option<String>,

    #[arg(long, env = "PINATA_API_KEY", hide_env_values = true)]
    pinata_api_key: Option<String>,

    #[arg(long, env = "PINATA_SECRET_KEY", hide_env_values = true)]
    pinata_secret_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a file as raw bytes
    Upload { file: PathBuf },

    /// Upload a JSON document
    UploadJson { file: PathBuf },

    /// Upload a string
    UploadString { text: String },

    /// Retrieve content
    Get {
        cid: String,

        /// json, string or bytes
        #[arg(long, default_value = "bytes")]
        kind: ContentKind,

        /// Write to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Print the gateway URL for a CID
    Url {
        cid: String,

        /// Gateway base to use instead of the configured one
        #[arg(long)]
        gateway: Option<String>,
    },

    /// Check whether a string is a valid CID
    Validate { cid: String },

    /// Pin content on the configured pinning provider
    Pin { cid: String },

    /// Unpin content on the configured pinning provider
    Unpin { cid: String },

    /// Run the file upload HTTP endpoint
    Serve {
        #[arg(long, env = "CONTENT_STORE_HTTP_PORT", default_value = "8095")]
        port: u16,
    },
}

fn build_config(args: &Args) -> anyhow::Result<ContentStoreConfig> {
    let mut config = match &args.config {
        Some(path) => ContentStoreConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ContentStoreConfig::default(),
    };

    if let Some(ref url) = args.gateway_url {
        config.gateway_url = url.clone();
    }
    if args.local_node {
        config.use_local_node = true;
    }
    if let Some(ref dir) = args.blockstore_dir {
        config.blockstore_dir = Some(dir.clone());
    }
    if config.blockstore_dir.is_none() {
        config.blockstore_dir = Some(default_blockstore_dir());
    }
    if args.infura_project_id.is_some() {
        config.infura_project_id = args.infura_project_id.clone();
        config.infura_project_secret = args.infura_project_secret.clone();
    }
    if args.pinata_api_key.is_some() {
        config.pinata_api_key = args.pinata_api_key.clone();
        config.pinata_secret_key = args.pinata_secret_key.clone();
    }

    Ok(config)
}

fn print_upload(client: &ContentStoreClient, result: &UploadResult) -> anyhow::Result<()> {
    let mut out = serde_json::to_value(result)?;
    out["url"] = serde_json::Value::String(client.gateway_url(&result.hash(), None));
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("content_store_client=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = build_config(&args)?;
    let client = Arc::new(ContentStoreClient::new(config));

    match args.command {
        Command::Upload { file } => {
            let data = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let options = UploadOptions::default().with_source_path(file.display().to_string());
            let result = client.upload_bytes(&data, options).await?;
            print_upload(&client, &result)?;
        }
        Command::UploadJson { file } => {
            let text = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let value: serde_json::Value = serde_json::from_str(&text)
                .with_context(|| format!("{} is not valid JSON", file.display()))?;
            let options = UploadOptions::default().with_source_path(file.display().to_string());
            let result = client.upload_json(&value, options).await?;
            print_upload(&client, &result)?;
        }
        Command::UploadString { text } => {
            let result = client.upload_string(&text, UploadOptions::default()).await?;
            print_upload(&client, &result)?;
        }
        Command::Get { cid, kind, out } => {
            let content = client.get_content(&cid, kind).await?;
            match (out, content) {
                (Some(path), content) => {
                    tokio::fs::write(&path, content.into_bytes()?).await?;
                    info!(path = %path.display(), "Wrote content");
                }
                (None, Content::Json(value)) => println!("{}", serde_json::to_string_pretty(&value)?),
                (None, Content::Text(text)) => println!("{}", text),
                (None, Content::Bytes(bytes)) => {
                    use std::io::Write;
                    std::io::stdout().write_all(&bytes)?;
                }
            }
        }
        Command::Url { cid, gateway } => {
            if !client.is_valid_identifier(&cid) {
                warn!(cid = %cid, "Not a valid CID");
            }
            println!("{}", client.gateway_url(&cid, gateway.as_deref()));
        }
        Command::Validate { cid } => {
            if !client.is_valid_identifier(&cid) {
                bail!("{} is not a valid CID", cid);
            }
            println!("valid");
        }
        Command::Pin { cid } => {
            client.pin_content(&cid).await?;
            println!("pinned {}", cid);
        }
        Command::Unpin { cid } => {
            client.unpin_content(&cid).await?;
            println!("unpinned {}", cid);
        }
        Command::Serve { port } => {
            let addr = SocketAddr::from(([0, 0, 0, 0], port));
            client.initialize().await?;
            let server = Arc::new(FileServer::new(client.clone(), addr));
            tokio::select! {
                result = server.run() => result?,
                _ = tokio::signal::ctrl_c() => info!("Shutting down"),
            }
        }
    }

    client.stop().await?;
    Ok(())
}
