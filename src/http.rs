//! HTTP endpoint for file uploads
//!
//! - `GET /health` - Health check
//! - `POST /api/files` - Upload the `file` part of a multipart form, respond
//!   with its gateway URL
//!
//! ```bash
//! curl -F file=@photo.png http://localhost:8095/api/files
//! # "https://ipfs.io/ipfs/bafkrei..."
//! ```
//!
//! Any failure, including a body over [`MAX_FILE_SIZE`], is answered with a
//! generic 500 and no internal detail.

use crate::client::ContentStoreClient;
use crate::types::UploadOptions;
use bytes::Bytes;
use futures_util::TryStreamExt;
use http_body_util::{BodyExt, BodyStream, Full, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{header, Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

/// Largest accepted upload (10 MiB)
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

#[derive(Debug, Error)]
enum RequestError {
    #[error("File too large")]
    TooLarge,

    #[error("Invalid multipart body: {0}")]
    Multipart(#[from] multer::Error),

    #[error("Missing file field")]
    MissingFile,

    #[error(transparent)]
    Store(#[from] crate::error::ContentStoreError),
}

/// File upload server
pub struct FileServer {
    client: Arc<ContentStoreClient>,
    bind_addr: SocketAddr,
    max_file_size: usize,
}

impl FileServer {
    pub fn new(client: Arc<ContentStoreClient>, bind_addr: SocketAddr) -> Self {
        Self {
            client,
            bind_addr,
            max_file_size: MAX_FILE_SIZE,
        }
    }

    pub fn with_max_file_size(mut self, max_file_size: usize) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    /// Bind and serve until the task is dropped
    pub async fn run(self: Arc<Self>) -> std::io::Result<()> {
        let listener = TcpListener::bind(self.bind_addr).await?;
        self.serve(listener).await
    }

    /// Serve connections from an already-bound listener
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> std::io::Result<()> {
        info!(addr = %listener.local_addr()?, "File upload server listening");

        loop {
            let (stream, remote_addr) = listener.accept().await?;
            let io = TokioIo::new(stream);
            let server = self.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req| {
                    let server = server.clone();
                    async move { server.handle_request(req).await }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    warn!(addr = %remote_addr, error = %err, "Connection error");
                }
            });
        }
    }

    async fn handle_request(
        &self,
        req: Request<Incoming>,
    ) -> Result<Response<Full<Bytes>>, hyper::Error> {
        let path = req.uri().path().to_string();
        let method = req.method().clone();

        debug!(method = %method, path = %path, "Incoming request");

        let result = match (method, path.as_str()) {
            (Method::GET, "/health") => Ok(self.handle_health().await),
            (Method::POST, "/api/files") => self.handle_upload(req).await,
            _ => Ok(json_response(StatusCode::NOT_FOUND, r#"{"error":"Not Found"}"#.to_string())),
        };

        Ok(result.unwrap_or_else(|e| {
            error!(error = %e, "Request error");
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                r#"{"error":"Internal Server Error"}"#.to_string(),
            )
        }))
    }

    async fn handle_health(&self) -> Response<Full<Bytes>> {
        let body = serde_json::json!({
            "status": "ok",
            "initialized": self.client.is_initialized().await,
        });
        json_response(StatusCode::OK, body.to_string())
    }

    /// POST /api/files
    async fn handle_upload(&self, req: Request<Incoming>) -> Result<Response<Full<Bytes>>, RequestError> {
        let declared = req
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok());
        if declared.is_some_and(|len| len > self.max_file_size) {
            return Err(RequestError::TooLarge);
        }

        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        let boundary = multer::parse_boundary(content_type)?;

        // The limit also covers bodies sent without Content-Length
        let stream = BodyStream::new(Limited::new(req.into_body(), self.max_file_size))
            .try_filter_map(|frame| async move { Ok(frame.into_data().ok()) });
        let mut multipart = multer::Multipart::new(stream, boundary);

        while let Some(field) = multipart.next_field().await? {
            if field.name() != Some("file") {
                continue;
            }

            let mut options = UploadOptions::default();
            if let Some(name) = field.file_name() {
                options = options.with_source_path(name.to_string());
            }
            let data = field.bytes().await?;

            let result = self.client.upload_bytes(&data, options).await?;
            let url = self.client.gateway_url(&result.hash(), None);

            info!(cid = %result.identifier, size = result.size_bytes, "Uploaded file");

            let body = serde_json::Value::String(url).to_string();
            return Ok(json_response(StatusCode::OK, body));
        }

        Err(RequestError::MissingFile)
    }
}

fn json_response(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );
    response
}
