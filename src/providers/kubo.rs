//! Kubo-compatible RPC node
//!
//! Works against a local daemon (`http://localhost:5001/api/v0`) or a remote
//! RPC gateway authenticated with a project id/secret pair. Covers every
//! capability: data goes through `add`/`cat` and `dag/put`/`dag/get`, pins
//! through `pin/add`/`pin/rm`.

use super::local::report_progress;
use super::{ByteStore, PinStore, StructuredStore};
use crate::config::ContentStoreConfig;
use crate::error::{ProviderError, ProviderResult};
use crate::identifier::{ContentId, RAW_CODEC};
use crate::types::ProgressFn;
use async_trait::async_trait;
use base64::Engine;
use reqwest::{header, multipart, Client, Response};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct AddResponse {
    #[serde(rename = "Hash")]
    hash: String,
}

#[derive(Debug, Deserialize)]
struct DagPutResponse {
    #[serde(rename = "Cid")]
    cid: CidLink,
}

#[derive(Debug, Deserialize)]
struct CidLink {
    #[serde(rename = "/")]
    link: String,
}

pub struct KuboNode {
    api_url: String,
    client: Client,
}

impl KuboNode {
    /// Create a node client for `api_url`
    ///
    /// Adds a Basic authorization header when the config carries an Infura
    /// project id.
    pub fn new(api_url: &str, config: &ContentStoreConfig) -> ProviderResult<Self> {
        let mut headers = header::HeaderMap::new();
        if !config.use_local_node {
            if let Some(ref project_id) = config.infura_project_id {
                let secret = config.infura_project_secret.as_deref().unwrap_or_default();
                let token = base64::engine::general_purpose::STANDARD
                    .encode(format!("{}:{}", project_id, secret));
                let value = header::HeaderValue::from_str(&format!("Basic {}", token))
                    .map_err(|e| ProviderError::Unavailable(format!("invalid credentials: {}", e)))?;
                headers.insert(header::AUTHORIZATION, value);
            }
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn endpoint(&self, command: &str, id: &ContentId) -> String {
        format!(
            "{}/{}?arg={}",
            self.api_url,
            command,
            urlencoding::encode(&id.to_string())
        )
    }

    async fn check(response: Response) -> ProviderResult<Response> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Server {
                status,
                message: body,
            });
        }
        Ok(response)
    }

    async fn call(&self, command: &str, id: &ContentId) -> ProviderResult<Response> {
        let url = self.endpoint(command, id);
        debug!(url = %url, "Kubo RPC call");

        let response = self.client.post(&url).send().await?;
        Self::check(response).await
    }

    /// POST `data` as the `file` part of a multipart form
    async fn upload(&self, path: &str, data: &[u8]) -> ProviderResult<Response> {
        let url = format!("{}/{}", self.api_url, path);
        debug!(url = %url, size = data.len(), "Kubo RPC upload");

        let form = multipart::Form::new()
            .part("file", multipart::Part::bytes(data.to_vec()).file_name("data"));
        let response = self.client.post(&url).multipart(form).send().await?;
        Self::check(response).await
    }

    fn parse_id(raw: &str) -> ProviderResult<ContentId> {
        ContentId::parse(raw).map_err(|e| ProviderError::Decode(format!("node returned {}: {}", raw, e)))
    }

    async fn add(&self, data: &[u8], progress: Option<&ProgressFn>) -> ProviderResult<ContentId> {
        let response: AddResponse = self.upload("add?cid-version=1", data).await?.json().await?;
        let id = Self::parse_id(&response.hash)?;
        report_progress(data.len(), progress);
        Ok(id)
    }

    async fn fetch(&self, id: &ContentId) -> ProviderResult<Vec<u8>> {
        let data = self.call("cat", id).await?.bytes().await?.to_vec();

        // Single-block raw CIDs hash the payload directly
        if id.codec() == RAW_CODEC && !id.matches(&data) {
            return Err(ProviderError::Decode(format!("block {} failed its hash check", id)));
        }
        Ok(data)
    }
}

#[async_trait]
impl ByteStore for KuboNode {
    async fn add_bytes(&self, data: &[u8], progress: Option<&ProgressFn>) -> ProviderResult<ContentId> {
        self.add(data, progress).await
    }

    async fn cat(&self, id: &ContentId) -> ProviderResult<Vec<u8>> {
        self.fetch(id).await
    }
}

#[async_trait]
impl StructuredStore for KuboNode {
    async fn add_json(
        &self,
        value: &serde_json::Value,
        progress: Option<&ProgressFn>,
    ) -> ProviderResult<ContentId> {
        let encoded = serde_json::to_vec(value)?;
        let response: DagPutResponse = self
            .upload("dag/put?store-codec=json&input-codec=json", &encoded)
            .await?
            .json()
            .await?;
        let id = Self::parse_id(&response.cid.link)?;
        report_progress(encoded.len(), progress);
        Ok(id)
    }

    async fn get_json(&self, id: &ContentId) -> ProviderResult<serde_json::Value> {
        let url = format!("{}&output-codec=json", self.endpoint("dag/get", id));
        debug!(url = %url, "Kubo RPC call");

        let response = Self::check(self.client.post(&url).send().await?).await?;
        Ok(response.json().await?)
    }

    async fn add_string(&self, text: &str, progress: Option<&ProgressFn>) -> ProviderResult<ContentId> {
        self.add(text.as_bytes(), progress).await
    }

    async fn get_string(&self, id: &ContentId) -> ProviderResult<String> {
        let data = self.fetch(id).await?;
        String::from_utf8(data).map_err(|e| ProviderError::Decode(format!("{} is not UTF-8: {}", id, e)))
    }
}

#[async_trait]
impl PinStore for KuboNode {
    fn name(&self) -> &'static str {
        "kubo"
    }

    async fn pin(&self, id: &ContentId) -> ProviderResult<()> {
        self.call("pin/add", id).await?;
        Ok(())
    }

    async fn unpin(&self, id: &ContentId) -> ProviderResult<()> {
        self.call("pin/rm", id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingServer;
    use crate::types::UploadProgress;
    use std::sync::{Arc, Mutex};

    fn local(server: &RecordingServer) -> KuboNode {
        KuboNode::new(&server.url("/api/v0"), &ContentStoreConfig::default()).unwrap()
    }

    #[test]
    fn test_endpoint_format() {
        let node = KuboNode::new("http://localhost:5001/api/v0/", &ContentStoreConfig::default()).unwrap();
        let id = ContentId::raw(b"pin me");
        assert_eq!(
            node.endpoint("pin/add", &id),
            format!("http://localhost:5001/api/v0/pin/add?arg={}", id)
        );
    }

    #[tokio::test]
    async fn test_add_bytes_posts_multipart_file() {
        let id = ContentId::raw(b"hello kubo");
        let server = RecordingServer::start(
            200,
            format!(r#"{{"Name":"data","Hash":"{}","Size":"10"}}"#, id),
        )
        .await;
        let node = local(&server);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let progress: ProgressFn = Arc::new(move |p: UploadProgress| sink.lock().unwrap().push(p));

        assert_eq!(node.add_bytes(b"hello kubo", Some(&progress)).await.unwrap(), id);

        let requests = server.requests().await;
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].uri, "/api/v0/add?cid-version=1");
        assert!(requests[0].headers["content-type"].starts_with("multipart/form-data"));
        assert!(requests[0].body.contains("name=\"file\""));
        assert!(requests[0].body.contains("hello kubo"));
        assert_eq!(seen.lock().unwrap().last().unwrap().bytes, 10);
    }

    #[tokio::test]
    async fn test_add_json_uses_dag_put() {
        let value = serde_json::json!({"a": 1});
        let id = ContentId::json(br#"{"a":1}"#);
        let server = RecordingServer::start(200, format!(r#"{{"Cid":{{"/":"{}"}}}}"#, id)).await;
        let node = local(&server);

        assert_eq!(node.add_json(&value, None).await.unwrap(), id);

        let requests = server.requests().await;
        assert_eq!(requests[0].uri, "/api/v0/dag/put?store-codec=json&input-codec=json");
        assert!(requests[0].body.contains(r#"{"a":1}"#));
    }

    #[tokio::test]
    async fn test_cat_returns_verified_bytes() {
        let server = RecordingServer::start(200, "served bytes").await;
        let node = local(&server);
        let id = ContentId::raw(b"served bytes");

        assert_eq!(node.cat(&id).await.unwrap(), b"served bytes");
        assert_eq!(node.get_string(&id).await.unwrap(), "served bytes");

        let requests = server.requests().await;
        assert_eq!(requests[0].uri, format!("/api/v0/cat?arg={}", id));

        // A node serving different bytes for a raw CID is caught
        let wrong = ContentId::raw(b"something else");
        assert!(matches!(node.cat(&wrong).await, Err(ProviderError::Decode(_))));
    }

    #[tokio::test]
    async fn test_get_json_uses_dag_get() {
        let server = RecordingServer::start(200, r#"{"name":"doc"}"#).await;
        let node = local(&server);
        let id = ContentId::json(br#"{"name":"doc"}"#);

        let value = node.get_json(&id).await.unwrap();
        assert_eq!(value["name"], "doc");

        let requests = server.requests().await;
        assert_eq!(requests[0].uri, format!("/api/v0/dag/get?arg={}&output-codec=json", id));
    }

    #[tokio::test]
    async fn test_malformed_add_response() {
        let server = RecordingServer::start(200, r#"{"Hash":"not-a-cid"}"#).await;
        let node = local(&server);
        assert!(matches!(node.add_bytes(b"x", None).await, Err(ProviderError::Decode(_))));
    }

    #[tokio::test]
    async fn test_pin_and_unpin_requests() {
        let server = RecordingServer::start(200, "{}").await;
        let node = local(&server);
        let id = ContentId::raw(b"pin me");

        node.pin(&id).await.unwrap();
        node.unpin(&id).await.unwrap();

        let requests = server.requests().await;
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].uri, format!("/api/v0/pin/add?arg={}", id));
        assert_eq!(requests[1].uri, format!("/api/v0/pin/rm?arg={}", id));
        assert!(requests[0].authorization.is_none());
    }

    #[tokio::test]
    async fn test_infura_basic_auth() {
        let server = RecordingServer::start(200, "{}").await;
        let config = ContentStoreConfig {
            infura_project_id: Some("project".into()),
            infura_project_secret: Some("secret".into()),
            ..Default::default()
        };
        let node = KuboNode::new(&server.url("/api/v0"), &config).unwrap();
        node.pin(&ContentId::raw(b"auth")).await.unwrap();

        let requests = server.requests().await;
        let expected = format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode("project:secret")
        );
        assert_eq!(requests[0].authorization.as_deref(), Some(expected.as_str()));
    }

    #[tokio::test]
    async fn test_server_error_is_reported() {
        let server = RecordingServer::start(500, "pin failed").await;
        let node = local(&server);

        match node.pin(&ContentId::raw(b"x")).await {
            Err(ProviderError::Server { status, message }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "pin failed");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
