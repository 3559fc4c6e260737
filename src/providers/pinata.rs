//! Pin provider for the Pinata pinning service

use super::PinStore;
use crate::error::{ProviderError, ProviderResult};
use crate::identifier::ContentId;
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PinByHashRequest {
    hash_to_pin: String,
}

pub struct PinataPinStore {
    api_url: String,
    client: Client,
}

impl PinataPinStore {
    pub fn new(api_url: &str, api_key: &str, secret_key: &str, timeout_secs: u64) -> ProviderResult<Self> {
        let mut headers = header::HeaderMap::new();
        for (name, value) in [("pinata_api_key", api_key), ("pinata_secret_api_key", secret_key)] {
            let value = header::HeaderValue::from_str(value)
                .map_err(|e| ProviderError::Unavailable(format!("invalid {}: {}", name, e)))?;
            headers.insert(name, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn check(response: reqwest::Response) -> ProviderResult<()> {
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound(response.url().path().to_string()));
        }
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Server {
                status,
                message: body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PinStore for PinataPinStore {
    fn name(&self) -> &'static str {
        "pinata"
    }

    async fn pin(&self, id: &ContentId) -> ProviderResult<()> {
        let url = format!("{}/pinning/pinByHash", self.api_url);
        debug!(url = %url, cid = %id, "Pinata pin");

        let response = self
            .client
            .post(&url)
            .json(&PinByHashRequest {
                hash_to_pin: id.to_string(),
            })
            .send()
            .await?;

        Self::check(response).await
    }

    async fn unpin(&self, id: &ContentId) -> ProviderResult<()> {
        let url = format!(
            "{}/pinning/unpin/{}",
            self.api_url,
            urlencoding::encode(&id.to_string())
        );
        debug!(url = %url, cid = %id, "Pinata unpin");

        let response = self.client.delete(&url).send().await?;
        Self::check(response).await
    }
}
