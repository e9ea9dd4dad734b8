//! `reqwest` transport with one refresh-and-retry on 401.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;

use super::{ByteStream, Transport};
use crate::auth::Credential;
use crate::config::WeaveConfig;
use crate::error::{Result, WeaveError};

/// HTTP transport owning the credential it authenticates with.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    credential: Arc<Credential>,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, credential: Arc<Credential>) -> Result<Self> {
        Self::with_timeouts(base_url, credential, Duration::from_secs(10), Duration::from_secs(120))
    }

    pub fn with_timeouts(
        base_url: impl Into<String>,
        credential: Arc<Credential>,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .read_timeout(read_timeout)
            .pool_max_idle_per_host(10)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credential,
        })
    }

    /// Build a transport from configuration.
    pub fn from_config(config: &WeaveConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| WeaveError::Configuration("Missing WEAVE_API_KEY".into()))?;
        Self::with_timeouts(
            config.base_url.clone(),
            Arc::new(Credential::new(api_key)),
            config.connect_timeout,
            config.read_timeout,
        )
    }

    pub fn credential(&self) -> &Arc<Credential> {
        &self.credential
    }

    async fn post(
        &self,
        url: &str,
        body: &serde_json::Value,
        token: &str,
    ) -> Result<reqwest::Response> {
        Ok(self
            .client
            .post(url)
            .headers(bearer_headers(token))
            .json(body)
            .send()
            .await?)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, path: &str, body: &serde_json::Value) -> Result<ByteStream> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(url = %url, "sending request");

        let snapshot = self.credential.snapshot().await;
        let mut resp = self.post(&url, body, &snapshot.token).await?;

        if resp.status() == StatusCode::UNAUTHORIZED && self.credential.can_refresh() {
            let refreshed = self.credential.refresh(&snapshot).await?;
            resp = self.post(&url, body, &refreshed.token).await?;
        }

        let status = resp.status();
        if !status.is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(WeaveError::from_status(status.as_u16(), &body_text));
        }

        Ok(Box::pin(
            resp.bytes_stream().map(|chunk| chunk.map_err(WeaveError::from)),
        ))
    }
}

/// Default headers for a bearer-token streaming API.
pub fn bearer_headers(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
    if let Ok(val) = HeaderValue::from_str(&format!("Bearer {token}")) {
        headers.insert(AUTHORIZATION, val);
    }
    headers
}
