//! OpenAI-compatible chat-completions client.
//!
//! Speaks `POST {base_url}/chat/completions` with bearer auth. Works with
//! any endpoint exposing that shape (OpenAI, OpenRouter, local proxies).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::DEFAULT_BASE_URL;
use super::traits::ChatTransport;
use crate::types::{CompletionRequest, CompletionResponse};
use crate::{MuninnError, Result};

/// Connection-level timeout. Per-attempt time boxes are applied by the
/// orchestrator; this only guards against sockets that never resolve.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for an OpenAI-compatible chat-completions endpoint.
#[derive(Clone)]
pub struct HttpTransport {
    api_key: String,
    http: Client,
    base_url: String,
}

impl HttpTransport {
    /// Create a transport for the default endpoint.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Create a transport with a custom base URL (for proxies, or testing
    /// with wiremock).
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| MuninnError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_key: api_key.into(),
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(request)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(MuninnError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await.map_err(map_send_error)?;
        serde_json::from_str(&body)
            .map_err(|e| MuninnError::InvalidResponse(format!("undecodable completion body: {e}")))
    }
}

fn map_send_error(err: reqwest::Error) -> MuninnError {
    // the request never left: bad URL or header, not worth retrying
    if err.is_builder() {
        MuninnError::Configuration(format!("invalid upstream request: {err}"))
    } else if err.is_timeout() {
        MuninnError::Http(format!("timeout: {err}"))
    } else {
        MuninnError::Http(err.to_string())
    }
}
