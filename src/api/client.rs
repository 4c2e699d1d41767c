use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::config::ApiConfig;
use crate::error::{VoiceError, VoiceResult};

use super::token::TokenStore;

/// Response wrapper every platform endpoint uses
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: serde::de::Deserialize<'de>"))]
pub struct ApiEnvelope<T> {
    pub status: String,
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

/// HTTP client for the platform API.
///
/// Owns the base URL, the request timeout, and the bearer token lookup.
/// Endpoint modules build requests through [`ApiClient::get`] /
/// [`ApiClient::post`] so every call carries the same auth handling.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<TokenStore>,
}

impl ApiClient {
    pub fn new(config: &ApiConfig, tokens: Arc<TokenStore>) -> VoiceResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            tokens,
        })
    }

    /// Absolute URL for an API path.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.request(reqwest::Method::GET, path)
    }

    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.request(reqwest::Method::POST, path)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self.http.request(method, self.url(path));
        if let Some(token) = self.tokens.token() {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    /// Whether the API answers at all. Any HTTP response counts, including
    /// auth failures; only transport errors mean unreachable.
    pub async fn check_reachable(&self) -> bool {
        match self.get("/journey/usage").send().await {
            Ok(_) => true,
            Err(e) => {
                debug!("Connectivity probe failed: {}", e);
                false
            }
        }
    }
}

/// Unwrap a standard `{status, data, message}` response into its payload.
pub async fn read_envelope<T: DeserializeOwned>(response: reqwest::Response) -> VoiceResult<T> {
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(VoiceError::Api {
            status: status.as_u16(),
            message,
        });
    }

    let envelope: ApiEnvelope<T> = response.json().await?;
    if envelope.status != "success" {
        return Err(VoiceError::Api {
            status: status.as_u16(),
            message: envelope
                .message
                .unwrap_or_else(|| "request failed".to_string()),
        });
    }

    envelope.data.ok_or_else(|| VoiceError::Api {
        status: status.as_u16(),
        message: "response missing data".to_string(),
    })
}
