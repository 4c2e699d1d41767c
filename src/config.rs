use serde::Deserialize;

use crate::error::{VoiceError, VoiceResult};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api: ApiConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the platform API, without a trailing slash
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api/v1".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Where bearer credentials persist. When unset, the platform config
    /// directory is used.
    pub credentials_path: Option<String>,
}

impl ClientConfig {
    pub fn load(path: &str) -> VoiceResult<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()
            .map_err(|e| VoiceError::Config(e.to_string()))?;

        settings
            .try_deserialize()
            .map_err(|e| VoiceError::Config(e.to_string()))
    }
}
