use std::time::Duration;

use thiserror::Error;

/// Production endpoint of the Carapace API.
pub const DEFAULT_API_URL: &str = "https://carapaceai.com/api/v1";
/// Environment variable the bootstrap reads the key from.
pub const API_KEY_ENV: &str = "CARAPACE_API_KEY";
pub const API_URL_ENV: &str = "CARAPACE_API_URL";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("CARAPACE_API_KEY is required. Get one at https://carapaceai.com")]
    MissingApiKey,

    #[error("Invalid API base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Settings fixed at startup and shared read-only by every tool call.
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    pub api_url: String,
    pub api_key: Option<String>,
}

impl RuntimeConfig {
    pub fn new(api_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            api_url: api_url.into(),
            api_key,
        }
    }

    /// The configured key, or `MissingApiKey` when absent or blank.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        require_api_key(self.api_key.as_deref())
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
        }
    }
}

pub fn require_api_key(raw: Option<&str>) -> Result<&str, ConfigError> {
    match raw.map(str::trim) {
        Some(key) if !key.is_empty() => Ok(key),
        _ => Err(ConfigError::MissingApiKey),
    }
}

/// Base URL with any trailing slash removed, checked to be an absolute
/// http(s) URL.
pub fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let parsed = reqwest::Url::parse(trimmed).map_err(|e| ConfigError::InvalidBaseUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidBaseUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }
    Ok(trimmed.to_string())
}

pub fn http_client() -> Result<reqwest::Client, ConfigError> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("carapace-mcp/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(CONNECT_TIMEOUT)
        .build()?;
    Ok(client)
}
