//! HTTP client for the Carapace API.
//!
//! One method per endpoint, one exchange per call. Success bodies are handed
//! back untouched as JSON; every other outcome becomes a [`ClientError`].

use std::error::Error as _;
use std::fmt;

use carapace_core::{
    ContributionDraft, ContributionPatch, QueryRequest, RemoteErrorBody, describe_failure,
};
use reqwest::{Method, Url};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{
    ConfigError, DEFAULT_API_URL, http_client, normalize_base_url, require_api_key,
};

#[derive(Debug, Error)]
pub enum ClientError {
    /// Non-2xx response. `message` is the remote `error.message`, or
    /// `API error: <status>` when the body has none.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// No usable response: connection refused, DNS, TLS, or a success body
    /// cut off mid-read.
    #[error("{}", transport_description(.0))]
    Transport(#[from] reqwest::Error),

    /// 2xx response whose body is not JSON.
    #[error("Invalid JSON in response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Transport(err) => err.status().map(|s| s.as_u16()),
            Self::Decode(_) => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// reqwest's own message followed by its cause chain, so "connection
/// refused" is not hidden behind "error sending request".
fn transport_description(err: &reqwest::Error) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !text.contains(&cause_text) {
            text.push_str(": ");
            text.push_str(&cause_text);
        }
        source = cause.source();
    }
    text
}

#[derive(Clone)]
pub struct CarapaceClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl fmt::Debug for CarapaceClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CarapaceClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl CarapaceClient {
    /// Client for the production endpoint. Fails when `api_key` is blank.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ConfigError> {
        Self::with_base_url(api_key, DEFAULT_API_URL)
    }

    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: &str,
    ) -> Result<Self, ConfigError> {
        let api_key = api_key.into();
        let api_key = require_api_key(Some(api_key.as_str()))?.to_string();
        let normalized = normalize_base_url(base_url)?;
        let base_url = Url::parse(&normalized).map_err(|e| ConfigError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            http: http_client()?,
            base_url,
            api_key,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// `POST /query`
    pub async fn query(&self, request: &QueryRequest) -> Result<Value, ClientError> {
        let bytes = self
            .send(Method::POST, &["query"], true, Some(request))
            .await?;
        parse_success_body(&bytes)
    }

    /// `POST /contributions`
    pub async fn contribute(&self, draft: &ContributionDraft) -> Result<Value, ClientError> {
        let bytes = self
            .send(Method::POST, &["contributions"], true, Some(draft))
            .await?;
        parse_success_body(&bytes)
    }

    /// `GET /contributions/{id}`, sent without credentials.
    pub async fn get(&self, id: &str) -> Result<Value, ClientError> {
        let bytes = self
            .send(Method::GET, &["contributions", id], false, None::<&()>)
            .await?;
        parse_success_body(&bytes)
    }

    /// `PUT /contributions/{id}` with only the fields set on `patch`.
    pub async fn update(&self, id: &str, patch: &ContributionPatch) -> Result<Value, ClientError> {
        let bytes = self
            .send(Method::PUT, &["contributions", id], true, Some(patch))
            .await?;
        parse_success_body(&bytes)
    }

    /// `DELETE /contributions/{id}`. The response body is discarded.
    pub async fn delete(&self, id: &str) -> Result<(), ClientError> {
        self.send(Method::DELETE, &["contributions", id], true, None::<&()>)
            .await?;
        Ok(())
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // http(s) URLs always have a path, so this only fails for
        // cannot-be-a-base URLs, which construction already rejected.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send<B>(
        &self,
        method: Method,
        segments: &[&str],
        requires_auth: bool,
        body: Option<&B>,
    ) -> Result<Vec<u8>, ClientError>
    where
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(segments);
        let path = url.path().to_string();

        let mut request = self
            .http
            .request(method.clone(), url)
            .header(reqwest::header::ACCEPT, "application/json");
        if requires_auth {
            request = request.bearer_auth(&self.api_key);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            // The status line arrived; an unreadable body still reports it.
            let bytes = response.bytes().await.unwrap_or_default();
            let parsed = RemoteErrorBody::parse(&bytes);
            let remote = parsed.as_ref().and_then(|body| body.error.as_ref());
            warn!(
                %method,
                %path,
                status = status.as_u16(),
                code = remote.and_then(|err| err.code.as_deref()),
                retry_after = ?remote.and_then(|err| err.retry_after.as_ref()),
                "carapace api error"
            );
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: describe_failure(status.as_u16(), &bytes),
            });
        }

        let bytes = response.bytes().await?;
        debug!(%method, %path, status = status.as_u16(), "carapace api response");
        Ok(bytes.to_vec())
    }
}

fn parse_success_body(bytes: &[u8]) -> Result<Value, ClientError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(bytes)?)
}
