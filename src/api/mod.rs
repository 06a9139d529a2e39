//! HTTP plumbing for the music server
//!
//! - `player`: transport commands against the remote playback engine
//! - `catalog`: album, playlist, favourites and track lookups
//!
//! Both clients share [`ApiClient`], which owns the reqwest client, joins
//! paths against the configured base URL and normalizes failures into
//! [`ApiError`].

pub mod catalog;
pub mod player;

use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use catalog::{Catalog, CatalogClient};
pub use player::{PlayerClient, PlayerTransport, RemoteState, ResumeOutcome};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("{message}")]
    Status { status: u16, message: String },
    /// The server refused because its state does not allow the command
    /// (for instance resuming while nothing is loaded).
    #[error("{message}")]
    Precondition { message: String },
    #[error("invalid response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ApiError {
    pub fn is_precondition(&self) -> bool {
        matches!(self, ApiError::Precondition { .. })
    }
}

/// Error payload shape used by the server: `{ "error": ... }` or `{ "message": ... }`
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

pub(crate) fn error_from_response(status: StatusCode, body: &[u8]) -> ApiError {
    let message = serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|body| body.error.or(body.message))
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        });

    match status {
        StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED => ApiError::Precondition { message },
        _ => ApiError::Status {
            status: status.as_u16(),
            message,
        },
    }
}

/// Shared HTTP client bound to the server's API base URL
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let request = self.http.get(self.url(path)).query(query);
        Self::send(request).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.http.post(self.url(path)).json(body);
        Self::send(request).await
    }

    async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(error_from_response(status, &body));
        }

        // Command endpoints may answer with an empty body
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(serde_json::from_slice(b"{}")?);
        }
        Ok(serde_json::from_slice(&body)?)
    }
}

/// Resolve a server-relative asset path (cover art) against `base`.
///
/// Absolute `http(s)://`, protocol-relative, `data:` and `blob:` URLs are returned unchanged.
pub fn to_backend_url(base: &str, input: &str) -> String {
    let value = input.trim();
    if value.is_empty() {
        return String::new();
    }

    let lower = value.to_ascii_lowercase();
    let is_absolute = lower.starts_with("http://")
        || lower.starts_with("https://")
        || lower.starts_with("//")
        || lower.starts_with("data:")
        || lower.starts_with("blob:");
    if is_absolute {
        return value.to_string();
    }

    let base = base.trim().trim_end_matches('/');
    if base.is_empty() {
        return value.to_string();
    }

    format!("{}/{}", base, value.trim_start_matches('/'))
}
