/// GitHub Client — reads and writes the problem collection file through the
/// repository contents API.
///
/// The file's blob sha is the version token. Writes send the sha the caller
/// last saw; the API refuses the write when the file moved on since then, and
/// that refusal is surfaced as `StoreError::Conflict`. Nothing is retried here:
/// the caller re-reads, merges and tries again.
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::errors::truncate_upstream;

#[cfg(test)]
pub mod memory;

const GITHUB_API_VERSION: &str = "2022-11-28";
const GITHUB_ACCEPT: &str = "application/vnd.github+json";
/// Raw media type: the body is the file itself. Used for files the JSON
/// response does not inline (over 1 MB).
const GITHUB_RAW_ACCEPT: &str = "application/vnd.github.raw+json";
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("GITHUB_TOKEN is not configured")]
    MissingToken,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("GitHub API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("File changed since it was read (status {status}): {message}")]
    Conflict { status: u16, message: String },

    #[error("Could not decode file content: {0}")]
    Decode(String),
}

/// Where the collection lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLocation {
    pub owner: String,
    pub repo: String,
    pub path: String,
    pub branch: String,
}

/// A file as read from the store, with its version token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub content: String,
    pub sha: String,
}

/// A whole-file replacement.
#[derive(Debug, Clone)]
pub struct WriteRequest<'a> {
    pub message: &'a str,
    pub content: &'a str,
    /// Sha observed at read time. `None` only when creating the file.
    pub expected_sha: Option<&'a str>,
}

/// Hash-versioned file storage with compare-and-swap writes.
/// Carried in `AppState` as `Arc<dyn ContentStore>`.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Reads the file. `Ok(None)` means it does not exist yet.
    async fn fetch(&self, location: &FileLocation) -> Result<Option<RemoteFile>, StoreError>;

    /// Replaces the file if its current sha still matches `expected_sha`.
    /// Returns the new sha.
    async fn write(
        &self,
        location: &FileLocation,
        request: WriteRequest<'_>,
    ) -> Result<String, StoreError>;
}

/// Classifies a failed write or read. Hash mismatches become `Conflict`.
pub fn classify_failure(status: u16, message: String) -> StoreError {
    if is_conflict(status, &message) {
        StoreError::Conflict { status, message }
    } else {
        StoreError::Api { status, message }
    }
}

fn is_conflict(status: u16, message: &str) -> bool {
    if status == StatusCode::CONFLICT.as_u16() || status == StatusCode::PRECONDITION_FAILED.as_u16()
    {
        return true;
    }
    let message = message.to_lowercase();
    message.contains("sha") || message.contains("does not match")
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    sha: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: String,
}

#[derive(Debug, Serialize)]
struct PutContentsRequest<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct PutContentsResponse {
    content: PutContentMeta,
}

#[derive(Debug, Deserialize)]
struct PutContentMeta {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct GitHubError {
    message: String,
}

/// Contents-API client.
#[derive(Clone)]
pub struct GitHubClient {
    client: Client,
    token: Option<String>,
    base_url: String,
}

impl GitHubClient {
    pub fn new(token: Option<String>, base_url: String) -> Self {
        Self {
            client: Client::new(),
            token,
            base_url,
        }
    }

    fn token(&self) -> Result<&str, StoreError> {
        self.token.as_deref().ok_or(StoreError::MissingToken)
    }

    fn contents_url(&self, location: &FileLocation) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.base_url.trim_end_matches('/'),
            location.owner,
            location.repo,
            location.path.trim_start_matches('/')
        )
    }

    fn request(
        &self,
        method: reqwest::Method,
        url: String,
        token: &str,
        accept: &'static str,
    ) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(token)
            .header(header::ACCEPT, accept)
            .header(header::USER_AGENT, USER_AGENT)
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
    }

    async fn failure(response: reqwest::Response) -> StoreError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<GitHubError>(&body)
            .map(|e| e.message)
            .unwrap_or(body);
        warn!("GitHub API returned {status}: {}", truncate_upstream(&message));
        classify_failure(status, truncate_upstream(&message))
    }

    async fn fetch_raw(&self, location: &FileLocation, token: &str) -> Result<String, StoreError> {
        let response = self
            .request(
                reqwest::Method::GET,
                self.contents_url(location),
                token,
                GITHUB_RAW_ACCEPT,
            )
            .query(&[("ref", location.branch.as_str())])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::failure(response).await);
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl ContentStore for GitHubClient {
    async fn fetch(&self, location: &FileLocation) -> Result<Option<RemoteFile>, StoreError> {
        let token = self.token()?;
        let response = self
            .request(
                reqwest::Method::GET,
                self.contents_url(location),
                token,
                GITHUB_ACCEPT,
            )
            .query(&[("ref", location.branch.as_str())])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!("{} not found on {}", location.path, location.branch);
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::failure(response).await);
        }

        let body: ContentsResponse = response.json().await?;
        // The sha is this response's. If a raw re-read races a newer commit,
        // the stale sha makes the next write conflict.
        let content = match body.encoding.as_str() {
            "base64" | "" => decode_content(&body.content)?,
            "none" => {
                debug!("{} is not inlined; reading raw content", location.path);
                self.fetch_raw(location, token).await?
            }
            other => {
                return Err(StoreError::Decode(format!(
                    "unsupported content encoding '{other}'"
                )))
            }
        };
        debug!("Fetched {} ({} bytes, sha {})", location.path, content.len(), body.sha);
        Ok(Some(RemoteFile {
            content,
            sha: body.sha,
        }))
    }

    async fn write(
        &self,
        location: &FileLocation,
        request: WriteRequest<'_>,
    ) -> Result<String, StoreError> {
        let token = self.token()?;
        let body = PutContentsRequest {
            message: request.message,
            content: BASE64.encode(request.content.as_bytes()),
            branch: &location.branch,
            sha: request.expected_sha,
        };

        let response = self
            .request(
                reqwest::Method::PUT,
                self.contents_url(location),
                token,
                GITHUB_ACCEPT,
            )
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::failure(response).await);
        }

        let written: PutContentsResponse = response.json().await?;
        debug!("Wrote {} (new sha {})", location.path, written.content.sha);
        Ok(written.content.sha)
    }
}

/// Decodes contents-API base64, which arrives wrapped at 60 columns.
fn decode_content(encoded: &str) -> Result<String, StoreError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = BASE64
        .decode(compact.as_bytes())
        .map_err(|e| StoreError::Decode(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| StoreError::Decode(e.to_string()))
}
