// invidious.rs - Mirror API Client
// The three calls made against an Invidious-compatible mirror: the health
// probe, keyword search and video metadata lookup.
//
// Used by: prober.rs, resolver.rs, pipeline.rs

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Transport or decode failure talking to a mirror or the manifest host.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: StatusCode },
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// One entry of `/api/v1/search`. Channels and playlists share the endpoint,
/// so only `type` is guaranteed.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    #[serde(rename = "type", default)]
    pub kind: String,
    pub video_id: Option<String>,
    #[serde(default)]
    pub title: String,
    pub author: Option<String>,
}

impl SearchHit {
    pub fn is_video(&self) -> bool {
        self.kind == "video" && self.video_id.as_deref().is_some_and(|id| !id.is_empty())
    }
}

/// Subset of `/api/v1/videos/{id}` the reply needs.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
    pub title: String,
    pub author: String,
    pub hls_url: Option<String>,
}

#[async_trait]
pub trait MirrorApi: Send + Sync {
    /// True when the mirror answers the probe with HTTP 200 within `timeout`.
    async fn probe(&self, mirror: &str, video_id: &str, timeout: Duration) -> bool;

    async fn search(&self, mirror: &str, query: &str) -> Result<Vec<SearchHit>, ApiError>;

    async fn video(&self, mirror: &str, video_id: &str) -> Result<VideoMetadata, ApiError>;
}

/// reqwest-backed client. Cheap to clone; the connection pool is shared.
#[derive(Debug, Clone)]
pub struct InvidiousClient {
    http: reqwest::Client,
}

impl InvidiousClient {
    pub fn new(request_timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("tube_proxy_bot/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http })
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let url = response.url().to_string();
        debug!("📡 {} -> {}", url, status);
        if !status.is_success() {
            return Err(ApiError::Status { url, status });
        }
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl MirrorApi for InvidiousClient {
    async fn probe(&self, mirror: &str, video_id: &str, timeout: Duration) -> bool {
        let url = format!("{}/api/v1/videos/{}", mirror, video_id);
        match self.http.get(&url).timeout(timeout).send().await {
            Ok(response) => response.status() == StatusCode::OK,
            Err(e) => {
                debug!("Probe of {} failed: {}", mirror, e);
                false
            }
        }
    }

    async fn search(&self, mirror: &str, query: &str) -> Result<Vec<SearchHit>, ApiError> {
        let request = self
            .http
            .get(format!("{}/api/v1/search", mirror))
            .query(&[("q", query)]);
        self.get_json(request).await
    }

    async fn video(&self, mirror: &str, video_id: &str) -> Result<VideoMetadata, ApiError> {
        let request = self
            .http
            .get(format!("{}/api/v1/videos/{}", mirror, video_id));
        self.get_json(request).await
    }
}
