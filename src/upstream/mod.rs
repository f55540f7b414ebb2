//! Upstream API client
//!
//! The proxy handler talks to the GitHub REST API through the [`Upstream`] trait;
//! [`GithubClient`] is the reqwest implementation.

use async_trait::async_trait;

use crate::config::UpstreamConfig;

/// Transport-level upstream failure (connect, TLS, body read)
#[derive(Debug, thiserror::Error)]
#[error("upstream request failed: {0}")]
pub struct UpstreamError(#[from] reqwest::Error);

/// Status and body of an upstream reply
///
/// `body` is only read for success statuses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: String,
}

impl UpstreamResponse {
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

#[async_trait]
pub trait Upstream: Send + Sync {
    /// GET `path_and_query` relative to the upstream base URL
    async fn get(
        &self,
        path_and_query: &str,
        authorization: &str,
    ) -> Result<UpstreamResponse, UpstreamError>;
}

pub struct GithubClient {
    client: reqwest::Client,
    base_url: String,
    accept: String,
    user_agent: String,
}

impl GithubClient {
    pub fn new(cfg: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            accept: cfg.accept.clone(),
            user_agent: cfg.user_agent.clone(),
        })
    }
}

#[async_trait]
impl Upstream for GithubClient {
    async fn get(
        &self,
        path_and_query: &str,
        authorization: &str,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let url = format!("{}{path_and_query}", self.base_url);
        tracing::debug!(%url, "upstream request");

        let response = self
            .client
            .get(&url)
            .header("Authorization", authorization)
            .header("Accept", &self.accept)
            .header("User-Agent", &self.user_agent)
            .send()
            .await?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            return Ok(UpstreamResponse {
                status,
                body: String::new(),
            });
        }

        Ok(UpstreamResponse {
            status,
            body: response.text().await?,
        })
    }
}
