//! Fetch stage: retrieve raw image bytes from a reference.
//!
//! The pipeline consumes fetching through the [`ImageFetcher`] trait so the
//! networked implementation stays swappable; tests install deterministic
//! in-memory fetchers. [`HttpFetcher`] is the production implementation,
//! a shared `reqwest` client built once at startup.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced by the fetch stage.
///
/// Transport failures (unreachable host, invalid reference, timeout,
/// non-2xx status) surface the underlying client error's message verbatim;
/// that message is what a failing batch item reports to the caller.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FetchError {
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error("downloaded {size} bytes exceeds limit of {limit}")]
    TooLarge { size: usize, limit: usize },
}

/// Fetch-by-reference collaborator consumed by the item pipeline.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Retrieve the raw bytes behind `reference`.
    async fn fetch(&self, reference: &str) -> Result<Bytes, FetchError>;
}

/// Fetch stage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FetchConfig {
    /// Per-request timeout in seconds. A hung fetch blocks only its own item.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Cap on downloaded bytes per image. `None` disables the cap.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: Option<usize>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_bytes: default_max_bytes(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_bytes() -> Option<usize> {
    Some(20 * 1024 * 1024)
}

/// HTTP GET fetcher over a shared client.
pub struct HttpFetcher {
    client: reqwest::Client,
    max_bytes: Option<usize>,
}

impl HttpFetcher {
    /// Build a fetcher with the configured timeout and size cap.
    pub fn new(cfg: &FetchConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            max_bytes: cfg.max_bytes,
        })
    }
}

#[async_trait]
impl ImageFetcher for HttpFetcher {
    async fn fetch(&self, reference: &str) -> Result<Bytes, FetchError> {
        let response = self
            .client
            .get(reference)
            .send()
            .await?
            .error_for_status()?;
        let body = response.bytes().await?;

        if let Some(limit) = self.max_bytes {
            if body.len() > limit {
                return Err(FetchError::TooLarge {
                    size: body.len(),
                    limit,
                });
            }
        }

        tracing::debug!(reference, bytes = body.len(), "fetch_complete");
        Ok(body)
    }
}
