//! HTTP client for the SIPIS statistics endpoint.

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

use crate::measurement::Measurement;

/// Path appended to an instance base URL.
pub const STATS_PATH: &str = "/stats/summary/json";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Largest statistics body accepted by default. A summary is a few hundred
/// bytes.
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Errors from fetching one instance's statistics.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: StatusCode },

    #[error("Response from {url} exceeds {limit} bytes")]
    BodyTooLarge { url: String, limit: usize },

    #[error("Invalid statistics payload from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl FetchError {
    /// Whether the request timed out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Transport { source, .. } if source.is_timeout())
    }
}

/// Fetches and decodes [`Measurement`]s. Cheap to clone; clones share the
/// underlying connection pool.
#[derive(Debug, Clone)]
pub struct StatsFetcher {
    client: reqwest::Client,
    body_limit: usize,
}

impl StatsFetcher {
    /// Create a fetcher whose requests are bounded by `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self {
            client,
            body_limit: DEFAULT_BODY_LIMIT,
        })
    }

    /// Reject response bodies larger than `bytes`.
    pub fn with_body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = bytes;
        self
    }

    /// Statistics URL for an instance. The base URL is used verbatim.
    pub fn stats_url(instance: &str) -> String {
        format!("{}{}", instance, STATS_PATH)
    }

    /// Fetch the current statistics of one instance.
    pub async fn fetch(&self, instance: &str) -> Result<Measurement, FetchError> {
        let url = Self::stats_url(instance);

        let mut response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(source) => return Err(FetchError::Transport { url, source }),
        };

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { url, status });
        }

        let limit = self.body_limit;
        if response
            .content_length()
            .is_some_and(|len| len > limit as u64)
        {
            return Err(FetchError::BodyTooLarge { url, limit });
        }

        let mut body = Vec::new();
        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    if body.len() + chunk.len() > limit {
                        return Err(FetchError::BodyTooLarge { url, limit });
                    }
                    body.extend_from_slice(&chunk);
                }
                Ok(None) => break,
                Err(source) => return Err(FetchError::Transport { url, source }),
            }
        }

        Measurement::decode(&body).map_err(|source| FetchError::Decode { url, source })
    }
}
