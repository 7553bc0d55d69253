//! Fetching entry manifests from remotes.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use fed_core::RemoteEntry;

/// Error type for fetch operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP error: {status} for {url}")]
    Http { status: u16, url: String },

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("request error: {0}")]
    Request(String),
}

/// How entry manifests are obtained.
///
/// The loader is written against this seam so tests and demos can substitute
/// an in-memory fetcher for the network.
#[async_trait]
pub trait RemoteFetcher: Send + Sync {
    /// Fetch and parse the entry manifest at `url`.
    async fn fetch_entry(&self, url: &str) -> Result<RemoteEntry, FetchError>;
}

/// HTTP fetcher backed by reqwest.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher with the given connect timeout.
    pub fn new(connect_timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| FetchError::Request(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl RemoteFetcher for HttpFetcher {
    async fn fetch_entry(&self, url: &str) -> Result<RemoteEntry, FetchError> {
        let resp = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(url.to_string())
            } else if e.is_connect() {
                FetchError::Connection(e.to_string())
            } else {
                FetchError::Request(e.to_string())
            }
        })?;

        let status = resp.status().as_u16();
        if status >= 400 {
            return Err(FetchError::Http {
                status,
                url: url.to_string(),
            });
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;
        decode_entry(&bytes)
    }
}

/// Parse an entry manifest out of a response body.
fn decode_entry(bytes: &[u8]) -> Result<RemoteEntry, FetchError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| FetchError::Deserialization("response body is not UTF-8".to_string()))?;
    RemoteEntry::from_json(text).map_err(|e| FetchError::Deserialization(e.to_string()))
}

/// In-memory fetcher for tests and demos.
///
/// Serves pre-registered manifests by URL and can inject failures. Counts
/// fetches per URL so callers can assert the at-most-once cache behavior.
#[derive(Default)]
pub struct StaticFetcher {
    entries: HashMap<String, Result<RemoteEntry, FetchError>>,
    counts: Mutex<HashMap<String, usize>>,
}

impl StaticFetcher {
    /// Create an empty static fetcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `entry` at `url`.
    pub fn with_entry(mut self, url: impl Into<String>, entry: RemoteEntry) -> Self {
        self.entries.insert(url.into(), Ok(entry));
        self
    }

    /// Fail every fetch of `url` with `error`.
    pub fn with_failure(mut self, url: impl Into<String>, error: FetchError) -> Self {
        self.entries.insert(url.into(), Err(error));
        self
    }

    /// How many times `url` has been fetched.
    pub fn fetch_count(&self, url: &str) -> usize {
        self.counts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(url)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl RemoteFetcher for StaticFetcher {
    async fn fetch_entry(&self, url: &str) -> Result<RemoteEntry, FetchError> {
        *self
            .counts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(url.to_string())
            .or_insert(0) += 1;

        match self.entries.get(url) {
            Some(result) => result.clone(),
            None => Err(FetchError::Connection(format!("no route to {}", url))),
        }
    }
}
