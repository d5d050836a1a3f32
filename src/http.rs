//! HTTP source adapters.
//!
//! The engines never talk to the network directly; they poll through the
//! [`JsonFetcher`] and [`FeedSource`] seams. Production wiring uses the
//! `reqwest`-backed implementations here, tests substitute in-memory fakes.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::error::OverlayError;

/// Fetches one JSON document per call.
#[async_trait]
pub trait JsonFetcher: Send + Sync + std::fmt::Debug {
    /// GET `url` and parse the body as JSON. Non-2xx counts as failure.
    async fn fetch_json(&self, url: &str) -> Result<Value, OverlayError>;
}

/// Joint chat + event source for the merged feed.
///
/// The two fetches are issued concurrently by the engine, so implementors
/// must tolerate interleaved calls.
#[async_trait]
pub trait FeedSource: Send + Sync + std::fmt::Debug {
    async fn fetch_chat(&self) -> Result<Value, OverlayError>;
    async fn fetch_events(&self) -> Result<Value, OverlayError>;
}

/// `reqwest`-backed [`JsonFetcher`].
///
/// Every request carries `Cache-Control: no-store` so embedded webviews do
/// not serve a stale poll from cache.
#[derive(Debug, Clone, Default)]
pub struct HttpJsonFetcher {
    client: reqwest::Client,
}

impl HttpJsonFetcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured client (timeouts, proxies).
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl JsonFetcher for HttpJsonFetcher {
    async fn fetch_json(&self, url: &str) -> Result<Value, OverlayError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::CACHE_CONTROL, "no-store")
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}

/// [`FeedSource`] polling fixed chat and event URLs through a fetcher.
#[derive(Debug, Clone)]
pub struct HttpFeedSource {
    fetcher: Arc<dyn JsonFetcher>,
    chat_url: String,
    events_url: String,
}

impl HttpFeedSource {
    pub fn new(
        fetcher: Arc<dyn JsonFetcher>,
        chat_url: impl Into<String>,
        events_url: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            chat_url: chat_url.into(),
            events_url: events_url.into(),
        }
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch_chat(&self) -> Result<Value, OverlayError> {
        self.fetcher.fetch_json(&self.chat_url).await
    }

    async fn fetch_events(&self) -> Result<Value, OverlayError> {
        self.fetcher.fetch_json(&self.events_url).await
    }
}

/// Join a server base URL and an endpoint path.
#[must_use]
pub fn join_url(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}
