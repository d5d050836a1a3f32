//! Merged chat/event feed engine.
//!
//! Fuses a chat-message source and an event-notification source into one
//! deduplicated, time-ordered, bounded feed. Each tick fetches both
//! sources concurrently, normalizes what arrived, drops Twitch chat lines
//! that duplicate an event (see [`index::EventIndex`]), sorts the
//! survivors by timestamp, truncates to the configured bound, and hands
//! every not-yet-seen item to the sink in order.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use atc_overlay::feed::{FeedEngine, FeedOptions};
//! use atc_overlay::http::{HttpFeedSource, HttpJsonFetcher};
//! use atc_overlay::schema::SchemaMap;
//! use atc_overlay::seen::SeenSet;
//!
//! # fn sink() -> Arc<dyn atc_overlay::feed::FeedSink> { unimplemented!() }
//! let fetcher = Arc::new(HttpJsonFetcher::new());
//! let source = Arc::new(HttpFeedSource::new(
//!     fetcher,
//!     "http://127.0.0.1:17845/api/chat/recent?limit=100",
//!     "http://127.0.0.1:17845/api/twitch/eventsub/events",
//! ));
//! let engine = Arc::new(FeedEngine::new(
//!     source,
//!     sink(),
//!     Arc::new(SeenSet::default()),
//!     SchemaMap::default(),
//!     FeedOptions::default(),
//! ));
//! let handle = engine.start();
//! ```

pub mod index;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;

use crate::error::OverlayError;
use crate::http::FeedSource;
use crate::item::NormalizedItem;
use crate::platform::Platform;
use crate::scheduler::{TaskHandle, spawn_repeating};
use crate::schema::{SchemaMap, event_list};
use crate::seen::Remember;

pub use index::EventIndex;

/// Tuning for the merged feed.
#[derive(Debug, Clone)]
pub struct FeedOptions {
    /// Poll period.
    pub interval: Duration,
    /// Bound on items kept per tick; the oldest beyond it are dropped.
    pub max_items: usize,
    /// Chat-vs-event match tolerance in milliseconds.
    pub dedupe_window_ms: i64,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1000),
            max_items: 200,
            dedupe_window_ms: 5000,
        }
    }
}

/// Receives surviving feed items, in chronological order.
pub trait FeedSink: Send + Sync + std::fmt::Debug {
    /// Append one line to the rendered feed.
    ///
    /// An error aborts delivery for the remainder of the tick; the engine
    /// records it and carries on at the next tick.
    fn add_line(&self, item: &NormalizedItem) -> Result<(), OverlayError>;
}

/// Poll health, for a debug surface.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedStatus {
    /// Wall time of the last tick in which at least one source answered.
    pub last_ok_ms: Option<i64>,
    /// Problem recorded by the most recent tick, if any.
    pub last_error: Option<String>,
}

type ErrorHook = Box<dyn Fn(&OverlayError) + Send + Sync>;

/// The merged feed engine. One instance per rendered feed.
pub struct FeedEngine {
    source: Arc<dyn FeedSource>,
    sink: Arc<dyn FeedSink>,
    remember: Arc<dyn Remember>,
    schema: SchemaMap,
    options: FeedOptions,
    status: Mutex<FeedStatus>,
    on_error: Option<ErrorHook>,
}

impl std::fmt::Debug for FeedEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedEngine")
            .field("source", &self.source)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl FeedEngine {
    pub fn new(
        source: Arc<dyn FeedSource>,
        sink: Arc<dyn FeedSink>,
        remember: Arc<dyn Remember>,
        schema: SchemaMap,
        options: FeedOptions,
    ) -> Self {
        Self {
            source,
            sink,
            remember,
            schema,
            options,
            status: Mutex::new(FeedStatus::default()),
            on_error: None,
        }
    }

    /// Also invoke `hook` for every failure the engine records.
    #[must_use]
    pub fn with_error_hook(
        mut self,
        hook: impl Fn(&OverlayError) + Send + Sync + 'static,
    ) -> Self {
        self.on_error = Some(Box::new(hook));
        self
    }

    /// Run one poll/normalize/dedupe/render cycle.
    ///
    /// Never fails outward: a failed source contributes no items this
    /// tick, a failing sink aborts delivery until the next tick, and both
    /// are recorded in the status.
    pub async fn tick(&self) {
        let (chat_result, events_result) =
            tokio::join!(self.source.fetch_chat(), self.source.fetch_events());
        let any_ok = chat_result.is_ok() || events_result.is_ok();
        let mut tick_error = None;
        let chat_body = self.source_body("chat", chat_result, &mut tick_error);
        let events_body = self.source_body("events", events_result, &mut tick_error);

        let mut events: Vec<NormalizedItem> = event_list(&events_body)
            .iter()
            .filter_map(|raw| self.schema.normalize_item(raw, Platform::Unknown))
            .collect();
        for event in &mut events {
            event.is_event = true;
        }

        let index = EventIndex::build(&events);

        let mut merged: Vec<NormalizedItem> = self
            .schema
            .chat_items(&chat_body)
            .iter()
            .filter_map(|raw| self.schema.normalize_item(raw, Platform::Unknown))
            .filter(|item| !index.suppresses(item, self.options.dedupe_window_ms))
            .collect();
        merged.append(&mut events);
        // Stable sort: equal timestamps keep chat-before-event arrival order.
        merged.sort_by_key(|item| item.ts_ms);

        let start = merged.len().saturating_sub(self.options.max_items);
        let mut delivered = 0usize;
        for item in &mut merged[start..] {
            let id = item.ensure_id().to_string();
            if !self.remember.remember(&id) {
                continue;
            }
            if let Err(err) = self.sink.add_line(item) {
                tracing::warn!(name: "feed.sink.failed", error = %err, "Feed sink rejected line");
                tick_error = Some(err.debug_message());
                if let Some(hook) = &self.on_error {
                    hook(&err);
                }
                break;
            }
            delivered += 1;
        }

        {
            let mut status = self.status.lock().unwrap();
            if any_ok {
                status.last_ok_ms = Some(chrono::Utc::now().timestamp_millis());
            }
            status.last_error = tick_error;
        }

        if delivered > 0 {
            tracing::debug!(name: "feed.tick.delivered", count = delivered, "Feed lines delivered");
        }
    }

    fn source_body(
        &self,
        which: &'static str,
        result: Result<Value, OverlayError>,
        tick_error: &mut Option<String>,
    ) -> Value {
        match result {
            Ok(body) => body,
            Err(err) => {
                tracing::warn!(name: "feed.source.failed", source = which, error = %err, "Feed source failed");
                *tick_error = Some(err.debug_message());
                if let Some(hook) = &self.on_error {
                    hook(&err);
                }
                Value::Null
            }
        }
    }

    /// Current poll health.
    #[must_use]
    pub fn status(&self) -> FeedStatus {
        self.status.lock().unwrap().clone()
    }

    /// Tick immediately, then on every interval, until the handle stops it.
    #[must_use = "dropping the handle detaches the ticking task"]
    pub fn start(self: &Arc<Self>) -> TaskHandle {
        let engine = Arc::clone(self);
        spawn_repeating(self.options.interval, move || {
            let engine = Arc::clone(&engine);
            async move { engine.tick().await }
        })
    }
}
