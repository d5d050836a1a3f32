//! Alert ingestion and playback.
//!
//! The sequencer polls a set of bridge endpoints for viewer events,
//! filters out everything already processed (per-platform low-water-marks
//! plus an identity dedupe set), maps survivors onto themed tower-control
//! phraseology, and feeds a bounded queue that a serial player task drains
//! one alert at a time.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use atc_overlay::alerts::{AlertSequencer, AlertsOptions, CutoffStore, EndpointConfig};
//! use atc_overlay::http::HttpJsonFetcher;
//! use atc_overlay::schema::SchemaMap;
//!
//! # fn renderer() -> Arc<dyn atc_overlay::alerts::AlertRenderer> { unimplemented!() }
//! let options = AlertsOptions {
//!     endpoints: vec![EndpointConfig {
//!         url: "http://127.0.0.1:17845/api/twitch/eventsub/events".to_string(),
//!         optional: false,
//!     }],
//!     ..AlertsOptions::default()
//! };
//! let sequencer = Arc::new(AlertSequencer::new(
//!     Arc::new(HttpJsonFetcher::new()),
//!     renderer(),
//!     SchemaMap::default(),
//!     CutoffStore::open("atc_alerts_last_ts_v1.json"),
//!     options,
//! ));
//! let handle = sequencer.start();
//! ```

pub mod callsign;
pub mod cutoff;
pub mod mapping;
pub mod playback;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Notify;

pub use callsign::callsign_from_user;
pub use cutoff::CutoffStore;
pub use mapping::{AlertRecord, event_key, map_event};
pub use playback::{AlertRenderer, PlaybackPhase, PlaybackTimings};

use crate::http::JsonFetcher;
use crate::platform::Platform;
use crate::scheduler::{self, TaskHandle};
use crate::schema::{self, SchemaMap};
use crate::seen::SeenSet;

/// One polled alert endpoint.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EndpointConfig {
    pub url: String,
    /// Failures of an optional endpoint never surface in the status line.
    #[serde(default)]
    pub optional: bool,
}

/// Tunables for the sequencer.
#[derive(Debug, Clone)]
pub struct AlertsOptions {
    /// Poll cadence across all endpoints.
    pub poll_interval: Duration,
    /// Queue bound; overflow drops the oldest queued alert.
    pub queue_max: usize,
    /// Identity dedupe capacity, see [`SeenSet`].
    pub dedupe_max: usize,
    pub timings: PlaybackTimings,
    pub endpoints: Vec<EndpointConfig>,
}

impl Default for AlertsOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(450),
            queue_max: 25,
            dedupe_max: crate::seen::DEFAULT_SEEN_CAPACITY,
            timings: PlaybackTimings::default(),
            endpoints: Vec::new(),
        }
    }
}

/// Poll health snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollStatus {
    /// When the last poll reached at least one endpoint, epoch millis.
    pub last_ok_ms: Option<i64>,
    /// Last required-endpoint failure, at most 80 characters.
    pub last_error: Option<String>,
}

/// Running poller/player pair returned by [`AlertSequencer::start`].
#[derive(Debug)]
pub struct SequencerHandle {
    poller: TaskHandle,
    player: TaskHandle,
}

impl SequencerHandle {
    /// Stop both tasks. Queued alerts stay in the sequencer.
    pub fn stop(&self) {
        self.poller.stop();
        self.player.stop();
    }
}

/// Polls alert endpoints and plays the results back serially.
#[derive(Debug)]
pub struct AlertSequencer {
    fetcher: Arc<dyn JsonFetcher>,
    renderer: Arc<dyn AlertRenderer>,
    schema: SchemaMap,
    seen: SeenSet,
    cutoffs: CutoffStore,
    queue: Arc<Mutex<VecDeque<AlertRecord>>>,
    wake: Arc<Notify>,
    playing: Arc<AtomicBool>,
    status: Mutex<PollStatus>,
    options: AlertsOptions,
}

impl AlertSequencer {
    #[must_use]
    pub fn new(
        fetcher: Arc<dyn JsonFetcher>,
        renderer: Arc<dyn AlertRenderer>,
        schema: SchemaMap,
        cutoffs: CutoffStore,
        options: AlertsOptions,
    ) -> Self {
        Self {
            fetcher,
            renderer,
            schema,
            seen: SeenSet::new(options.dedupe_max),
            cutoffs,
            queue: Arc::new(Mutex::new(VecDeque::new())),
            wake: Arc::new(Notify::new()),
            playing: Arc::new(AtomicBool::new(false)),
            status: Mutex::new(PollStatus::default()),
            options,
        }
    }

    /// Run one poll pass over every configured endpoint, in order.
    pub async fn poll_once(&self) {
        let mut any_ok = false;
        let mut err_msg: Option<String> = None;

        for endpoint in &self.options.endpoints {
            match self.fetcher.fetch_json(&endpoint.url).await {
                Ok(body) => {
                    self.ingest(&body);
                    any_ok = true;
                }
                Err(err) if endpoint.optional => {
                    tracing::debug!(
                        name: "alerts.poll.optional_failed",
                        url = %endpoint.url,
                        error = %err,
                        "Optional alert endpoint failed"
                    );
                }
                Err(err) => {
                    let msg = err.debug_message();
                    tracing::warn!(
                        name: "alerts.poll.failed",
                        url = %endpoint.url,
                        error = %msg,
                        "Alert endpoint failed"
                    );
                    err_msg = Some(msg);
                }
            }
        }

        {
            let mut status = self.status.lock().unwrap();
            if any_ok {
                status.last_ok_ms = Some(chrono::Utc::now().timestamp_millis());
                status.last_error = None;
            } else if let Some(msg) = err_msg {
                status.last_error = Some(msg);
            }
        }

        if !self.playing.load(Ordering::SeqCst) {
            self.wake.notify_one();
        }
    }

    /// Filter, map, and queue one endpoint's event list.
    fn ingest(&self, body: &Value) {
        let mut enqueued = 0usize;
        for raw in schema::event_list(body) {
            if raw.is_null() {
                continue;
            }
            let platform = mapping::raw_platform(&self.schema, raw);
            let ts_ms = self.schema.ts_ms.int_of(raw).unwrap_or(0);
            if !self.cutoffs.should_accept(platform, ts_ms) {
                continue;
            }
            if !self.seen.remember(&mapping::event_key(&self.schema, raw)) {
                continue;
            }
            if self.enqueue(mapping::map_event(&self.schema, raw)) {
                enqueued += 1;
            }
            self.cutoffs.mark_accepted(platform, ts_ms);
        }
        if enqueued > 0 {
            tracing::debug!(name: "alerts.poll.enqueued", count = enqueued, "Queued new alerts");
        }
    }

    fn enqueue(&self, alert: AlertRecord) -> bool {
        if alert.is_anonymous() {
            return false;
        }
        let mut queue = self.queue.lock().unwrap();
        queue.push_back(alert);
        while queue.len() > self.options.queue_max {
            queue.pop_front();
        }
        true
    }

    /// Start the poll loop and the playback task.
    #[must_use]
    pub fn start(self: &Arc<Self>) -> SequencerHandle {
        let player = playback::spawn_player(
            Arc::clone(&self.queue),
            Arc::clone(&self.wake),
            Arc::clone(&self.playing),
            Arc::clone(&self.renderer),
            self.options.timings,
        );
        let sequencer = Arc::clone(self);
        let poller = scheduler::spawn_repeating(self.options.poll_interval, move || {
            let sequencer = Arc::clone(&sequencer);
            async move { sequencer.poll_once().await }
        });
        SequencerHandle { poller, player }
    }

    #[must_use]
    pub fn status(&self) -> PollStatus {
        self.status.lock().unwrap().clone()
    }

    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    /// Snapshot of the queued alerts in playback order.
    #[must_use]
    pub fn queued(&self) -> Vec<AlertRecord> {
        self.queue.lock().unwrap().iter().cloned().collect()
    }

    /// True while an alert is on screen.
    #[must_use]
    pub fn playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    /// Drop queued alerts, identity history, and poll status.
    ///
    /// Persisted low-water-marks are deliberately kept; a reset must not
    /// replay already-processed events.
    pub fn reset(&self) {
        self.queue.lock().unwrap().clear();
        self.seen.clear();
        *self.status.lock().unwrap() = PollStatus::default();
    }

    /// One-line status summary for the overlay's corner debug readout.
    ///
    /// `q=0 • last_ok=3s • cutoff(tw:12:30:01Z tk:12:29:58Z yt:00:00:00Z)`,
    /// with an ` • err=...` suffix while the last poll failed.
    #[must_use]
    pub fn debug_line(&self) -> String {
        let status = self.status.lock().unwrap().clone();
        let age = match status.last_ok_ms {
            Some(ok_ms) => {
                let now = chrono::Utc::now().timestamp_millis();
                format!("{}s", (now - ok_ms).max(0) / 1000)
            }
            None => "—".to_string(),
        };
        let cuts = format!(
            "cutoff(tw:{} tk:{} yt:{})",
            short_time(self.cutoffs.current(Platform::Twitch)),
            short_time(self.cutoffs.current(Platform::Tiktok)),
            short_time(self.cutoffs.current(Platform::Youtube)),
        );
        let line = format!("q={} • last_ok={age} • {cuts}", self.queue_len());
        match status.last_error {
            Some(err) => format!("{line} • err={err}"),
            None => line,
        }
    }
}

/// Render an epoch-millis timestamp as `HH:MM:SSZ` (UTC).
///
/// Out-of-range values render as an empty string.
#[must_use]
pub fn short_time(ts_ms: i64) -> String {
    match chrono::DateTime::from_timestamp_millis(ts_ms) {
        Some(dt) => dt.format("%H:%M:%SZ").to_string(),
        None => String::new(),
    }
}
