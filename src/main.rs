//! ATC Stream Overlay runner
//!
//! Entry point for the overlay companion process: starts the merged feed
//! engine and the alert sequencer against a local bridge and renders both
//! to the terminal.

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::manual_let_else)]

use mimalloc::MiMalloc;

/// Global allocator for improved performance.
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::sync::Arc;
use std::time::Duration;

use dotenvy::dotenv;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use atc_overlay::alerts::{
    AlertRecord, AlertRenderer, AlertSequencer, AlertsOptions, CutoffStore, PlaybackPhase,
    PlaybackTimings, short_time,
};
use atc_overlay::config::AppConfig;
use atc_overlay::error::OverlayError;
use atc_overlay::feed::{FeedEngine, FeedOptions, FeedSink};
use atc_overlay::http::{HttpFeedSource, HttpJsonFetcher, JsonFetcher};
use atc_overlay::item::NormalizedItem;
use atc_overlay::scheduler::spawn_repeating;
use atc_overlay::schema::SchemaMap;
use atc_overlay::seen::SeenSet;

/// Prints merged feed lines to the terminal.
#[derive(Debug, Default)]
struct TerminalFeedSink;

impl FeedSink for TerminalFeedSink {
    fn add_line(&self, item: &NormalizedItem) -> Result<(), OverlayError> {
        let marker = if item.is_event { "*" } else { " " };
        println!(
            "{} {}{marker} {}: {}",
            short_time(item.ts_ms),
            item.platform.short_tag(),
            item.user,
            item.text
        );
        Ok(())
    }
}

/// Prints the alert card and traces phase changes.
#[derive(Debug, Default)]
struct TerminalAlertRenderer;

impl AlertRenderer for TerminalAlertRenderer {
    fn show(&self, alert: &AlertRecord) {
        let user = if alert.user.is_empty() {
            "UNKNOWN"
        } else {
            alert.user.as_str()
        };
        println!(
            "*** [{}] {} {} ({user}) {} | {}",
            alert.platform,
            alert.kind,
            alert.callsign,
            alert.message,
            short_time(alert.ts_ms)
        );
    }

    fn set_phase(&self, phase: PlaybackPhase) {
        tracing::debug!(name: "alerts.play.phase", phase = %phase, "Alert phase");
    }

    fn hide(&self) {
        tracing::debug!(name: "alerts.play.hide", "Alert surface cleared");
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    // Load .env (if present)
    let _ = dotenv();

    let config = match AppConfig::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    info!(
        name: "overlay.config.loaded",
        base_url = %config.server.base_url,
        feed_interval_ms = config.feed.interval_ms,
        alerts_poll_ms = config.alerts.poll_ms,
        endpoints = config.alerts.endpoints.len(),
        "Configuration loaded"
    );

    let fetcher: Arc<dyn JsonFetcher> = Arc::new(HttpJsonFetcher::new());

    // Merged feed engine
    let source = Arc::new(HttpFeedSource::new(
        Arc::clone(&fetcher),
        config.chat_url(),
        config.events_url(),
    ));
    let feed = Arc::new(FeedEngine::new(
        source,
        Arc::new(TerminalFeedSink),
        Arc::new(SeenSet::default()),
        SchemaMap::default(),
        FeedOptions {
            interval: Duration::from_millis(config.feed.interval_ms),
            max_items: config.feed.max_items,
            dedupe_window_ms: config.feed.dedupe_window_ms,
        },
    ));
    let feed_handle = feed.start();

    // Alert sequencer
    let sequencer = Arc::new(AlertSequencer::new(
        Arc::clone(&fetcher),
        Arc::new(TerminalAlertRenderer),
        SchemaMap::default(),
        CutoffStore::open(&config.alerts.state_path),
        AlertsOptions {
            poll_interval: Duration::from_millis(config.alerts.poll_ms),
            queue_max: config.alerts.queue_max,
            dedupe_max: config.alerts.dedupe_max,
            timings: PlaybackTimings {
                enter: Duration::from_millis(config.alerts.enter_ms),
                hold: Duration::from_millis(config.alerts.hold_ms),
                exit: Duration::from_millis(config.alerts.exit_ms),
                gap: Duration::from_millis(config.alerts.gap_ms),
            },
            endpoints: config.alert_endpoints(),
        },
    ));
    let alerts_handle = sequencer.start();

    // Periodic status line, same readout the overlay corner banner shows
    let status_handle = if config.debug_status {
        let sequencer = Arc::clone(&sequencer);
        Some(spawn_repeating(Duration::from_secs(1), move || {
            let sequencer = Arc::clone(&sequencer);
            async move {
                info!(name: "overlay.status", line = %sequencer.debug_line(), "Alert status");
            }
        }))
    } else {
        None
    };

    info!(name: "overlay.started", "Overlay running, Ctrl-C to stop");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(name: "overlay.signal_failed", error = %e, "Failed to wait for shutdown signal");
    }

    info!(name: "overlay.stopping", "Shutting down");
    feed_handle.stop();
    alerts_handle.stop();
    if let Some(handle) = &status_handle {
        handle.stop();
    }
}
