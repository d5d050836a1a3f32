//! ATC Stream Overlay
//!
//! Companion process for an air-traffic-themed livestream overlay: it
//! polls a local bridge for chat and viewer events, reconciles them into
//! one merged feed, and sequences themed alert playback.
//!
//! # Architecture
//!
//! - **Feed**: merged chat/event reconciler with Twitch echo suppression
//! - **Alerts**: polled event ingestion, dedupe, themed mapping, serial playback
//! - **Schema**: versioned prioritized-field-list extraction from raw payloads
//! - **Scheduler**: cancellable repeating tasks driving both loops
//!
//! # Modules
//!
//! - [`feed`]: the merged feed engine
//! - [`alerts`]: the alert sequencer and playback FSM
//! - [`schema`]: payload field maps and normalization
//! - [`http`]: JSON polling over reqwest

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::implicit_hasher)]
#![allow(clippy::assigning_clones)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::default_trait_access)]
#![allow(clippy::unused_async)]

pub mod alerts;
pub mod config;
pub mod error;
pub mod feed;
pub mod http;
pub mod item;
pub mod platform;
pub mod scheduler;
pub mod schema;
pub mod seen;

pub use error::OverlayError;
pub use item::NormalizedItem;
pub use platform::Platform;
