//! Raw event to themed alert translation.
//!
//! Every platform event becomes an [`AlertRecord`] with an ATC-flavored
//! `kind` label and message. The table is small and deliberate; anything
//! it does not recognize falls through with its raw type and message so
//! new event kinds still show up on stream instead of vanishing.

use serde::Serialize;
use serde_json::Value;

use crate::platform::Platform;
use crate::schema::SchemaMap;

use super::callsign::callsign_from_user;

/// A queued on-stream alert, ready to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertRecord {
    /// Originating platform.
    pub platform: Platform,
    /// Themed label ("HOLDING", "DELAY", ...).
    pub kind: String,
    /// Deterministic pseudonym for the viewer.
    pub callsign: String,
    /// Raw viewer display name; may be empty.
    pub user: String,
    /// Display message.
    pub message: String,
    /// Event time in milliseconds since epoch; 0 when unknown.
    pub ts_ms: i64,
}

impl AlertRecord {
    /// True when the event identified no viewer at all.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.user.is_empty() && self.callsign.is_empty()
    }
}

/// Dedupe key for a raw event: the source id when present, the payload
/// fields otherwise. A zero or missing timestamp renders as an empty
/// segment so retransmits without times still collapse.
#[must_use]
pub fn event_key(schema: &SchemaMap, raw: &Value) -> String {
    if let Some(id) = schema.id.string_of(raw) {
        return format!("id:{id}");
    }
    let platform = raw_platform(schema, raw);
    let kind = schema.kind.string_of(raw).unwrap_or_default().to_lowercase();
    let user = schema.user.string_of(raw).unwrap_or_default();
    let message = schema.text.string_of(raw).unwrap_or_default();
    let ts = schema
        .ts_ms
        .int_of(raw)
        .filter(|&ts| ts != 0)
        .map(|ts| ts.to_string())
        .unwrap_or_default();
    format!("k:{platform}|{kind}|{user}|{message}|{ts}")
}

/// Platform of a raw event, from its own payload.
#[must_use]
pub fn raw_platform(schema: &SchemaMap, raw: &Value) -> Platform {
    schema
        .platform
        .string_of(raw)
        .map_or(Platform::Unknown, |label| Platform::parse(&label))
}

/// Translate a raw event into a themed [`AlertRecord`].
#[must_use]
pub fn map_event(schema: &SchemaMap, raw: &Value) -> AlertRecord {
    let platform = raw_platform(schema, raw);
    let kind_raw = schema.kind.string_of(raw).unwrap_or_default();
    let kind_low = kind_raw.to_lowercase();

    let (kind, mut message): (String, String) = match (platform, kind_low.as_str()) {
        (Platform::Twitch, "channel.follow") => (
            "HOLDING".into(),
            "Enter the hold, delay undetermined.".into(),
        ),
        (Platform::Twitch, "channel.subscribe") => (
            "HOLDING CANCELLED".into(),
            "Your hold is cancelled, expect vectors!".into(),
        ),
        (Platform::Twitch, "channel.subscription.message") => {
            let months = schema.months.int_of(raw).unwrap_or(0);
            let resub_text = schema.resub_text.string_of(raw).unwrap_or_default();
            let resub_text = resub_text.trim();
            let mut message = if months > 0 {
                format!("resubbed for {months} months in a row!")
            } else {
                "resubbed!".to_string()
            };
            if !resub_text.is_empty() {
                message.push(' ');
                message.push_str(resub_text);
            }
            ("RESUB".into(), message)
        }
        (Platform::Twitch, gifted) if gifted.contains("gift") => (
            "HOLD EMPTIED".into(),
            "No delay, expect vectors!".into(),
        ),
        (Platform::Twitch, "channel.cheer") => {
            let bits = schema.bits.int_of(raw).unwrap_or(0);
            let message = if bits > 0 {
                format!("{bits} minutes of delay added.")
            } else {
                "The delay has increased.".to_string()
            };
            ("DELAY".into(), message)
        }
        (Platform::Tiktok, "follow") => (
            "HOLDING".into(),
            "Enter the hold, delay undetermined.".into(),
        ),
        (Platform::Tiktok, "gift") => (
            "DESCEND".into(),
            "Expected delay has been reduced.".into(),
        ),
        (Platform::Youtube, "subscribe") => (
            "HOLDING".into(),
            "Enter the hold, delay undetermined.".into(),
        ),
        (Platform::Youtube, "membership") => (
            "HOLDING CANCELLED".into(),
            "Your hold is cancelled, expect vectors!".into(),
        ),
        _ => {
            let kind = if kind_raw.is_empty() {
                "EVENT".to_string()
            } else {
                kind_raw.clone()
            };
            (kind, schema.text.string_of(raw).unwrap_or_default())
        }
    };

    // A viewer-authored message beats the canned phrase, except the bare
    // "followed"/"subscribed" bridges echo for every event, and except the
    // resub line, which already embeds the viewer's text.
    let is_resub = platform == Platform::Twitch && kind_low == "channel.subscription.message";
    let raw_message = schema.text.string_of(raw).unwrap_or_default();
    let raw_message = raw_message.trim();
    if !raw_message.is_empty() && !is_resub {
        let low = raw_message.to_lowercase();
        if low != "followed" && low != "subscribed" && message != raw_message {
            message = raw_message.to_string();
        }
    }

    let user = schema.user.string_of(raw).unwrap_or_default();
    AlertRecord {
        platform,
        kind,
        callsign: callsign_from_user(&user),
        user,
        message,
        ts_ms: schema.ts_ms.int_of(raw).unwrap_or(0),
    }
}
