//! Data-driven field lookup for raw payloads.
//!
//! Upstream bridges disagree on field names ("user" vs "user_name" vs
//! "display_name") and drift over time. Instead of hard-coding fallback
//! chains at every read site, each logical field carries an ordered
//! candidate-key list in a [`SchemaMap`]. Schema drift then becomes a
//! config change, not a code change; the map is versioned so a config
//! file can state which revision of the defaults it was written against.
//!
//! # Example
//!
//! ```rust
//! use atc_overlay::platform::Platform;
//! use atc_overlay::schema::SchemaMap;
//!
//! let schema = SchemaMap::default();
//! let raw = serde_json::json!({"user_name": "alice", "message": "hi", "ts": 42});
//! let item = schema.normalize_item(&raw, Platform::Twitch).unwrap();
//! assert_eq!(item.user, "alice");
//! assert_eq!(item.ts_ms, 42);
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::item::NormalizedItem;
use crate::platform::Platform;

/// Ordered candidate keys for one logical field.
///
/// Lookup walks the list in order; the first key whose value is usable for
/// the requested type wins. Empty strings and nulls do not win, so a later
/// candidate can still fill the field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldSpec {
    keys: Vec<String>,
}

impl FieldSpec {
    /// Build a spec from candidate keys, highest priority first.
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// First candidate holding a non-empty string (numbers are rendered).
    #[must_use]
    pub fn string_of(&self, obj: &Value) -> Option<String> {
        for key in &self.keys {
            match obj.get(key) {
                Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
                Some(Value::Number(n)) => return Some(n.to_string()),
                _ => {}
            }
        }
        None
    }

    /// First candidate holding a representable integer.
    ///
    /// Accepts JSON numbers and numeric strings; anything else is skipped.
    #[must_use]
    pub fn int_of(&self, obj: &Value) -> Option<i64> {
        for key in &self.keys {
            match obj.get(key) {
                Some(Value::Number(n)) => {
                    if let Some(v) = n.as_i64() {
                        return Some(v);
                    }
                    if let Some(f) = n.as_f64() {
                        return Some(f as i64);
                    }
                }
                Some(Value::String(s)) => {
                    let s = s.trim();
                    if let Ok(v) = s.parse::<i64>() {
                        return Some(v);
                    }
                    if let Ok(f) = s.parse::<f64>() {
                        return Some(f as i64);
                    }
                }
                _ => {}
            }
        }
        None
    }

    /// First candidate holding a boolean (numbers count as their truthiness).
    #[must_use]
    pub fn bool_of(&self, obj: &Value) -> Option<bool> {
        for key in &self.keys {
            match obj.get(key) {
                Some(Value::Bool(b)) => return Some(*b),
                Some(Value::Number(n)) => return Some(n.as_f64().unwrap_or(0.0) != 0.0),
                _ => {}
            }
        }
        None
    }
}

/// Versioned bundle of field specs for every logical field the engines read.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaMap {
    /// Revision of the candidate-key defaults this map was written against.
    pub version: u32,
    /// Stable identity supplied by the source.
    pub id: FieldSpec,
    /// Platform label carried inside the item itself.
    pub platform: FieldSpec,
    /// Event type label ("channel.follow", "gift", ...).
    pub kind: FieldSpec,
    /// Author display name.
    pub user: FieldSpec,
    /// Message or notification text.
    pub text: FieldSpec,
    /// Milliseconds since epoch.
    pub ts_ms: FieldSpec,
    /// Marker distinguishing notifications from plain chat lines.
    pub is_event: FieldSpec,
    /// Cheer size.
    pub bits: FieldSpec,
    /// Consecutive subscription months.
    pub months: FieldSpec,
    /// Viewer-authored resubscription text.
    pub resub_text: FieldSpec,
    /// Keys under which a chat response wraps its item list.
    pub chat_list: FieldSpec,
}

impl Default for SchemaMap {
    fn default() -> Self {
        Self {
            version: 1,
            id: FieldSpec::new(["id"]),
            platform: FieldSpec::new(["platform"]),
            kind: FieldSpec::new(["type", "kind"]),
            user: FieldSpec::new(["user", "user_name", "username", "display_name", "nickname"]),
            text: FieldSpec::new(["message", "text"]),
            ts_ms: FieldSpec::new(["ts_ms", "ts", "timestamp_ms", "timestamp"]),
            is_event: FieldSpec::new(["is_event"]),
            bits: FieldSpec::new(["bits", "total_bits"]),
            months: FieldSpec::new(["cumulative_months", "months"]),
            resub_text: FieldSpec::new(["resub_message"]),
            chat_list: FieldSpec::new(["messages", "items"]),
        }
    }
}

impl SchemaMap {
    /// Flatten a raw payload into a [`NormalizedItem`].
    ///
    /// Returns `None` when no text field resolves; such items are not
    /// representable in the feed and are dropped. The platform falls back
    /// to `fallback_platform` when the payload carries none, and the
    /// `is_event` flag is preserved as the source set it (the feed engine
    /// forces it on for items fetched from an event source).
    #[must_use]
    pub fn normalize_item(
        &self,
        raw: &Value,
        fallback_platform: Platform,
    ) -> Option<NormalizedItem> {
        let text = self.text.string_of(raw)?;
        let platform = self
            .platform
            .string_of(raw)
            .map_or(fallback_platform, |s| Platform::parse(&s));
        Some(NormalizedItem {
            platform,
            user: self.user.string_of(raw).unwrap_or_default(),
            text,
            ts_ms: self.ts_ms.int_of(raw).unwrap_or(0),
            is_event: self.is_event.bool_of(raw).unwrap_or(false),
            id: self.id.string_of(raw),
        })
    }

    /// Unwrap a chat response body into its item list.
    ///
    /// A bare array is accepted as-is; otherwise the configured wrapper
    /// keys are probed in order.
    #[must_use]
    pub fn chat_items<'a>(&self, body: &'a Value) -> &'a [Value] {
        if let Some(arr) = body.as_array() {
            return arr;
        }
        for key in &self.chat_list.keys {
            if let Some(arr) = body.get(key).and_then(Value::as_array) {
                return arr;
            }
        }
        &[]
    }
}

/// Unwrap an event response body into its event list.
///
/// Bridges answer with `{"events": [...]}` or the doubly-wrapped
/// `{"events": {"events": [...]}}`; anything else reads as empty.
#[must_use]
pub fn event_list(body: &Value) -> &[Value] {
    if let Some(arr) = body.get("events").and_then(Value::as_array) {
        return arr;
    }
    if let Some(arr) = body
        .get("events")
        .and_then(|e| e.get("events"))
        .and_then(Value::as_array)
    {
        return arr;
    }
    &[]
}
