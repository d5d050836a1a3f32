//! The common item shape both engines operate on.
//!
//! Raw chat and event payloads arrive in whatever shape the upstream
//! platform bridge emits. Normalization (driven by [`crate::schema`])
//! flattens them into [`NormalizedItem`]. Dedupe, ordering, bounding and
//! rendering all operate on this struct and never see the raw payloads.

use serde::{Deserialize, Serialize};

use crate::platform::Platform;

/// Derived ids are capped so hostile message text cannot bloat the
/// dedupe set.
pub const MAX_ID_CHARS: usize = 512;

/// A chat message or event notification in canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedItem {
    /// Originating platform.
    pub platform: Platform,
    /// Display name of the author; may be empty.
    #[serde(default)]
    pub user: String,
    /// Message or notification text. Items without text are dropped
    /// before this struct is ever built.
    pub text: String,
    /// Milliseconds since epoch; 0 means the source supplied no time.
    #[serde(default)]
    pub ts_ms: i64,
    /// Platform notification rather than a plain chat line.
    #[serde(default)]
    pub is_event: bool,
    /// Stable identity, if the source supplied one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl NormalizedItem {
    /// Deterministic identity for items whose source supplied none.
    ///
    /// Two fetches of the same logical event produce the same id, which is
    /// what makes re-polling idempotent.
    #[must_use]
    pub fn derive_id(&self) -> String {
        let prefix = if self.is_event { "ev" } else { "ch" };
        let mut id = format!(
            "{prefix}:{}:{}:{}:{}",
            self.platform, self.user, self.ts_ms, self.text
        );
        if let Some((idx, _)) = id.char_indices().nth(MAX_ID_CHARS) {
            id.truncate(idx);
        }
        id
    }

    /// Identity used for dedupe, deriving and caching one if absent.
    pub fn ensure_id(&mut self) -> &str {
        if self.id.is_none() {
            let derived = self.derive_id();
            self.id = Some(derived);
        }
        self.id.as_deref().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chat(user: &str, text: &str, ts_ms: i64) -> NormalizedItem {
        NormalizedItem {
            platform: Platform::Twitch,
            user: user.to_string(),
            text: text.to_string(),
            ts_ms,
            is_event: false,
            id: None,
        }
    }

    #[test]
    fn test_derive_id_chat_prefix() {
        let item = chat("alice", "hello", 1234);
        assert_eq!(item.derive_id(), "ch:twitch:alice:1234:hello");
    }

    #[test]
    fn test_derive_id_event_prefix() {
        let mut item = chat("alice", "followed", 1234);
        item.is_event = true;
        assert_eq!(item.derive_id(), "ev:twitch:alice:1234:followed");
    }

    #[test]
    fn test_derive_id_zero_ts() {
        let item = chat("bob", "hi", 0);
        assert_eq!(item.derive_id(), "ch:twitch:bob:0:hi");
    }

    #[test]
    fn test_derive_id_caps_length() {
        let item = chat("bob", &"é".repeat(2000), 1);
        let id = item.derive_id();
        assert_eq!(id.chars().count(), MAX_ID_CHARS);
    }

    #[test]
    fn test_ensure_id_prefers_supplied() {
        let mut item = chat("bob", "hi", 1);
        item.id = Some("msg-42".to_string());
        assert_eq!(item.ensure_id(), "msg-42");
    }

    #[test]
    fn test_ensure_id_caches_derivation() {
        let mut item = chat("bob", "hi", 1);
        assert_eq!(item.ensure_id(), "ch:twitch:bob:1:hi");
        assert_eq!(item.id.as_deref(), Some("ch:twitch:bob:1:hi"));
    }
}
