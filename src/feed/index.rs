//! Tick-local index of event items for chat suppression.
//!
//! Twitch cross-posts notifications into chat ("thanks for following!"
//! arrives both as an EventSub event and as a chat line from the bot).
//! Each tick builds an index of that tick's events keyed by
//! `platform|user|text`; a chat line whose key matches an event within the
//! dedupe window is the cross-post and gets dropped.

use std::collections::HashMap;

use crate::item::NormalizedItem;
use crate::platform::Platform;

/// Sorted timestamps of this tick's events, keyed by lowercased
/// `platform|user|text`.
#[derive(Debug, Default)]
pub struct EventIndex {
    by_key: HashMap<String, Vec<i64>>,
}

impl EventIndex {
    /// Index one tick's normalized events.
    #[must_use]
    pub fn build(events: &[NormalizedItem]) -> Self {
        let mut by_key: HashMap<String, Vec<i64>> = HashMap::new();
        for event in events {
            by_key
                .entry(Self::key(event.platform, &event.user, &event.text))
                .or_default()
                .push(event.ts_ms);
        }
        for ts_list in by_key.values_mut() {
            ts_list.sort_unstable();
        }
        Self { by_key }
    }

    fn key(platform: Platform, user: &str, text: &str) -> String {
        format!("{platform}|{}|{}", user.to_lowercase(), text.to_lowercase())
    }

    /// Is there an event with this key within `window_ms` of `ts_ms`?
    #[must_use]
    pub fn has_near(
        &self,
        platform: Platform,
        user: &str,
        text: &str,
        ts_ms: i64,
        window_ms: i64,
    ) -> bool {
        let Some(ts_list) = self.by_key.get(&Self::key(platform, user, text)) else {
            return false;
        };
        let min = ts_ms.saturating_sub(window_ms);
        let max = ts_ms.saturating_add(window_ms);
        let idx = ts_list.partition_point(|&ts| ts < min);
        idx < ts_list.len() && ts_list[idx] <= max
    }

    /// Should this chat line be suppressed as a cross-posted event?
    ///
    /// Only plain Twitch chat lines are candidates; events and other
    /// platforms always pass through.
    #[must_use]
    pub fn suppresses(&self, item: &NormalizedItem, window_ms: i64) -> bool {
        if item.is_event || item.platform != Platform::Twitch {
            return false;
        }
        self.has_near(item.platform, &item.user, &item.text, item.ts_ms, window_ms)
    }

    /// Number of distinct keys indexed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    /// True when no events were indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(platform: Platform, user: &str, text: &str, ts_ms: i64) -> NormalizedItem {
        NormalizedItem {
            platform,
            user: user.to_string(),
            text: text.to_string(),
            ts_ms,
            is_event: true,
            id: None,
        }
    }

    fn chat(platform: Platform, user: &str, text: &str, ts_ms: i64) -> NormalizedItem {
        NormalizedItem {
            is_event: false,
            ..event(platform, user, text, ts_ms)
        }
    }

    #[test]
    fn test_has_near_inside_window() {
        let index = EventIndex::build(&[event(Platform::Twitch, "alice", "followed", 1200)]);
        assert!(index.has_near(Platform::Twitch, "alice", "followed", 1000, 5000));
        assert!(index.has_near(Platform::Twitch, "alice", "followed", 6200, 5000));
        assert!(!index.has_near(Platform::Twitch, "alice", "followed", 6201, 5000));
        assert!(!index.has_near(Platform::Twitch, "alice", "followed", -3801, 5000));
    }

    #[test]
    fn test_has_near_key_is_case_insensitive() {
        let index = EventIndex::build(&[event(Platform::Twitch, "Alice", "Thanks!", 1000)]);
        assert!(index.has_near(Platform::Twitch, "alice", "thanks!", 1000, 100));
    }

    #[test]
    fn test_has_near_distinguishes_users() {
        let index = EventIndex::build(&[event(Platform::Twitch, "alice", "followed", 1000)]);
        assert!(!index.has_near(Platform::Twitch, "bob", "followed", 1000, 5000));
    }

    #[test]
    fn test_suppresses_only_twitch_chat() {
        let index = EventIndex::build(&[
            event(Platform::Twitch, "alice", "thanks for following!", 1200),
            event(Platform::Tiktok, "alice", "thanks for following!", 1200),
        ]);
        let twitch_chat = chat(Platform::Twitch, "alice", "thanks for following!", 1000);
        let tiktok_chat = chat(Platform::Tiktok, "alice", "thanks for following!", 1000);
        assert!(index.suppresses(&twitch_chat, 5000));
        assert!(!index.suppresses(&tiktok_chat, 5000));
    }

    #[test]
    fn test_suppresses_never_drops_events() {
        let index = EventIndex::build(&[event(Platform::Twitch, "alice", "followed", 1000)]);
        let twitch_event = event(Platform::Twitch, "alice", "followed", 1000);
        assert!(!index.suppresses(&twitch_event, 5000));
    }

    #[test]
    fn test_empty_index() {
        let index = EventIndex::build(&[]);
        assert!(index.is_empty());
        assert_eq!(index.len(), 0);
        assert!(!index.has_near(Platform::Twitch, "a", "b", 0, 5000));
    }
}
