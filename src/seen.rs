//! Bounded first-seen tracking for dedupe.
//!
//! Both engines answer the same question on every item: "have I already
//! shown this?". [`SeenSet`] answers it with a capacity-bounded map from
//! item key to first-seen time; the [`Remember`] trait is the seam the
//! feed engine takes so tests (or embedders with their own dedupe store)
//! can substitute the oracle.

use std::collections::HashMap;
use std::sync::Mutex;

/// Default capacity, sized for a busy stream's event volume between
/// restarts.
pub const DEFAULT_SEEN_CAPACITY: usize = 1500;

/// Dedupe oracle: `remember` returns `true` the first time an id is seen.
pub trait Remember: Send + Sync + std::fmt::Debug {
    /// Record an id, reporting whether it was new.
    fn remember(&self, id: &str) -> bool;
}

/// Capacity-bounded map from item key to first-seen wall time.
///
/// When an insert pushes the set over capacity, the oldest quarter of the
/// entries (by first-seen time, insertion order breaking ties) is evicted
/// in one sweep. Evicted ids can therefore be reported as new a second
/// time; the cap trades that for bounded memory.
#[derive(Debug)]
pub struct SeenSet {
    inner: Mutex<SeenInner>,
    capacity: usize,
}

#[derive(Debug, Default)]
struct SeenInner {
    /// key -> (first seen ms, insertion sequence).
    entries: HashMap<String, (i64, u64)>,
    next_seq: u64,
}

impl Default for SeenSet {
    fn default() -> Self {
        Self::new(DEFAULT_SEEN_CAPACITY)
    }
}

impl SeenSet {
    /// Create a set evicting once `capacity` is exceeded.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(SeenInner::default()),
            capacity: capacity.max(1),
        }
    }

    /// Record a key at the current wall time; `true` means it was new.
    pub fn remember(&self, key: &str) -> bool {
        self.remember_at(key, chrono::Utc::now().timestamp_millis())
    }

    /// Record a key with an explicit first-seen time.
    pub fn remember_at(&self, key: &str, now_ms: i64) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.entries.contains_key(key) {
            return false;
        }
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.entries.insert(key.to_string(), (now_ms, seq));
        if inner.entries.len() > self.capacity {
            Self::evict_oldest(&mut inner);
        }
        true
    }

    /// Number of keys currently tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    /// True when no keys are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget everything.
    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.entries.clear();
    }

    /// Drop the oldest quarter of the entries.
    fn evict_oldest(inner: &mut SeenInner) {
        let evict = inner.entries.len().div_ceil(4);
        let mut order: Vec<(i64, u64, String)> = inner
            .entries
            .iter()
            .map(|(key, &(ms, seq))| (ms, seq, key.clone()))
            .collect();
        order.sort_unstable();
        for (_, _, key) in order.into_iter().take(evict) {
            inner.entries.remove(&key);
        }
    }
}

impl Remember for SeenSet {
    fn remember(&self, id: &str) -> bool {
        SeenSet::remember(self, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_remember_is_new() {
        let seen = SeenSet::new(10);
        assert!(seen.remember("a"));
        assert!(!seen.remember("a"));
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn test_eviction_drops_oldest_quarter() {
        let seen = SeenSet::new(4);
        seen.remember_at("a", 100);
        seen.remember_at("b", 200);
        seen.remember_at("c", 300);
        seen.remember_at("d", 400);
        // Fifth insert crosses the cap; ceil(5/4) = 2 oldest go.
        seen.remember_at("e", 500);
        assert_eq!(seen.len(), 3);
        assert!(seen.remember_at("a", 600), "evicted key reads as new");
        assert!(!seen.remember_at("d", 600));
        assert!(!seen.remember_at("e", 600));
    }

    #[test]
    fn test_eviction_ties_break_by_insertion_order() {
        let seen = SeenSet::new(4);
        for key in ["a", "b", "c", "d", "e"] {
            seen.remember_at(key, 100);
        }
        // All share one timestamp, so the two earliest inserts go.
        assert!(seen.remember_at("a", 200));
        assert!(seen.remember_at("b", 200));
    }

    #[test]
    fn test_clear_forgets() {
        let seen = SeenSet::new(10);
        seen.remember("a");
        seen.clear();
        assert!(seen.is_empty());
        assert!(seen.remember("a"));
    }
}
