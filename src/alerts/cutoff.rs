//! Persisted per-platform low-water-marks.
//!
//! The alert endpoints answer every poll with their full recent buffer, so
//! a fresh process would replay minutes of old events as if they just
//! happened. The store keeps one "last accepted timestamp" per platform in
//! a small JSON file; on the very first run (no stored state for any known
//! platform) every known platform is initialized to boot time so the
//! pre-existing buffer is never replayed.
//!
//! Storage trouble is never fatal. An unreadable file starts fresh, an
//! unwritable one degrades the marks to process-lifetime memory, both with
//! a logged warning.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::OverlayError;
use crate::platform::{KNOWN_PLATFORMS, Platform};

/// Per-platform last-accepted timestamps, write-through to a JSON file.
#[derive(Debug)]
pub struct CutoffStore {
    path: PathBuf,
    marks: Mutex<HashMap<Platform, i64>>,
}

impl CutoffStore {
    /// Open the store backed by `path`.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::open_at(path, chrono::Utc::now().timestamp_millis())
    }

    /// Open with an explicit boot time, for tests.
    #[must_use]
    pub fn open_at(path: impl Into<PathBuf>, boot_ms: i64) -> Self {
        let path = path.into();
        let mut marks = match Self::load(&path) {
            Ok(marks) => marks,
            Err(err) => {
                tracing::warn!(
                    name: "alerts.cutoff.load_failed",
                    path = %path.display(),
                    error = %err,
                    "Cutoff state unreadable, starting fresh"
                );
                HashMap::new()
            }
        };

        let first_run = !KNOWN_PLATFORMS.iter().any(|p| marks.contains_key(p));
        if first_run {
            for platform in KNOWN_PLATFORMS {
                marks.insert(platform, boot_ms);
            }
        }

        let store = Self {
            path,
            marks: Mutex::new(marks),
        };
        if first_run {
            store.persist();
        }
        store
    }

    /// May this event pass the time gate?
    ///
    /// A positively-timestamped event at or below the platform's stored
    /// mark has been processed before. Events without a usable timestamp
    /// always pass; identity dedupe is their only gate.
    #[must_use]
    pub fn should_accept(&self, platform: Platform, ts_ms: i64) -> bool {
        if ts_ms <= 0 {
            return true;
        }
        let cutoff = self.current(platform);
        cutoff == 0 || ts_ms > cutoff
    }

    /// Advance the platform's mark, monotonically. Persists on change.
    pub fn mark_accepted(&self, platform: Platform, ts_ms: i64) {
        if ts_ms <= 0 {
            return;
        }
        let advanced = {
            let mut marks = self.marks.lock().unwrap();
            let entry = marks.entry(platform).or_insert(0);
            if ts_ms > *entry {
                *entry = ts_ms;
                true
            } else {
                false
            }
        };
        if advanced {
            self.persist();
        }
    }

    /// Current mark for a platform, 0 when none is stored.
    #[must_use]
    pub fn current(&self, platform: Platform) -> i64 {
        self.marks
            .lock()
            .unwrap()
            .get(&platform)
            .copied()
            .unwrap_or(0)
    }

    fn load(path: &Path) -> Result<HashMap<Platform, i64>, OverlayError> {
        if !path.exists() {
            return Ok(HashMap::new());
        }
        let raw = std::fs::read_to_string(path)?;
        let by_label: HashMap<String, i64> = serde_json::from_str(&raw)?;
        let mut marks: HashMap<Platform, i64> = HashMap::new();
        for (label, ts) in by_label {
            // Unrecognized labels collapse into one bucket; keep the max.
            let entry = marks.entry(Platform::parse(&label)).or_insert(ts);
            *entry = (*entry).max(ts);
        }
        Ok(marks)
    }

    fn persist(&self) {
        let snapshot: HashMap<&'static str, i64> = {
            let marks = self.marks.lock().unwrap();
            marks.iter().map(|(p, &ts)| (p.as_str(), ts)).collect()
        };
        if let Err(err) = self.write_snapshot(&snapshot) {
            tracing::warn!(
                name: "alerts.cutoff.persist_failed",
                path = %self.path.display(),
                error = %err,
                "Cutoff state not persisted"
            );
        }
    }

    fn write_snapshot(&self, snapshot: &HashMap<&str, i64>) -> Result<(), OverlayError> {
        let body = serde_json::to_string_pretty(snapshot)?;
        std::fs::write(&self.path, body)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_first_run_initializes_known_platforms_to_boot() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cutoffs.json");
        let store = CutoffStore::open_at(&path, 10_000);

        for platform in KNOWN_PLATFORMS {
            assert_eq!(store.current(platform), 10_000);
        }
        assert!(path.exists(), "first run persists immediately");
        // An event from before boot is never replayed.
        assert!(!store.should_accept(Platform::Twitch, 9_999));
        assert!(store.should_accept(Platform::Twitch, 10_001));
    }

    #[test]
    fn test_reopen_does_not_reinitialize() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cutoffs.json");
        {
            let store = CutoffStore::open_at(&path, 10_000);
            store.mark_accepted(Platform::Twitch, 50_000);
        }
        let store = CutoffStore::open_at(&path, 99_999);
        assert_eq!(store.current(Platform::Twitch), 50_000);
        assert_eq!(store.current(Platform::Tiktok), 10_000);
    }

    #[test]
    fn test_marks_advance_monotonically() {
        let dir = tempdir().unwrap();
        let store = CutoffStore::open_at(dir.path().join("cutoffs.json"), 0);

        store.mark_accepted(Platform::Twitch, 100);
        store.mark_accepted(Platform::Twitch, 50);
        store.mark_accepted(Platform::Twitch, 200);
        assert_eq!(store.current(Platform::Twitch), 200);
        assert!(!store.should_accept(Platform::Twitch, 150));
        assert!(!store.should_accept(Platform::Twitch, 200));
        assert!(store.should_accept(Platform::Twitch, 201));
    }

    #[test]
    fn test_partial_state_counts_as_initialized() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cutoffs.json");
        std::fs::write(&path, r#"{"twitch": 42}"#).unwrap();

        let store = CutoffStore::open_at(&path, 10_000);
        assert_eq!(store.current(Platform::Twitch), 42);
        // Not a first run, so other platforms stay ungated.
        assert_eq!(store.current(Platform::Tiktok), 0);
        assert!(store.should_accept(Platform::Tiktok, 1));
    }

    #[test]
    fn test_timestampless_events_bypass_gate() {
        let dir = tempdir().unwrap();
        let store = CutoffStore::open_at(dir.path().join("cutoffs.json"), 10_000);
        assert!(store.should_accept(Platform::Twitch, 0));
        assert!(store.should_accept(Platform::Twitch, -5));
        // And never move the mark.
        store.mark_accepted(Platform::Twitch, 0);
        assert_eq!(store.current(Platform::Twitch), 10_000);
    }

    #[test]
    fn test_corrupt_state_starts_fresh() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cutoffs.json");
        std::fs::write(&path, "not json {").unwrap();

        let store = CutoffStore::open_at(&path, 7_000);
        assert_eq!(store.current(Platform::Twitch), 7_000);
    }

    #[test]
    fn test_unknown_labels_collapse_to_max() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cutoffs.json");
        std::fs::write(&path, r#"{"twitch": 5, "mixer": 30, "dlive": 90}"#).unwrap();

        let store = CutoffStore::open_at(&path, 10_000);
        assert_eq!(store.current(Platform::Unknown), 90);
        assert_eq!(store.current(Platform::Twitch), 5);
    }

    #[test]
    fn test_unwritable_path_degrades_to_memory() {
        let store = CutoffStore::open_at("/nonexistent-dir/cutoffs.json", 10_000);
        store.mark_accepted(Platform::Twitch, 20_000);
        assert_eq!(store.current(Platform::Twitch), 20_000);
        assert!(!store.should_accept(Platform::Twitch, 15_000));
    }
}
