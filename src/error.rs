//! Error taxonomy for the overlay engines.
//!
//! Nothing in here is fatal. Source failures degrade the affected source to
//! "empty this tick", storage failures degrade the low-water-marks to
//! in-memory only, and everything is surfaced through the engine status so a
//! debug view can show staleness.

/// Errors produced while polling, parsing, or persisting overlay state.
#[derive(Debug, thiserror::Error)]
pub enum OverlayError {
    /// Transport-level failure talking to a source endpoint.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A source answered with a body that is not valid JSON.
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Reading or writing the persisted low-water-mark file failed.
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// A caller-supplied source or sink reported a failure.
    #[error("source error: {0}")]
    Source(String),
}

impl OverlayError {
    /// Message truncated for the one-line debug surface.
    #[must_use]
    pub fn debug_message(&self) -> String {
        let full = self.to_string();
        let mut end = full.len().min(80);
        while !full.is_char_boundary(end) {
            end -= 1;
        }
        full[..end].to_string()
    }
}
