//! Streaming platform identifiers.
//!
//! Raw payloads spell platforms inconsistently ("Twitch", "TikTok",
//! "tiktok"); everything downstream works with the canonical lowercase
//! form, so parsing is case-insensitive and display is always lowercase.

use serde::{Deserialize, Serialize};

/// A source platform for chat messages and event notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Twitch (chat + EventSub notifications).
    Twitch,
    /// TikTok Live.
    Tiktok,
    /// YouTube Live.
    Youtube,
    /// Anything we do not recognize; passed through, never deduped
    /// against events.
    Unknown,
}

/// Platforms that participate in low-water-mark persistence.
pub const KNOWN_PLATFORMS: [Platform; 3] =
    [Platform::Twitch, Platform::Tiktok, Platform::Youtube];

impl Platform {
    /// Parse a platform label, case-insensitively.
    ///
    /// # Example
    ///
    /// ```rust
    /// use atc_overlay::platform::Platform;
    ///
    /// assert_eq!(Platform::parse("TikTok"), Platform::Tiktok);
    /// assert_eq!(Platform::parse("mixer"), Platform::Unknown);
    /// ```
    #[must_use]
    pub fn parse(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "twitch" => Self::Twitch,
            "tiktok" => Self::Tiktok,
            "youtube" => Self::Youtube,
            _ => Self::Unknown,
        }
    }

    /// Canonical lowercase name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Twitch => "twitch",
            Self::Tiktok => "tiktok",
            Self::Youtube => "youtube",
            Self::Unknown => "unknown",
        }
    }

    /// Two-letter tag for compact status and terminal output.
    #[must_use]
    pub fn short_tag(&self) -> &'static str {
        match self {
            Self::Twitch => "tw",
            Self::Tiktok => "tk",
            Self::Youtube => "yt",
            Self::Unknown => "??",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
