//! Deterministic aviation-style callsigns for viewer names.
//!
//! Short clean names get a stable 4-digit suffix ("sky" becomes
//! "SKY8990"); everything else is squashed to at most 12 characters.
//! The same display name always yields the same callsign, so repeat
//! events from one viewer read as one aircraft.

use unicode_normalization::UnicodeNormalization;

/// 32-bit FNV-1a over the UTF-8 bytes of `input`.
#[must_use]
pub fn hash32(input: &str) -> u32 {
    let mut h: u32 = 0x811c_9dc5;
    for byte in input.as_bytes() {
        h ^= u32::from(*byte);
        h = h.wrapping_mul(0x0100_0193);
    }
    h
}

/// Derive a callsign from a viewer display name.
///
/// Diacritics are folded away (NFKD, then combining marks stripped) and
/// everything outside ASCII alphanumerics dropped. A purely alphabetic
/// result of at most six letters gets a numeric suffix in 1000..=9999
/// hashed from the original name; longer or mixed results are truncated
/// to twelve characters. Empty input maps to "UNKNOWN".
#[must_use]
pub fn callsign_from_user(user: &str) -> String {
    let raw = user.trim();
    if raw.is_empty() {
        return "UNKNOWN".to_string();
    }

    let folded: String = raw
        .nfkd()
        .filter(|c| !('\u{0300}'..='\u{036f}').contains(c))
        .collect();
    let clean: String = folded.chars().filter(char::is_ascii_alphanumeric).collect();

    let base = if clean.is_empty() {
        if folded.is_empty() { raw } else { folded.as_str() }
    } else {
        clean.as_str()
    };
    let up = base.to_uppercase();

    if !up.is_empty() && up.chars().all(|c| c.is_ascii_uppercase()) && up.chars().count() <= 6 {
        let num = (hash32(raw) % 9000) + 1000;
        return format!("{up}{num}");
    }
    up.chars().take(12).collect()
}
