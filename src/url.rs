//! Sanity check for pasted links.

use once_cell::sync::Lazy;
use regex::Regex;

// Optional scheme, optional "www.", one of the accepted hosts, then any non-empty path.
static MEDIA_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(https?://)?(www\.)?(youtube\.com|youtu\.be)/.+$")
        .expect("media URL pattern is valid")
});

/// Returns true when `s` looks like a link to one of the supported video hosts.
///
/// This only gates the Download button; the extractor does the real resolution.
pub fn is_valid_media_url(s: &str) -> bool {
    MEDIA_URL.is_match(s)
}
