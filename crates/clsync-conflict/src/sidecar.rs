//! Sidecar naming convention
//!
//! A conflict sidecar sits next to its original file as
//! `<name>.conflict.<YYYYMMDD-HHMMSS>`. The dot-separated `.conflict.`
//! token is what the tree walker keys off to skip sidecars, so it must
//! stay intact in every generated name. Two conflicts on one file in the
//! same second produce the same name; the later write wins.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Token that marks a file name as a conflict sidecar
pub const SIDECAR_TOKEN: &str = ".conflict.";

/// Timestamp layout used in sidecar and backup names
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Build the sidecar name for `original` at instant `at`
///
/// `original` may be a bare file name or a slash-separated relative path;
/// the suffix is appended either way.
#[must_use]
pub fn sidecar_name(original: &str, at: DateTime<Utc>) -> String {
    format!(
        "{original}{SIDECAR_TOKEN}{}",
        at.format(TIMESTAMP_FORMAT)
    )
}

/// Whether `name` is a conflict sidecar
#[must_use]
pub fn is_sidecar(name: &str) -> bool {
    name.contains(SIDECAR_TOKEN)
}

/// A sidecar name split back into its parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSidecar {
    /// The original file name (or relative path) the sidecar shadows
    pub original: String,
    /// The conflict instant, when the suffix parses as a timestamp
    pub timestamp: Option<DateTime<Utc>>,
}

/// Parse a sidecar name into the original name and conflict instant
///
/// Splits at the last `.conflict.` occurrence so originals whose own name
/// contains the token still resolve to the outermost sidecar. Returns
/// `None` when `name` carries no token.
#[must_use]
pub fn parse_sidecar(name: &str) -> Option<ParsedSidecar> {
    let idx = name.rfind(SIDECAR_TOKEN)?;
    let original = name[..idx].to_string();
    let suffix = &name[idx + SIDECAR_TOKEN.len()..];

    let timestamp = NaiveDateTime::parse_from_str(suffix, TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc());

    Some(ParsedSidecar {
        original,
        timestamp,
    })
}
