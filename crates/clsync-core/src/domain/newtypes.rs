//! Domain newtypes with validation
//!
//! Strongly-typed wrappers for the values the engine passes around.
//! Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// Suffix appended to a relative path to form its bucket key.
///
/// Remote keys not carrying this suffix are ignored by the engine.
pub const ENVELOPE_SUFFIX: &str = ".age";

// ============================================================================
// RelPath
// ============================================================================

/// A forward-slash relative path rooted at the working tree
///
/// `RelPath` is both the primary key of the state file and (with
/// [`ENVELOPE_SUFFIX`] appended) the bucket key, so it always uses `/`
/// as separator regardless of the host platform. Validation rejects:
/// - empty paths and empty segments (leading/trailing/double slashes)
/// - `.` and `..` segments
/// - backslashes (host separators never appear in keys)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RelPath(String);

impl RelPath {
    /// Create a new `RelPath`
    ///
    /// # Errors
    /// Returns `DomainError::InvalidPath` if the path is empty, absolute,
    /// contains empty or dot segments, or contains a backslash.
    pub fn new(path: impl Into<String>) -> Result<Self, DomainError> {
        let path = path.into();

        if path.is_empty() {
            return Err(DomainError::InvalidPath("path cannot be empty".to_string()));
        }
        if path.contains('\\') {
            return Err(DomainError::InvalidPath(format!(
                "path must use forward slashes: {path}"
            )));
        }
        for segment in path.split('/') {
            match segment {
                "" => {
                    return Err(DomainError::InvalidPath(format!(
                        "path contains an empty segment: {path}"
                    )))
                }
                "." | ".." => {
                    return Err(DomainError::InvalidPath(format!(
                        "path contains a dot segment: {path}"
                    )))
                }
                _ => {}
            }
        }

        Ok(Self(path))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The last path segment
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Resolve this relative path beneath a filesystem root
    #[must_use]
    pub fn to_path(&self, root: &Path) -> PathBuf {
        let mut full = root.to_path_buf();
        for segment in self.0.split('/') {
            full.push(segment);
        }
        full
    }

    /// The bucket key for this path (`<path>.age`)
    #[must_use]
    pub fn remote_key(&self) -> String {
        format!("{}{ENVELOPE_SUFFIX}", self.0)
    }

    /// Derive the logical path from a bucket key by stripping the envelope
    /// suffix. Returns `None` for keys without the suffix or keys that do
    /// not form a valid relative path; both are ignored by the engine.
    #[must_use]
    pub fn from_remote_key(key: &str) -> Option<Self> {
        let stripped = key.strip_suffix(ENVELOPE_SUFFIX)?;
        Self::new(stripped).ok()
    }
}

impl Display for RelPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RelPath {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for RelPath {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RelPath> for String {
    fn from(path: RelPath) -> Self {
        path.0
    }
}

// ============================================================================
// ContentHash
// ============================================================================

/// SHA-256 content fingerprint in lowercase hex
///
/// Used only for equality comparison during change detection, never for
/// security decisions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentHash(String);

impl ContentHash {
    /// Length of a SHA-256 digest in hex characters
    const HEX_LEN: usize = 64;

    /// Create a new `ContentHash`
    ///
    /// # Errors
    /// Returns `DomainError::InvalidHash` if the string is not 64 characters
    /// of lowercase hex.
    pub fn new(hash: impl Into<String>) -> Result<Self, DomainError> {
        let hash = hash.into();

        if hash.len() != Self::HEX_LEN {
            return Err(DomainError::InvalidHash(format!(
                "expected {} hex characters, got {}",
                Self::HEX_LEN,
                hash.len()
            )));
        }
        if !hash
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        {
            return Err(DomainError::InvalidHash(format!(
                "not lowercase hex: {hash}"
            )));
        }

        Ok(Self(hash))
    }

    /// Encode a raw SHA-256 digest as a fingerprint
    #[must_use]
    pub fn from_digest(digest: [u8; 32]) -> Self {
        let mut hex = String::with_capacity(Self::HEX_LEN);
        for byte in digest {
            hex.push_str(&format!("{byte:02x}"));
        }
        Self(hex)
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ContentHash {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ContentHash {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ContentHash> for String {
    fn from(hash: ContentHash) -> Self {
        hash.0
    }
}

// ============================================================================
// Tests
// ============================================================================
