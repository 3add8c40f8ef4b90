//! Engine error types
//!
//! The kinds a caller can observe from engine operations. Per-file
//! failures inside push/pull are collected into the operation's result
//! instead of aborting it; only errors that prevent progress (listing the
//! bucket, reading state or the identity) surface as a failed operation.

use clsync_core::domain::RelPath;
use clsync_core::ports::StoreError;
use clsync_crypto::CryptoError;
use thiserror::Error;

/// Errors surfaced by engine operations
#[derive(Debug, Error)]
pub enum SyncError {
    /// Expected configuration or identity file is absent
    #[error("configuration missing: {0}")]
    ConfigMissing(String),

    /// A specific remote object could not be decrypted with the current
    /// identity
    #[error("cannot decrypt remote object: {0}")]
    KeyDecrypt(String),

    /// The probe determined the bucket was written by a different identity
    #[error("encryption key does not match the remote bucket")]
    KeyMismatch,

    /// Transport failure against the bucket
    #[error("network error: {0}")]
    Network(String),

    /// The bucket rejected the configured credentials
    #[error("authentication rejected: {0}")]
    Auth(String),

    /// Local filesystem failure
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A decrypted payload failed authentication or was truncated
    #[error("integrity failure: {0}")]
    Integrity(String),

    /// The cancellation token fired
    #[error("operation cancelled")]
    Cancelled,

    /// Anything else
    #[error("{0}")]
    Other(String),
}

impl From<StoreError> for SyncError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Network(msg) => Self::Network(msg),
            StoreError::Auth(msg) => Self::Auth(msg),
            StoreError::BucketMissing(msg) => Self::Other(format!("bucket not found: {msg}")),
            StoreError::KeyMissing(msg) => Self::Other(format!("no such key: {msg}")),
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<CryptoError> for SyncError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::KeyFileMissing(path) => {
                Self::ConfigMissing(format!("encryption key not found at {}", path.display()))
            }
            CryptoError::Decryption(msg) => Self::KeyDecrypt(msg),
            CryptoError::Io(err) => Self::Io(err),
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<clsync_core::domain::DomainError> for SyncError {
    fn from(err: clsync_core::domain::DomainError) -> Self {
        Self::Other(err.to_string())
    }
}

/// A per-file failure collected into an operation result
#[derive(Debug)]
pub struct FileError {
    pub path: RelPath,
    pub error: SyncError,
}

impl std::fmt::Display for FileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.error)
    }
}
