//! Error types for the encryption layer.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur in cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The identity file does not exist.
    #[error("encryption key not found at {}", .0.display())]
    KeyFileMissing(PathBuf),

    /// The identity file or string is not a valid age identity.
    #[error("invalid age identity: {0}")]
    InvalidIdentity(String),

    /// Argon2 key derivation failed.
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// Envelope creation failed.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// The payload was not encrypted to this identity, or was tampered
    /// with or truncated. Callers cannot tell the cases apart.
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// The passphrase is too short to derive a key from.
    #[error("passphrase must be at least 8 characters")]
    WeakPassphrase,

    /// Local filesystem failure while handling key material.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
