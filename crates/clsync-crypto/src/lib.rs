//! clsync Crypto - Envelope encryption and key material
//!
//! Provides:
//! - age (X25519) authenticated encryption of arbitrary byte payloads
//! - Identity generation and deterministic passphrase derivation
//! - Key file I/O with owner-only permissions

pub mod encryptor;
pub mod error;
pub mod key;

pub use encryptor::Encryptor;
pub use error::{CryptoError, CryptoResult};
pub use key::{
    derive_identity, generate_identity, key_exists, validate_passphrase, write_key_file,
    MIN_PASSPHRASE_LEN,
};

/// The X25519 identity type the envelope operates on, re-exported so
/// hosts can hold one without depending on `age` directly.
pub use age::x25519::Identity as X25519Identity;
