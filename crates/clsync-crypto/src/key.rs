//! Identity generation, passphrase derivation, and key file I/O
//!
//! The passphrase derivation must be deterministic: every device
//! that knows the passphrase derives the same X25519 identity, so no key
//! file ever has to be copied between machines. The salt is therefore a
//! fixed protocol constant; dictionary resistance comes from the Argon2id
//! cost parameters and passphrase quality, not from salt entropy. A random
//! salt here would break cross-device key agreement.

use std::io::Write;
use std::path::Path;

use age::secrecy::ExposeSecret;
use age::x25519::Identity;
use argon2::{Algorithm, Argon2, Params, Version};
use bech32::{ToBase32, Variant};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{CryptoError, CryptoResult};

/// Minimum accepted passphrase length in bytes
pub const MIN_PASSPHRASE_LEN: usize = 8;

/// Label hashed into the fixed derivation salt. Shared by every device;
/// changing it is a protocol break.
const KDF_SALT_LABEL: &[u8] = b"claude-sync-v1";

/// Argon2id memory cost in KiB (64 MiB)
const ARGON2_MEMORY_KIB: u32 = 64 * 1024;

/// Argon2id iteration count
const ARGON2_ITERATIONS: u32 = 3;

/// Argon2id lane count
const ARGON2_PARALLELISM: u32 = 4;

/// Bech32 human-readable prefix of age secret keys
const IDENTITY_HRP: &str = "age-secret-key-";

/// Generate a fresh random identity
#[must_use]
pub fn generate_identity() -> Identity {
    Identity::generate()
}

/// Derive an identity deterministically from a passphrase
///
/// Same passphrase, same identity, on any device:
/// 1. `salt = SHA-256(fixed label)`
/// 2. `raw = Argon2id(passphrase, salt, 64 MiB, 3 iterations, 4 lanes)`
/// 3. clamp `raw` per Curve25519 convention
/// 4. encode as a Bech32 `age-secret-key-` string and parse it back
///
/// # Errors
/// `CryptoError::WeakPassphrase` for passphrases under
/// [`MIN_PASSPHRASE_LEN`] bytes; `CryptoError::KeyDerivation` if the KDF
/// itself fails.
pub fn derive_identity(passphrase: &str) -> CryptoResult<Identity> {
    validate_passphrase(passphrase)?;

    let salt = Sha256::digest(KDF_SALT_LABEL);

    let params = Params::new(ARGON2_MEMORY_KIB, ARGON2_ITERATIONS, ARGON2_PARALLELISM, Some(32))
        .map_err(|err| CryptoError::KeyDerivation(err.to_string()))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut scalar = [0u8; 32];
    argon2
        .hash_password_into(passphrase.as_bytes(), &salt, &mut scalar)
        .map_err(|err| CryptoError::KeyDerivation(err.to_string()))?;

    // Clamp for X25519 (RFC 7748)
    scalar[0] &= 0xf8;
    scalar[31] &= 0x7f;
    scalar[31] |= 0x40;

    let encoded = encode_identity(&scalar)?;
    encoded
        .parse::<Identity>()
        .map_err(|err: &str| CryptoError::InvalidIdentity(err.to_string()))
}

/// Encode a 32-byte scalar as an age identity string
///
/// Bech32 with the `age-secret-key-` prefix; age renders secret keys in
/// uppercase.
fn encode_identity(scalar: &[u8; 32]) -> CryptoResult<String> {
    let encoded = bech32::encode(IDENTITY_HRP, scalar.to_base32(), Variant::Bech32)
        .map_err(|err| CryptoError::KeyDerivation(err.to_string()))?;
    Ok(encoded.to_uppercase())
}

/// Write an identity to `path` as a single uppercase line, mode 0600
pub fn write_key_file(path: &Path, identity: &Identity) -> CryptoResult<()> {
    use std::os::unix::fs::OpenOptionsExt;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    writeln!(file, "{}", identity.to_string().expose_secret())?;

    debug!(path = %path.display(), "wrote age identity file");
    Ok(())
}

/// Whether a key file exists at `path`
#[must_use]
pub fn key_exists(path: &Path) -> bool {
    path.exists()
}

/// Reject passphrases shorter than [`MIN_PASSPHRASE_LEN`] bytes
pub fn validate_passphrase(passphrase: &str) -> CryptoResult<()> {
    if passphrase.len() < MIN_PASSPHRASE_LEN {
        return Err(CryptoError::WeakPassphrase);
    }
    Ok(())
}
