//! age envelope encryption
//!
//! Wraps one X25519 identity/recipient pair and encrypts byte payloads in
//! the public age format (HKDF-SHA-256 file key, ChaCha20-Poly1305 over
//! fixed-size chunks). Every call to [`Encryptor::encrypt`] uses a fresh
//! ephemeral sender, so identical plaintexts produce distinct ciphertexts.

use std::io::{Read, Write};
use std::iter;
use std::path::Path;

use age::secrecy::ExposeSecret;
use age::x25519::{Identity, Recipient};
use tracing::debug;

use crate::error::{CryptoError, CryptoResult};

/// Encrypts and decrypts payloads under one age identity
pub struct Encryptor {
    identity: Identity,
    recipient: Recipient,
}

impl Encryptor {
    /// Build an encryptor from a parsed identity
    #[must_use]
    pub fn from_identity(identity: Identity) -> Self {
        let recipient = identity.to_public();
        Self {
            identity,
            recipient,
        }
    }

    /// Load the identity from a key file (one Bech32 line)
    ///
    /// # Errors
    /// `CryptoError::KeyFileMissing` when the file does not exist,
    /// `CryptoError::InvalidIdentity` when it does not parse.
    pub fn load(key_path: &Path) -> CryptoResult<Self> {
        let contents = std::fs::read_to_string(key_path).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                CryptoError::KeyFileMissing(key_path.to_path_buf())
            } else {
                CryptoError::Io(err)
            }
        })?;

        let identity: Identity = contents
            .trim()
            .parse()
            .map_err(|err: &str| CryptoError::InvalidIdentity(err.to_string()))?;

        debug!(key_path = %key_path.display(), "loaded age identity");
        Ok(Self::from_identity(identity))
    }

    /// The public recipient string (`age1...`)
    #[must_use]
    pub fn public_key(&self) -> String {
        self.recipient.to_string()
    }

    /// The identity string (`AGE-SECRET-KEY-1...`)
    #[must_use]
    pub fn identity_string(&self) -> String {
        self.identity.to_string().expose_secret().clone()
    }

    /// Encrypt `plaintext` to this encryptor's recipient
    pub fn encrypt(&self, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
        let encryptor = age::Encryptor::with_recipients(vec![Box::new(self.recipient.clone())])
            .ok_or_else(|| CryptoError::Encryption("no recipient configured".to_string()))?;

        let mut ciphertext = Vec::new();
        let mut writer = encryptor
            .wrap_output(&mut ciphertext)
            .map_err(|err| CryptoError::Encryption(err.to_string()))?;
        writer
            .write_all(plaintext)
            .map_err(|err| CryptoError::Encryption(err.to_string()))?;
        writer
            .finish()
            .map_err(|err| CryptoError::Encryption(err.to_string()))?;

        Ok(ciphertext)
    }

    /// Decrypt an age envelope with this encryptor's identity
    ///
    /// # Errors
    /// `CryptoError::Decryption` when the payload was not encrypted to this
    /// identity or fails authentication; the two cases are not
    /// distinguishable.
    pub fn decrypt(&self, ciphertext: &[u8]) -> CryptoResult<Vec<u8>> {
        let decryptor = match age::Decryptor::new(ciphertext)
            .map_err(|err| CryptoError::Decryption(err.to_string()))?
        {
            age::Decryptor::Recipients(d) => d,
            age::Decryptor::Passphrase(_) => {
                return Err(CryptoError::Decryption(
                    "payload is passphrase-encrypted, not recipient-encrypted".to_string(),
                ))
            }
        };

        let mut reader = decryptor
            .decrypt(iter::once(&self.identity as &dyn age::Identity))
            .map_err(|err| CryptoError::Decryption(err.to_string()))?;

        let mut plaintext = Vec::new();
        reader
            .read_to_end(&mut plaintext)
            .map_err(|err| CryptoError::Decryption(err.to_string()))?;

        Ok(plaintext)
    }
}

impl std::fmt::Debug for Encryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Encryptor")
            .field("recipient", &self.recipient.to_string())
            .finish_non_exhaustive()
    }
}
