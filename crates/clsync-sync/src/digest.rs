//! Content fingerprinting
//!
//! SHA-256 over the full file bytes, rendered as lowercase hex. Files are
//! hashed in fixed-size chunks so memory stays bounded regardless of file
//! size. Fingerprints are compared for equality only; they carry no
//! security meaning.

use std::io;
use std::path::Path;

use clsync_core::domain::ContentHash;
use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;

const READ_BUF_SIZE: usize = 64 * 1024;

/// Fingerprint the file at `path`
pub async fn hash_file(path: &Path) -> io::Result<ContentHash> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; READ_BUF_SIZE];

    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(ContentHash::from_digest(hasher.finalize().into()))
}

/// Fingerprint an in-memory byte slice
#[must_use]
pub fn hash_bytes(data: &[u8]) -> ContentHash {
    ContentHash::from_digest(Sha256::digest(data).into())
}
