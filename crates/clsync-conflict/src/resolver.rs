//! Conflict resolution executor
//!
//! Applies a resolution by performing the file operations:
//! - `KeepLocal`: delete the sidecar, leaving the local file untouched
//! - `KeepRemote`: rename the sidecar over the original (atomic, same
//!   directory), so the remote version replaces the local one

use std::fmt::{self, Display, Formatter};

use tracing::{info, warn};

use crate::error::ConflictError;
use crate::finder::ConflictFile;

/// Which side of a conflict to keep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Keep the local file; discard the remote sidecar
    KeepLocal,
    /// Replace the local file with the sidecar contents
    KeepRemote,
}

impl Display for Resolution {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeepLocal => write!(f, "keep-local"),
            Self::KeepRemote => write!(f, "keep-remote"),
        }
    }
}

/// Result of a batch resolution operation
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub resolved: u32,
    pub failed: u32,
    pub errors: Vec<String>,
}

/// Apply `resolution` to a single conflict
pub async fn resolve(
    conflict: &ConflictFile,
    resolution: Resolution,
) -> Result<(), ConflictError> {
    match resolution {
        Resolution::KeepLocal => {
            tokio::fs::remove_file(&conflict.sidecar).await?;
        }
        Resolution::KeepRemote => {
            tokio::fs::rename(&conflict.sidecar, &conflict.original).await?;
        }
    }

    info!(
        original = %conflict.original.display(),
        %resolution,
        "conflict resolved"
    );
    Ok(())
}

/// Apply one resolution to every conflict, collecting per-file failures
pub async fn resolve_batch(conflicts: &[ConflictFile], resolution: Resolution) -> BatchResult {
    let mut result = BatchResult::default();

    for conflict in conflicts {
        match resolve(conflict, resolution).await {
            Ok(()) => result.resolved += 1,
            Err(err) => {
                warn!(
                    sidecar = %conflict.sidecar.display(),
                    error = %err,
                    "failed to resolve conflict"
                );
                result.failed += 1;
                result
                    .errors
                    .push(format!("{}: {err}", conflict.sidecar.display()));
            }
        }
    }

    result
}
