//! Error types for conflict handling

use thiserror::Error;

/// Errors that can occur while discovering or resolving conflicts
#[derive(Debug, Error)]
pub enum ConflictError {
    /// A file name does not follow the sidecar convention
    #[error("not a conflict sidecar: {0}")]
    NotASidecar(String),

    /// Local filesystem failure
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
