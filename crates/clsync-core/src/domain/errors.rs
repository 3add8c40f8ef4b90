//! Domain error types
//!
//! Validation failures raised when constructing domain value types.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid relative path format or content
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Invalid content fingerprint (expected 64-char lowercase hex)
    #[error("Invalid hash format: {0}")]
    InvalidHash(String),
}
