//! clsync Conflict - Sidecar handling
//!
//! Provides:
//! - The `.conflict.` sidecar naming convention
//! - Discovery of sidecars under the configured subset of a tree
//! - Keep-local / keep-remote resolution

pub mod error;
pub mod finder;
pub mod resolver;
pub mod sidecar;

pub use error::ConflictError;
pub use finder::{find_conflicts, ConflictFile};
pub use resolver::{resolve, resolve_batch, BatchResult, Resolution};
