//! Port definitions (traits for adapters)

pub mod blob_store;
pub mod progress;

pub use blob_store::{BlobStore, ObjectInfo, StoreError};
pub use progress::{ProgressAction, ProgressEvent, ProgressFn};
