//! clsync Sync - Encrypted push/pull engine
//!
//! Provides:
//! - Content-addressed local change detection
//! - Push (read → encrypt → upload) and pull (download → decrypt → write)
//!   against an abstract blob store
//! - Conflict detection with sidecar materialization
//! - Pull preview, key-match probe, and backup snapshots
//! - The per-device persistent state that makes all of it deterministic

pub mod backup;
pub mod detector;
pub mod digest;
pub mod engine;
pub mod error;
pub mod state;
pub mod walker;

pub use detector::{Change, ChangeKind};
pub use engine::{
    DiffEntry, DiffStatus, KeyProbe, PreviewEntry, PullPreview, PullResult, PushResult, SyncEngine,
};
pub use error::{FileError, SyncError};
pub use state::{FileState, SyncState};
pub use walker::FileMeta;
