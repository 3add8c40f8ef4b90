//! Progress event stream (driving/primary port)
//!
//! The engine emits one typed event per state transition of interest;
//! the host renders them however it likes (progress bars, logs, nothing).
//! Emission is best-effort and lossy: events are not part of any
//! operation's semantic contract.

use std::fmt::{self, Display, Formatter};

/// What kind of transition an event reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressAction {
    /// Enumerating local or remote files
    Scan,
    /// Encrypt-and-upload of one file
    Upload,
    /// Download-and-decrypt of one file
    Download,
    /// Remote delete of one key
    Delete,
    /// A conflict was detected and a sidecar is being written
    Conflict,
}

impl Display for ProgressAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Scan => "scan",
            Self::Upload => "upload",
            Self::Download => "download",
            Self::Delete => "delete",
            Self::Conflict => "conflict",
        };
        write!(f, "{name}")
    }
}

/// A single progress event
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub action: ProgressAction,
    /// Relative path or free-form description of the work item
    pub path: String,
    /// Size in bytes of the item, where known
    pub size: u64,
    /// 1-based index within the current operation
    pub current: usize,
    /// Total items in the current operation
    pub total: usize,
    /// Marks the final event of an action phase
    pub complete: bool,
    /// Per-item failure, if the transition failed
    pub error: Option<String>,
}

impl ProgressEvent {
    /// Create an event for `action` with empty detail fields
    #[must_use]
    pub fn new(action: ProgressAction) -> Self {
        Self {
            action,
            path: String::new(),
            size: 0,
            current: 0,
            total: 0,
            complete: false,
            error: None,
        }
    }

    /// Sets the path or description
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Sets the item size
    #[must_use]
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    /// Sets the position within the operation
    #[must_use]
    pub fn with_progress(mut self, current: usize, total: usize) -> Self {
        self.current = current;
        self.total = total;
        self
    }

    /// Marks the event as the end of its action phase
    #[must_use]
    pub fn completed(mut self) -> Self {
        self.complete = true;
        self
    }

    /// Attaches a per-item failure message
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Callback invoked for each progress event
pub type ProgressFn = Box<dyn Fn(&ProgressEvent) + Send + Sync>;
