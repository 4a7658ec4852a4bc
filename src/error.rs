//! Error types for the blockscan library

use crate::backend::BackendError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for scanner operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by [`BlockScanner`](crate::BlockScanner) and
/// [`SharedScanner`](crate::SharedScanner).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The backend could not allocate an engine
    #[error("failed to create scanning engine: {0}")]
    Construction(BackendError),

    /// Compile or scan was called after the engine was disposed
    #[error("cannot {operation}: scanning engine has been disposed")]
    Disposed {
        /// Name of the rejected operation
        operation: &'static str,
    },

    /// Scan was called while no database is active
    #[error("no block database has been compiled for this engine")]
    NotCompiled,

    /// The backend rejected the pattern file
    #[error("failed to compile {}: {source}", path.display())]
    Compile {
        /// Pattern file that was being compiled
        path: PathBuf,
        /// Status reported by the backend
        source: BackendError,
    },

    /// The backend failed while scanning (distinct from "no match")
    #[error("scan failed: {0}")]
    Scan(BackendError),

    /// The backend reported a failure while releasing the engine
    #[error("failed to destroy scanning engine: {0}")]
    Destroy(BackendError),
}

impl Error {
    /// Status code reported by the backend, if this error came from it
    pub fn status(&self) -> Option<i32> {
        match self {
            Error::Construction(e) | Error::Scan(e) | Error::Destroy(e) => Some(e.status),
            Error::Compile { source, .. } => Some(source.status),
            Error::Disposed { .. } | Error::NotCompiled => None,
        }
    }

    /// True for errors caused by calling into a disposed engine
    pub fn is_disposed(&self) -> bool {
        matches!(self, Error::Disposed { .. })
    }
}
