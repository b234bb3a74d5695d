//! Error taxonomy shared by every marksync crate

use crate::node::Browser;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Result alias used throughout the library crates
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed store or browser data. Nothing is repaired silently.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Chromium bookmark file whose stored checksum disagrees with its content
    #[error("checksum mismatch: file says {expected}, content hashes to {computed}")]
    ChecksumMismatch { expected: String, computed: String },

    /// Browser process is alive; writing now would be overwritten or corrupt its state
    #[error("{0} is running; close it before writing its bookmarks")]
    BrowserRunning(Browser),

    #[error("{browser} bookmarks not found{}", path.as_ref().map(|p| format!(" at {}", p.display())).unwrap_or_default())]
    BrowserNotFound {
        browser: Browser,
        path: Option<PathBuf>,
    },

    /// Pre-write snapshot could not be taken, so the write was not attempted
    #[error("backup of {} failed: {source}", path.display())]
    BackupFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("permission denied: {}", path.display())]
    Permission {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("parent folder {0} not found")]
    ParentNotFound(Uuid),

    #[error("node {0} not found")]
    NodeNotFound(Uuid),

    #[error("invalid move: {0}")]
    InvalidMove(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// Attach the path to an I/O failure, promoting permission problems to
    /// [`Error::Permission`]
    pub fn io_at(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::PermissionDenied {
            Error::Permission {
                path: path.to_path_buf(),
                source,
            }
        } else {
            Error::Io(io::Error::new(
                source.kind(),
                format!("{}: {}", path.display(), source),
            ))
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }
}
