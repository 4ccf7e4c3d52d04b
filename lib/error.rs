//! Error types returned by the cache.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Failure to open (and therefore populate) a directory.
///
/// No partial state is ever left behind: when `open` or `list` fails, the store is exactly as it
/// was before the call.
#[derive(Debug, Error)]
pub enum OpenError {
    /// The directory does not exist, is not a directory, or is not accessible.
    #[error("directory not found: {}", path.display())]
    NotFound {
        /// The path that was opened.
        path: PathBuf,
        /// What the scan reported.
        #[source]
        source: io::Error,
    },

    /// The scan failed for a reason other than the directory being missing.
    #[error("failed to scan {}: {source}", path.display())]
    Scan {
        /// The path that was opened.
        path: PathBuf,
        /// What the scan reported.
        #[source]
        source: io::Error,
    },
}

impl OpenError {
    /// The status the C-style `scandir` entry point reports for any failure.
    pub const LEGACY_STATUS: i32 = -1;

    /// Classify a scan failure for `path`.
    pub(crate) fn from_scan(path: &Path, source: io::Error) -> Self {
        let path = path.to_path_buf();
        match source.kind() {
            io::ErrorKind::NotFound
            | io::ErrorKind::NotADirectory
            | io::ErrorKind::PermissionDenied => Self::NotFound { path, source },
            _ => Self::Scan { path, source },
        }
    }

    /// The path whose scan failed.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound { path, .. } | Self::Scan { path, .. } => path,
        }
    }

    /// Whether this is the not-found flavour of failure.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<&OpenError> for i32 {
    fn from(e: &OpenError) -> Self {
        match e {
            OpenError::NotFound { source, .. } => match source.kind() {
                io::ErrorKind::NotADirectory => libc::ENOTDIR,
                io::ErrorKind::PermissionDenied => libc::EACCES,
                _ => libc::ENOENT,
            },
            OpenError::Scan { source, .. } => source.raw_os_error().unwrap_or(libc::EIO),
        }
    }
}

impl From<OpenError> for i32 {
    fn from(e: OpenError) -> Self {
        Self::from(&e)
    }
}

/// Failure to start the background staleness sweeper.
#[derive(Debug, Error)]
pub enum SweeperError {
    /// The cache was not configured with an interval eviction trigger.
    #[error("eviction trigger is not interval-based")]
    NotScheduled,

    /// The call was made outside of a tokio runtime.
    #[error("no tokio runtime to run the sweeper on: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}
