use std::path::PathBuf;

use thiserror::Error;

/// Library error type for signage operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The requested media directory does not exist.
    #[error("media directory not found: {0}")]
    NotFound(String),

    /// Reading the directory listing or a file's bytes failed mid-scan.
    #[error("failed to scan {}: {source}", path.display())]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The blocking scan task panicked or was cancelled.
    #[error("scan task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// The playlist could not be fetched for a page load.
    #[error("playlist fetch failed: {0}")]
    Fetch(String),
}

impl Error {
    pub(crate) fn scan(path: impl Into<PathBuf>, source: impl Into<std::io::Error>) -> Self {
        Self::Scan {
            path: path.into(),
            source: source.into(),
        }
    }
}
