use std::path::PathBuf;

use thiserror::Error;

/// Per-file failures. None of these abort a scan or the watch loop.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse {}: {reason}", .path.display())]
    Extraction { path: PathBuf, reason: String },

    /// Health probe failed, connection refused or timed out.
    #[error("ingestion service unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("ingestion service rejected request ({status}): {body}")]
    RemoteRejected { status: u16, body: String },

    #[error("cannot persist index {}: {reason}", .path.display())]
    Index { path: PathBuf, reason: String },
}

impl IngestError {
    /// Remote failures leave the index untouched and are picked up again on
    /// the next scan or watch event.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            IngestError::RemoteUnavailable(_) | IngestError::RemoteRejected { .. }
        )
    }
}
