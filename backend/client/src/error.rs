use sheet::Transient;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Invalid server URL {0}")]
    InvalidUrl(String),

    #[error("Flag storage failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Flag storage is corrupt: {0}")]
    Json(#[from] serde_json::Error),
}

impl Transient for SyncError {
    /// Timeouts, dropped connections and server-side failures. A 4xx means
    /// the request itself is wrong and will fail again.
    fn is_transient(&self) -> bool {
        match self {
            SyncError::Transport(_) => true,
            SyncError::Status { status, .. } => *status == 429 || *status >= 500,
            SyncError::InvalidUrl(_) | SyncError::Io(_) | SyncError::Json(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(status: u16) -> SyncError {
        SyncError::Status {
            status,
            message: String::new(),
        }
    }

    #[test]
    fn test_transient_statuses() {
        assert!(status(503).is_transient());
        assert!(status(429).is_transient());
        assert!(!status(404).is_transient());
        assert!(!status(409).is_transient());
        assert!(!SyncError::InvalidUrl("nope".into()).is_transient());
    }
}
