use async_trait::async_trait;
use thiserror::Error;

use crate::{
    decode::Row,
    range::{CellRange, RangeError},
    retry::Transient,
};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Store responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed store response: {0}")]
    Malformed(String),

    #[error(transparent)]
    Range(#[from] RangeError),

    #[error("Store unavailable")]
    Unavailable,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Transient for StoreError {
    fn is_transient(&self) -> bool {
        match self {
            StoreError::Transport(_) | StoreError::Unavailable => true,
            StoreError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// A row-oriented table addressed by A1 ranges.
///
/// This is the whole contract this system relies on from the backing store:
/// no formulas, no formatting, no transactions. Every write is a blind
/// overwrite.
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Rows of `range`; trailing rows and cells may be omitted by the store.
    async fn get_values(&self, range: &CellRange) -> Result<Vec<Row>, StoreError>;

    async fn update_values(&self, range: &CellRange, values: Vec<Row>) -> Result<(), StoreError>;
}
