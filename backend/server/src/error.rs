use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sheet::{CounterKey, StoreError, payloads::ErrorBody};
use thiserror::Error;

use crate::{config::ConfigError, counters::CounterError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("No row found for {0}")]
    RowNotFound(CounterKey),

    #[error("{key} is stored on more than one row ({rows:?})")]
    AmbiguousKey { key: CounterKey, rows: Vec<usize> },

    #[error("{key} is already at {count} and cannot go higher")]
    CountOverflow { key: CounterKey, count: u64 },

    #[error("Backing table unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    #[error("Endpoint not found")]
    NotFound,
}

impl From<CounterError> for AppError {
    fn from(err: CounterError) -> Self {
        match err {
            CounterError::RowNotFound(key) => AppError::RowNotFound(key),
            CounterError::AmbiguousKey { key, rows } => AppError::AmbiguousKey { key, rows },
            CounterError::CountOverflow { key, count } => AppError::CountOverflow { key, count },
            CounterError::Store(e) => AppError::StoreUnavailable(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::MalformedPayload { .. } => StatusCode::BAD_REQUEST,
            AppError::RowNotFound { .. } | AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::AmbiguousKey { .. } | AppError::CountOverflow { .. } => {
                StatusCode::CONFLICT
            }
            AppError::StoreUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        };

        let body = ErrorBody {
            error: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

/// Failures that stop the server from starting or serving.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to open backing table: {0}")]
    Store(#[from] StoreError),

    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
}
