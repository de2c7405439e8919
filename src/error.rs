use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Structural violations when assembling a [`crate::models::Table`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("column '{column}' has {found} rows, expected {expected}")]
    RaggedColumn {
        column: String,
        expected: usize,
        found: usize,
    },
    #[error("duplicate column name '{0}'")]
    DuplicateColumn(String),
}

/// Failures that abort a single ingestion call.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),
    #[error("Could not decode CSV file with any common encoding")]
    Decode,
    #[error("File contains no columns to parse")]
    EmptyFile,
    #[error("Error reading Excel file: {0}")]
    Spreadsheet(String),
    #[error(transparent)]
    Table(#[from] TableError),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("{0}")]
    NotFound(String),
    #[error("File too large: {0}")]
    PayloadTooLarge(String),
    #[error("Error processing file: {0}")]
    Ingest(#[from] IngestError),
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Ingest(IngestError::UnsupportedFormat(_)) => StatusCode::BAD_REQUEST,
            AppError::Ingest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::warn!("{}", self);
        }

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}
