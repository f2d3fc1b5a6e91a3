//! Application error types.

use thiserror::Error;

/// Application-level errors for folio-migrate.
#[derive(Error, Debug)]
pub enum AppError {
    // Transport errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Store request failed with status {status}: {message}")]
    Store { status: u16, message: String },

    // Document errors
    #[error("Document codec error: {0}")]
    Codec(String),

    #[error("Invalid date in field '{field}': {value}")]
    InvalidDate { field: String, value: String },

    #[error("Record has no usable primary key field '{0}'")]
    MissingPrimaryKey(String),

    #[error("Document not found: {collection}/{id}")]
    DocumentNotFound { collection: String, id: String },

    // Domain errors
    #[error("Validation error: {0}")]
    Validation(String),

    // Config errors
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Short machine-readable code used in JSON reports.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Http(_) => "HTTP_ERROR",
            AppError::Postgres(_) => "POSTGRES_ERROR",
            AppError::Pool(_) => "POOL_ERROR",
            AppError::Store { .. } => "STORE_ERROR",
            AppError::Codec(_) => "CODEC_ERROR",
            AppError::InvalidDate { .. } => "INVALID_DATE",
            AppError::MissingPrimaryKey(_) => "MISSING_PRIMARY_KEY",
            AppError::DocumentNotFound { .. } => "DOCUMENT_NOT_FOUND",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
