//! Application error handling

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use httplog_core::AuditError;
use serde::Serialize;
use thiserror::Error;

/// Application error type
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl AppError {
    fn kind(&self) -> &'static str {
        match self {
            AppError::Internal(_) => "internal",
            AppError::Database(_) => "database",
        }
    }
}

/// Error body sent to clients
#[derive(Serialize)]
struct ErrResponse {
    error: ServiceError,
}

#[derive(Serialize)]
struct ServiceError {
    kind: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrResponse {
            error: ServiceError {
                kind: self.kind(),
                message: self.to_string(),
            },
        };

        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

impl From<AuditError> for AppError {
    fn from(err: AuditError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<deadpool_postgres::PoolError> for AppError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        AppError::Database(format!("pool: {}", err))
    }
}

impl From<tokio_postgres::Error> for AppError {
    fn from(err: tokio_postgres::Error) -> Self {
        AppError::Database(err.to_string())
    }
}
