//! error.rs
//!
//! The application's error taxonomy as a sum type mapped directly to HTTP
//! status codes.
//!
//! Every operation surfaces the first specific error it detects; store
//! errors are wrapped with a short, human-readable detail rather than
//! propagated raw.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Gone(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Gone(_) => StatusCode::GONE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        if matches!(self, AppError::Internal(_)) {
            tracing::error!(error = %self, "internal error");
        }
        let body = ErrorBody { detail: self.to_string() };
        (self.status(), Json(body)).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::PredicateFailed(pk, sk) => {
                AppError::Conflict(format!("concurrent modification on ({pk}, {sk}), retry"))
            }
            StoreError::TransactionCancelled(detail) => {
                AppError::Conflict(format!("concurrent modification, retry: {detail}"))
            }
            StoreError::Backend(detail) => AppError::Internal(detail),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
