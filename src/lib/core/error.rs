use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[cfg(feature = "tracing")]
use tracing::{debug, error};

use crate::core::validation::Rejection;

pub const NOT_FOUND_DETAIL: &str = "Todo not found";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Store call timed out after {0:?}")]
    Timeout(Duration),
    #[error("Unexpected row shape: {0}")]
    RowShape(String),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum ApiError {
    /// Input that does not have the expected shape at all.
    #[error("Invalid request")]
    BadRequest(Rejection),
    /// Well-formed body that breaks a field rule.
    #[error("Validation failed")]
    Unprocessable(Rejection),
    /// Body the framework could not read at all, e.g. over the size limit.
    #[error("Unreadable body: {message}")]
    Body { status: StatusCode, message: String },
    #[error("Not found")]
    NotFound,
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(rejection) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Invalid request", "details": rejection.fields })),
            )
                .into_response(),
            ApiError::Unprocessable(rejection) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "error": "Validation failed", "details": rejection.fields })),
            )
                .into_response(),
            ApiError::Body { status, message } => {
                (status, Json(json!({ "error": message }))).into_response()
            }
            ApiError::NotFound => {
                #[cfg(feature = "tracing")]
                debug!("Todo lookup missed");
                (StatusCode::NOT_FOUND, Json(json!({ "detail": NOT_FOUND_DETAIL }))).into_response()
            }
            ApiError::Store(e) => {
                #[cfg(feature = "tracing")]
                error!(error = %e, "Store operation failed");
                #[cfg(not(feature = "tracing"))]
                let _ = e;
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}
