use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::error::AppError;

/// JSON body returned for every client-visible error.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub code: &'static str,
    pub message: String,
}

/// Map domain errors to HTTP responses
pub fn map_error(err: &AppError) -> (StatusCode, ErrorBody) {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let (error, code) = match err {
        AppError::InvalidIdentifier(_) => ("validation_error", "INVALID_IDENTIFIER"),
        AppError::Validation(_) => ("validation_error", "VALIDATION_ERROR"),
        AppError::Unauthenticated => ("authentication_error", "UNAUTHENTICATED"),
        AppError::Forbidden => ("authorization_error", "FORBIDDEN"),
        AppError::NotFound => ("not_found_error", "NOT_FOUND"),
        AppError::BackboneUnavailable(_) => ("service_unavailable", "BACKBONE_UNAVAILABLE"),
        AppError::Config(_) | AppError::StartServer(_) | AppError::Database(_) => {
            ("server_error", "INTERNAL_SERVER_ERROR")
        }
    };

    // Internal detail (SQL errors, config paths) stays in the logs.
    let message = match err {
        AppError::Database(_) | AppError::Config(_) | AppError::StartServer(_) => {
            "internal server error".to_string()
        }
        other => other.to_string(),
    };

    (status, ErrorBody { error, code, message })
}

pub fn into_response(err: AppError) -> Response {
    if err.status_code() >= 500 {
        tracing::error!(error = %err, "request failed");
    }
    let (status, body) = map_error(&err);
    (status, Json(body)).into_response()
}
