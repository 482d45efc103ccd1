use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Response for an error
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub code: u16,
    pub status: String,
    pub error: String,
}

/// Error half of every handler result.
pub type ApiError = (StatusCode, Json<ErrorResponse>);

impl ErrorResponse {
    pub fn build(status: StatusCode, error: impl Into<String>) -> ApiError {
        (
            status,
            Json(ErrorResponse {
                code: status.as_u16(),
                status: status.to_string(),
                error: error.into(),
            }),
        )
    }

    pub fn bad_request(error: impl Into<String>) -> ApiError {
        Self::build(StatusCode::BAD_REQUEST, error)
    }

    pub fn not_found(error: impl Into<String>) -> ApiError {
        Self::build(StatusCode::NOT_FOUND, error)
    }

    pub fn forbidden(error: impl Into<String>) -> ApiError {
        Self::build(StatusCode::FORBIDDEN, error)
    }

    pub fn internal(error: impl Into<String>) -> ApiError {
        Self::build(StatusCode::INTERNAL_SERVER_ERROR, error)
    }
}
