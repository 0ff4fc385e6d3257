//! HTTP error response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use hvac_domain::error::{HvacError, ValidationError};

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Maps [`HvacError`] to an HTTP response with appropriate status code.
#[derive(Debug)]
pub struct ApiError(HvacError);

impl From<HvacError> for ApiError {
    fn from(err: HvacError) -> Self {
        Self(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            HvacError::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            HvacError::NotFound(err) => (StatusCode::NOT_FOUND, err.to_string()),
            other => {
                tracing::error!(error = %other, source = ?std::error::Error::source(other), "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
