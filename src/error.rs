//! HTTP-facing error type for the character API.

use crate::houses::InvalidHouseError;
use crate::schema::{group_by_field, FieldErrors, ValidationError};
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

pub const VALIDATION_MESSAGE: &str = "The given data was invalid.";
pub const NOT_FOUND_MESSAGE: &str = "Character not found.";
pub const INTERNAL_MESSAGE: &str = "Server Error";

/// Errors a request handler can end with.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The house was rejected by the validation gate.
    #[error(transparent)]
    InvalidHouse(#[from] InvalidHouseError),

    /// The request body is missing fields or carries bad values.
    #[error("The given data was invalid.")]
    Validation(FieldErrors),

    /// The body is not JSON or does not fit the payload shape.
    #[error("{0}")]
    MalformedBody(#[from] JsonRejection),

    /// No character with the requested id.
    #[error("character not found: {0}")]
    NotFound(String),

    /// Storage or other unexpected failure; details are logged, never returned.
    #[error("internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl From<Vec<ValidationError>> for ApiError {
    fn from(errors: Vec<ValidationError>) -> Self {
        ApiError::Validation(group_by_field(&errors))
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<FieldErrors>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidHouse(e) => e.status(),
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::MalformedBody(rejection) => rejection.status(),
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::InvalidHouse(e) => ErrorBody {
                message: e.message().to_string(),
                errors: None,
            },
            ApiError::Validation(errors) => ErrorBody {
                message: VALIDATION_MESSAGE.to_string(),
                errors: Some(errors),
            },
            ApiError::MalformedBody(rejection) => ErrorBody {
                message: rejection.body_text(),
                errors: None,
            },
            ApiError::NotFound(_) => ErrorBody {
                message: NOT_FOUND_MESSAGE.to_string(),
                errors: None,
            },
            ApiError::Internal(e) => {
                tracing::error!(error = %format!("{:#}", e), "request failed");
                ErrorBody {
                    message: INTERNAL_MESSAGE.to_string(),
                    errors: None,
                }
            }
        };

        (status, Json(body)).into_response()
    }
}
