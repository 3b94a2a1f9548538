use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use service::auth::errors::AuthError;
use service::auth::validation::ValidationErrors;
use thiserror::Error;
use tracing::error;

/// JSON error body: `{"message": "...", "errors": {"field": ["..."]}}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "ValidationErrors::is_empty")]
    pub errors: ValidationErrors,
}

impl ErrorBody {
    fn message(message: impl Into<String>) -> Self {
        Self { message: message.into(), errors: ValidationErrors::new() }
    }

    fn fields(errors: ValidationErrors) -> Self {
        let message = errors.first_message().unwrap_or("The given data was invalid.").to_string();
        Self { message, errors }
    }
}

#[derive(Debug)]
pub enum ApiError {
    /// Field-level input errors found before the service is called.
    Validation(ValidationErrors),
    /// Body could not be parsed into the expected shape.
    Body(JsonRejection),
    Auth(AuthError),
    /// Client exhausted its register/login attempts; retry after the delay.
    TooManyRequests(Duration),
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        ApiError::Auth(e)
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(e: ValidationErrors) -> Self {
        ApiError::Validation(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        ApiError::Body(e)
    }
}

fn auth_response(e: AuthError) -> (StatusCode, ErrorBody) {
    match e {
        AuthError::DuplicateAccount(field) => {
            let msg = format!("The {field} has already been taken.");
            (StatusCode::UNPROCESSABLE_ENTITY, ErrorBody::fields(ValidationErrors::single(field.as_str(), msg)))
        }
        // same body whether the email is unknown or the password is wrong
        AuthError::InvalidCredentials => (
            StatusCode::UNPROCESSABLE_ENTITY,
            ErrorBody::fields(ValidationErrors::single("email", "These credentials do not match our records.")),
        ),
        AuthError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, ErrorBody::message(msg)),
        AuthError::Unauthenticated => (StatusCode::UNAUTHORIZED, ErrorBody::message("Unauthenticated.")),
        internal => {
            error!(error = %internal, code = internal.code(), "request failed with internal error");
            (StatusCode::INTERNAL_SERVER_ERROR, ErrorBody::message("Server Error"))
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::TooManyRequests(retry_after) => {
                let secs = retry_after.as_secs_f64().ceil().max(1.0) as u64;
                let body = ErrorBody::message("Too Many Attempts.");
                return (StatusCode::TOO_MANY_REQUESTS, [(header::RETRY_AFTER, secs.to_string())], Json(body))
                    .into_response();
            }
            ApiError::Validation(errors) => (StatusCode::UNPROCESSABLE_ENTITY, ErrorBody::fields(errors)),
            ApiError::Body(rejection) => (rejection.status(), ErrorBody::message(rejection.body_text())),
            ApiError::Auth(e) => auth_response(e),
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("database unavailable: {0}")]
    Database(#[from] sea_orm::DbErr),
    #[error("auth setup failed: {0}")]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Any(#[from] anyhow::Error),
}
