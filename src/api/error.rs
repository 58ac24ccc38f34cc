use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

use super::ApiResponse;
use crate::domain::FieldErrors;
use crate::domain::lockout::locked_message;
use crate::services::{AccountError, HydroponicsError};

pub const INVALID_ACTIVATION_LINK: &str = "Activation link is invalid or has expired.";
pub const INVALID_CREDENTIALS: &str = "Invalid credentials.";
pub const ACCOUNT_INACTIVE: &str = "Account is not active. Please verify your email first.";
pub const EMAIL_NOT_VERIFIED: &str =
    "Email not verified. Please check your email for verification link.";
pub const EMAIL_DELIVERY_FAILED: &str = "Failed to send activation email. Please try again later.";

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),

    DatabaseError(String),

    ValidationError(String),

    FieldValidation(FieldErrors),

    InternalError(String),

    /// Logged in full, answered with the given public message.
    InternalWithMessage { detail: String, public: String },

    Unauthorized(String),

    Locked(String),

    ServiceUnavailable(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            ApiError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            ApiError::FieldValidation(errors) => write!(f, "Validation error: {}", errors),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            ApiError::InternalWithMessage { detail, .. } => write!(f, "Internal error: {}", detail),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Locked(msg) => write!(f, "Locked: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::FieldValidation(errors) = self {
            let body = ApiResponse::<()>::field_errors(errors);
            return (StatusCode::BAD_REQUEST, Json(body)).into_response();
        }

        let (status, error_message) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_string(),
                )
            }
            ApiError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::FieldValidation(errors) => (StatusCode::BAD_REQUEST, errors.summary()),
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
            ApiError::InternalWithMessage { detail, public } => {
                tracing::error!("Internal error: {}", detail);
                (StatusCode::INTERNAL_SERVER_ERROR, public.clone())
            }
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            ApiError::Locked(msg) => (StatusCode::TOO_MANY_REQUESTS, msg.clone()),
            ApiError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
        };

        let body = ApiResponse::<()>::error(error_message);
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::InternalError(format!("{err:#}"))
    }
}

/// Malformed, mistyped or non-JSON bodies answer 400 in the usual envelope.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(status = %rejection.status(), "Rejected request body");
        ApiError::ValidationError(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<FieldErrors> for ApiError {
    fn from(errors: FieldErrors) -> Self {
        ApiError::FieldValidation(errors)
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Validation(errors) => ApiError::FieldValidation(errors),
            AccountError::InvalidActivationLink => {
                ApiError::ValidationError(INVALID_ACTIVATION_LINK.to_string())
            }
            AccountError::InvalidCredentials { attempts_remaining } => {
                ApiError::Unauthorized(invalid_credentials_message(attempts_remaining))
            }
            AccountError::Locked { remaining } => ApiError::Locked(locked_message(remaining)),
            AccountError::Inactive => ApiError::Unauthorized(ACCOUNT_INACTIVE.to_string()),
            AccountError::EmailNotVerified => {
                ApiError::Unauthorized(EMAIL_NOT_VERIFIED.to_string())
            }
            AccountError::Unauthorized => ApiError::Unauthorized("Unauthorized".to_string()),
            AccountError::UserNotFound => ApiError::NotFound("User not found".to_string()),
            AccountError::EmailDelivery(detail) => ApiError::InternalWithMessage {
                detail: format!("Activation email delivery failed: {detail}"),
                public: EMAIL_DELIVERY_FAILED.to_string(),
            },
            AccountError::Database(msg) => ApiError::DatabaseError(msg),
            AccountError::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}

impl From<HydroponicsError> for ApiError {
    fn from(err: HydroponicsError) -> Self {
        match err {
            HydroponicsError::SensorNotFound => ApiError::NotFound(err.to_string()),
            HydroponicsError::Validation(errors) => ApiError::FieldValidation(errors),
            HydroponicsError::Database(msg) => ApiError::DatabaseError(msg),
            HydroponicsError::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}

fn invalid_credentials_message(attempts_remaining: Option<u32>) -> String {
    match attempts_remaining {
        None => INVALID_CREDENTIALS.to_string(),
        Some(1) => format!("{INVALID_CREDENTIALS} 1 attempt remaining before lockout."),
        Some(n) => format!("{INVALID_CREDENTIALS} {n} attempts remaining before lockout."),
    }
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::ValidationError(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError::InternalError(msg.into())
    }

    pub fn unauthorized() -> Self {
        ApiError::Unauthorized("Authentication credentials were not provided or are invalid.".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn field_errors_render_map() {
        let (status, json) = body_json(ApiError::FieldValidation(FieldErrors::single(
            "non_field_errors",
            "Passwords don't match",
        )))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
        assert_eq!(json["errors"]["non_field_errors"][0], "Passwords don't match");
    }

    #[tokio::test]
    async fn internal_details_are_not_echoed() {
        let (status, json) = body_json(ApiError::from(AccountError::EmailDelivery(
            "smtp.example.com: connection refused".to_string(),
        )))
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], EMAIL_DELIVERY_FAILED);

        let (_, json) = body_json(ApiError::from(HydroponicsError::Database(
            "no such table".to_string(),
        )))
        .await;
        assert!(!json["error"].as_str().unwrap().contains("table"));
    }

    #[tokio::test]
    async fn lockout_maps_to_429() {
        let (status, json) = body_json(ApiError::from(AccountError::Locked {
            remaining: chrono::Duration::minutes(90),
        }))
        .await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            json["error"],
            "Account locked due to too many failed login attempts. Try again in 1h 30m."
        );
    }

    #[test]
    fn attempts_remaining_wording() {
        assert_eq!(invalid_credentials_message(None), "Invalid credentials.");
        assert_eq!(
            invalid_credentials_message(Some(3)),
            "Invalid credentials. 3 attempts remaining before lockout."
        );
        assert!(invalid_credentials_message(Some(1)).contains("1 attempt remaining"));
    }
}
