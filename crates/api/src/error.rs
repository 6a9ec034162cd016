//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers return `Result<T, AppError>`.
//! Every error body has the shape `{"detail": "<message>"}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use looks_lab_core::{AnswerError, DomainError};
use serde_json::json;
use thiserror::Error;

use crate::ai::GeminiError;
use crate::ai::plans::PlanRequestError;
use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::storage::StorageError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Generative AI call failed.
    #[error("AI error: {0}")]
    Ai(#[from] GeminiError),

    /// Upload validation or disk I/O failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Invalid answer: {0}")]
    InvalidAnswer(#[from] AnswerError),

    #[error("{0}")]
    InvalidDomain(#[from] DomainError),

    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User is authenticated but may not touch this resource.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Access requires a completed payment or a live subscription.
    #[error("Payment required: {0}")]
    PaymentRequired(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Well-formed request with a field outside its allowed range.
    #[error("Unprocessable: {0}")]
    Unprocessable(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether this error indicates a fault on our side worth reporting.
    fn is_server_error(&self) -> bool {
        match self {
            Self::Database(RepositoryError::NotFound | RepositoryError::Conflict(_)) => false,
            Self::Database(_) | Self::Internal(_) => true,
            Self::Ai(err) => !matches!(err, GeminiError::RateLimited { .. }),
            Self::Storage(err) => matches!(err, StorageError::Io(_)),
            Self::Auth(err) => matches!(err, AuthError::Repository(_) | AuthError::Http(_)),
            _ => false,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Database(err) => match err {
                RepositoryError::NotFound => StatusCode::NOT_FOUND,
                RepositoryError::Conflict(_) => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Auth(err) => err.status(),
            Self::Ai(err) => match err {
                GeminiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
                GeminiError::Timeout => StatusCode::GATEWAY_TIMEOUT,
                _ => StatusCode::SERVICE_UNAVAILABLE,
            },
            Self::Storage(err) => match err {
                StorageError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                StorageError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
                StorageError::NotFound(_) => StatusCode::NOT_FOUND,
                _ => StatusCode::BAD_REQUEST,
            },
            Self::InvalidAnswer(_) | Self::InvalidDomain(_) | Self::Unprocessable(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::PaymentRequired(_) => StatusCode::PAYMENT_REQUIRED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show the client.
    fn client_message(&self) -> String {
        match self {
            Self::Database(RepositoryError::NotFound) => "Resource not found".to_string(),
            Self::Database(RepositoryError::Conflict(_)) => {
                "The request conflicts with existing data.".to_string()
            }
            // Don't expose internal error details to clients
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Auth(err) => err.client_message(),
            Self::Ai(err) => match err {
                GeminiError::RateLimited { .. } => {
                    "AI service is busy, please try again shortly".to_string()
                }
                GeminiError::Timeout => "AI service timed out".to_string(),
                _ => "AI service unavailable".to_string(),
            },
            Self::Storage(StorageError::Io(_)) => "Image upload failed".to_string(),
            Self::Storage(err) => err.to_string(),
            Self::InvalidAnswer(err) => err.to_string(),
            Self::InvalidDomain(err) => err.to_string(),
            Self::NotFound(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::PaymentRequired(msg)
            | Self::BadRequest(msg)
            | Self::Unprocessable(msg)
            | Self::Conflict(msg) => msg.clone(),
            Self::RateLimited => "Too many requests".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        let status = self.status();
        let body = Json(json!({ "detail": self.client_message() }));
        (status, body).into_response()
    }
}

impl From<PlanRequestError> for AppError {
    fn from(err: PlanRequestError) -> Self {
        Self::Unprocessable(err.to_string())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb so Sentry reports show the questionnaire steps leading
/// up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;
    use looks_lab_core::Domain;

    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    async fn get_detail(err: AppError) -> String {
        let body = to_bytes(err.into_response().into_body(), usize::MAX)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        value["detail"].as_str().unwrap().to_string()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("Image not found".to_string());
        assert_eq!(err.to_string(), "Not found: Image not found");

        let err = AppError::PaymentRequired("Subscription expired".to_string());
        assert_eq!(err.to_string(), "Payment required: Subscription expired");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("x".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Forbidden("x".into())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::PaymentRequired("x".into())),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            get_status(AppError::InvalidAnswer(AnswerError::Empty)),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            get_status(AppError::Unprocessable("x".into())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            get_status(AppError::Database(RepositoryError::Conflict("dup".into()))),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::RateLimited),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            get_status(AppError::Internal("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_ai_errors_map_to_distinct_statuses() {
        assert_eq!(
            get_status(AppError::Ai(GeminiError::Timeout)),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            get_status(AppError::Ai(GeminiError::RateLimited { retry_after: 30 })),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            get_status(AppError::Ai(GeminiError::Empty)),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[tokio::test]
    async fn test_body_carries_detail_without_internals() {
        assert_eq!(
            get_detail(AppError::Internal("connection reset by peer".into())).await,
            "Internal server error"
        );
        assert_eq!(
            get_detail(AppError::Forbidden("No onboarding session found".into())).await,
            "No onboarding session found"
        );
        let domain_err = Domain::parse("yoga").unwrap_err();
        assert!(
            get_detail(AppError::InvalidDomain(domain_err))
                .await
                .starts_with("Invalid domain. Must be one of:")
        );
    }

    #[tokio::test]
    async fn test_plan_option_out_of_range_is_422() {
        let err = PlanRequestError {
            field: "meal_count",
            min: 2,
            max: 6,
            value: 9,
        };
        assert_eq!(
            get_status(err.clone().into()),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            get_detail(err.into()).await,
            "meal_count must be between 2 and 6, got 9"
        );
    }
}
