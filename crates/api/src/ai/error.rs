//! Error types for the Gemini API client.

use thiserror::Error;

/// Errors that can occur when calling the Gemini API.
#[derive(Debug, Error)]
pub enum GeminiError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Gemini returned a non-success status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("rate limited, retry after {retry_after} seconds")]
    RateLimited { retry_after: u64 },

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// No API key is configured.
    #[error("AI client is not configured")]
    NotConfigured,

    #[error("request timed out")]
    Timeout,

    /// The response carried no text.
    #[error("empty response from AI")]
    Empty,

    /// The response envelope didn't have the expected shape.
    #[error("parse error: {0}")]
    Parse(String),

    /// The model's text wasn't a usable JSON object.
    #[error("invalid JSON in response: {0}")]
    Validation(String),
}

impl GeminiError {
    /// Whether another attempt might succeed.
    ///
    /// Bad model output and rate limits are final.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Api { .. } | Self::Timeout | Self::Empty | Self::Parse(_)
        )
    }

    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(err)
        }
    }

    /// Classify an error body. Quota and rate-limit wording counts as a rate
    /// limit even when the status doesn't say so.
    pub(crate) fn from_status(status: u16, message: String, retry_after: Option<u64>) -> Self {
        let lowered = message.to_lowercase();
        if status == 429 || lowered.contains("quota") || lowered.contains("rate limit") {
            return Self::RateLimited {
                retry_after: retry_after.unwrap_or(60),
            };
        }
        match status {
            401 | 403 => Self::Unauthorized(message),
            _ => Self::Api { status, message },
        }
    }
}

/// Error envelope returned by the Gemini REST API.
#[derive(Debug, serde::Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiError,
}

#[derive(Debug, serde::Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_gemini_error_display() {
        let err = GeminiError::RateLimited { retry_after: 30 };
        assert_eq!(err.to_string(), "rate limited, retry after 30 seconds");

        let err = GeminiError::Api {
            status: 500,
            message: "backend error".to_string(),
        };
        assert_eq!(err.to_string(), "API error (500): backend error");
    }

    #[test]
    fn test_quota_message_is_rate_limit() {
        let err = GeminiError::from_status(400, "Quota exceeded for project".to_string(), None);
        assert!(matches!(err, GeminiError::RateLimited { retry_after: 60 }));

        let err = GeminiError::from_status(429, "slow down".to_string(), Some(12));
        assert!(matches!(err, GeminiError::RateLimited { retry_after: 12 }));
    }

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            GeminiError::from_status(403, "API key not valid".to_string(), None),
            GeminiError::Unauthorized(_)
        ));
        assert!(matches!(
            GeminiError::from_status(503, "overloaded".to_string(), None),
            GeminiError::Api { status: 503, .. }
        ));
    }

    #[test]
    fn test_retryable() {
        assert!(GeminiError::Timeout.is_retryable());
        assert!(GeminiError::Empty.is_retryable());
        assert!(!GeminiError::Validation("x".to_string()).is_retryable());
        assert!(!GeminiError::RateLimited { retry_after: 1 }.is_retryable());
        assert!(!GeminiError::NotConfigured.is_retryable());
    }

    #[test]
    fn test_api_error_deserialization() {
        let json = r#"{
            "error": {
                "code": 400,
                "message": "Invalid JSON payload received.",
                "status": "INVALID_ARGUMENT"
            }
        }"#;

        let response: ApiErrorResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.error.code, 400);
        assert_eq!(response.error.status.as_deref(), Some("INVALID_ARGUMENT"));
    }
}
