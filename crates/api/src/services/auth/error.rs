//! Authentication error types.

use axum::http::StatusCode;
use thiserror::Error;

use looks_lab_core::{AuthProvider, EmailError};

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Google rejected the ID token, or its claims don't match our client.
    #[error("invalid Google token: {0}")]
    InvalidGoogleToken(String),

    #[error("Google sign-in is not configured")]
    GoogleNotConfigured,

    /// The email belongs to an account created with another provider.
    #[error("email registered with {registered}")]
    ProviderMismatch { registered: AuthProvider },

    #[error("user account is inactive")]
    InactiveUser,

    #[error("user not found")]
    UserNotFound,

    /// Access token is malformed or its signature doesn't verify.
    #[error("invalid access token")]
    InvalidToken,

    #[error("access token expired")]
    TokenExpired,

    #[error("invalid refresh token")]
    InvalidRefreshToken,

    #[error("refresh token revoked")]
    RefreshTokenRevoked,

    #[error("refresh token expired")]
    RefreshTokenExpired,

    #[error("token encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Identity provider could not be reached.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl AuthError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::InvalidEmail(_) | Self::ProviderMismatch { .. } => StatusCode::BAD_REQUEST,
            Self::InvalidGoogleToken(_)
            | Self::UserNotFound
            | Self::InvalidToken
            | Self::TokenExpired
            | Self::InvalidRefreshToken
            | Self::RefreshTokenRevoked
            | Self::RefreshTokenExpired => StatusCode::UNAUTHORIZED,
            Self::InactiveUser => StatusCode::FORBIDDEN,
            Self::GoogleNotConfigured | Self::Http(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Encoding(_) | Self::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show the client.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            Self::InvalidEmail(err) => format!("Invalid email: {err}"),
            Self::InvalidGoogleToken(_) => "Invalid Google token".to_string(),
            Self::GoogleNotConfigured => "Google sign-in is not available".to_string(),
            Self::ProviderMismatch { registered } => format!(
                "This email is registered with {registered}. Please use {registered} to sign in."
            ),
            Self::InactiveUser => "User account is inactive".to_string(),
            Self::UserNotFound => "User not found".to_string(),
            Self::InvalidToken => "Could not validate credentials".to_string(),
            Self::TokenExpired => "Token has expired".to_string(),
            Self::InvalidRefreshToken => "Invalid refresh token".to_string(),
            Self::RefreshTokenRevoked => "Refresh token has been revoked".to_string(),
            Self::RefreshTokenExpired => "Refresh token expired".to_string(),
            Self::Http(_) => "Identity provider unavailable".to_string(),
            Self::Encoding(_) | Self::Repository(_) => "Internal server error".to_string(),
        }
    }
}
