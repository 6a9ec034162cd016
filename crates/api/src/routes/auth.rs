//! Sign-in, token refresh and sign-out.

use axum::{Json, Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};

use crate::error::{Result, clear_sentry_user};
use crate::middleware::RequireAuth;
use crate::services::AuthService;
use crate::services::auth::AuthSession;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/google", post(google_sign_in))
        .route("/refresh", post(refresh))
        .route("/sign-out", post(sign_out))
}

#[derive(Debug, Deserialize)]
pub struct GoogleSignInRequest {
    pub id_token: String,
    pub device_info: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
    pub device_info: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SignOutResponse {
    pub status: &'static str,
    pub detail: &'static str,
}

/// Sign in with a Google ID token.
///
/// POST /auth/google
async fn google_sign_in(
    State(state): State<AppState>,
    Json(body): Json<GoogleSignInRequest>,
) -> Result<Json<AuthSession>> {
    let service = AuthService::new(state.pool(), &state.config().jwt);
    let session = service
        .sign_in_with_google(
            state.http(),
            state.config().google_client_id.as_deref(),
            &body.id_token,
            body.device_info.as_deref(),
        )
        .await?;

    Ok(Json(session))
}

/// Exchange a refresh token for a new token pair.
///
/// POST /auth/refresh
async fn refresh(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> Result<Json<AuthSession>> {
    let service = AuthService::new(state.pool(), &state.config().jwt);
    let session = service
        .refresh(&body.refresh_token, body.device_info.as_deref())
        .await?;

    Ok(Json(session))
}

/// Revoke the caller's refresh token.
///
/// POST /auth/sign-out
async fn sign_out(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<SignOutResponse>> {
    let service = AuthService::new(state.pool(), &state.config().jwt);
    let revoked = service.sign_out(user.id).await?;
    tracing::info!(user_id = %user.id, revoked, "User signed out");
    clear_sentry_user();

    Ok(Json(SignOutResponse {
        status: "signed_out",
        detail: "Successfully signed out",
    }))
}
