//! HTTP route handlers for the Looks Lab API.
//!
//! Every handler returns JSON. Errors share the `{"detail": "..."}` body
//! produced by [`crate::error::AppError`].
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                                  - Liveness check
//! GET  /health/ready                            - Readiness check (database)
//!
//! # Auth (rate limited)
//! POST /api/v1/auth/google                      - Google sign-in
//! POST /api/v1/auth/refresh                     - Rotate refresh token
//! POST /api/v1/auth/sign-out                    - Revoke refresh token
//!
//! # Users (requires auth)
//! GET|PATCH|DELETE /api/v1/users/me
//! GET  /api/v1/users/me/progress/weekly
//!
//! # Onboarding (anonymous sessions)
//! POST  /api/v1/onboarding/sessions
//! GET   /api/v1/onboarding/sessions/{id}
//! GET   /api/v1/onboarding/sessions/{id}/flow?step=
//! POST  /api/v1/onboarding/sessions/{id}/answers
//! GET   /api/v1/onboarding/sessions/{id}/progress
//! PATCH /api/v1/onboarding/sessions/{id}/domain?domain=
//! PATCH /api/v1/onboarding/sessions/{id}/payment
//! PATCH /api/v1/onboarding/sessions/{id}/link   - requires auth
//! GET   /api/v1/onboarding/users/me/answers     - requires auth
//! GET   /api/v1/onboarding/users/me/wellness    - requires auth
//!
//! # Domains (requires auth; flow and answers also require access)
//! GET  /api/v1/domains/progress
//! GET  /api/v1/domains/{domain}/questions
//! GET  /api/v1/domains/{domain}/flow
//! POST /api/v1/domains/{domain}/answers
//! GET  /api/v1/domains/{domain}/answers
//! GET  /api/v1/domains/{domain}/progress
//! POST /api/v1/domains/{domain}/retry-ai
//! GET  /api/v1/domains/{domain}/access
//!
//! # Plans (requires auth, AI rate limited)
//! POST /api/v1/domains/workout/generate-plan
//! POST /api/v1/domains/diet/generate-meal-plan
//!
//! # Legal (public)
//! GET  /api/v1/legal/privacy-policy
//! GET  /api/v1/legal/terms-of-service
//!
//! # Images, insights, subscriptions (requires auth)
//! /api/v1/images, /api/v1/insights, /api/v1/subscriptions
//! ```

pub mod auth;
pub mod domains;
pub mod health;
pub mod images;
pub mod insights;
pub mod legal;
pub mod onboarding;
pub mod plans;
pub mod subscriptions;
pub mod users;

use axum::Router;
use serde::Serialize;

use crate::middleware::{ai_rate_limiter, auth_rate_limiter};
use crate::state::AppState;

/// Body returned by delete endpoints.
#[derive(Debug, Serialize)]
pub struct Deleted {
    pub status: &'static str,
    pub message: &'static str,
}

impl Deleted {
    #[must_use]
    pub const fn new(message: &'static str) -> Self {
        Self {
            status: "deleted",
            message,
        }
    }
}

/// The versioned API, to be nested under `/api/v1`.
pub fn api_routes() -> Router<AppState> {
    let mut auth_routes = auth::router();
    if let Some(limiter) = auth_rate_limiter() {
        auth_routes = auth_routes.layer(limiter);
    }
    let mut plan_routes = plans::router();
    if let Some(limiter) = ai_rate_limiter() {
        plan_routes = plan_routes.layer(limiter);
    }

    Router::new()
        .nest("/auth", auth_routes)
        .nest("/users", users::router())
        .nest("/onboarding", onboarding::router())
        .nest("/domains", domains::router().merge(plan_routes))
        .nest("/images", images::router())
        .nest("/insights", insights::router())
        .nest("/subscriptions", subscriptions::router())
        .nest("/legal", legal::router())
}

/// All routes served by the API binary.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .nest("/api/v1", api_routes())
}
