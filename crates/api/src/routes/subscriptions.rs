//! Subscription routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
};
use serde::Deserialize;

use looks_lab_core::{PlanType, SubscriptionId};

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::Subscription;
use crate::services::SubscriptionService;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create))
        .route("/me", get(mine))
        .route("/{id}/cancel", patch(cancel))
}

#[derive(Debug, Deserialize)]
pub struct CreateSubscriptionRequest {
    pub plan: PlanType,
}

/// Start a subscription on `plan`.
///
/// POST /subscriptions
async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<CreateSubscriptionRequest>,
) -> Result<(StatusCode, Json<Subscription>)> {
    let subscription = SubscriptionService::new(state.pool())
        .create(user.id, body.plan)
        .await?;
    Ok((StatusCode::CREATED, Json(subscription)))
}

/// GET /subscriptions/me
async fn mine(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Subscription>> {
    let subscription = SubscriptionService::new(state.pool()).for_user(user.id).await?;
    Ok(Json(subscription))
}

/// PATCH /subscriptions/:id/cancel
async fn cancel(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i32>,
) -> Result<Json<Subscription>> {
    let subscription = SubscriptionService::new(state.pool())
        .cancel(SubscriptionId::new(id), user.id)
        .await?;
    Ok(Json(subscription))
}
