//! Stored insight routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};

use looks_lab_core::InsightId;

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::Insight;
use crate::models::insight::{InsightCreate, InsightUpdate};
use crate::services::InsightService;
use crate::state::AppState;

use super::Deleted;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create))
        .route("/me", get(mine))
        .route("/{id}", get(show).patch(update).delete(delete))
}

/// POST /insights
async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<InsightCreate>,
) -> Result<(StatusCode, Json<Insight>)> {
    let insight = InsightService::new(state.pool()).create(user.id, &body).await?;
    Ok((StatusCode::CREATED, Json(insight)))
}

/// GET /insights/me
async fn mine(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Insight>>> {
    let insights = InsightService::new(state.pool()).list(user.id).await?;
    Ok(Json(insights))
}

/// GET /insights/:id
async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i32>,
) -> Result<Json<Insight>> {
    let insight = InsightService::new(state.pool())
        .get(InsightId::new(id), user.id)
        .await?;
    Ok(Json(insight))
}

/// PATCH /insights/:id
async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i32>,
    Json(body): Json<InsightUpdate>,
) -> Result<Json<Insight>> {
    let insight = InsightService::new(state.pool())
        .update(InsightId::new(id), user.id, &body)
        .await?;
    Ok(Json(insight))
}

/// DELETE /insights/:id
async fn delete(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i32>,
) -> Result<Json<Deleted>> {
    InsightService::new(state.pool())
        .delete(InsightId::new(id), user.id)
        .await?;
    Ok(Json(Deleted::new("Insight deleted successfully")))
}
