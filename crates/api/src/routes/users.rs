//! The signed-in user's account.

use axum::{Json, Router, extract::State, routing::get};

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::User;
use crate::models::user::UserUpdate;
use crate::services::UserService;
use crate::services::users::WeeklyProgress;
use crate::state::AppState;

use super::Deleted;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(me).patch(update_me).delete(delete_me))
        .route("/me/progress/weekly", get(weekly_progress))
}

/// GET /users/me
async fn me(State(state): State<AppState>, RequireAuth(user): RequireAuth) -> Result<Json<User>> {
    let user = UserService::new(state.pool()).get(user.id).await?;
    Ok(Json(user))
}

/// PATCH /users/me
async fn update_me(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(update): Json<UserUpdate>,
) -> Result<Json<User>> {
    let user = UserService::new(state.pool()).update(user.id, &update).await?;
    Ok(Json(user))
}

/// Delete the account and everything attached to it.
///
/// DELETE /users/me
async fn delete_me(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Deleted>> {
    UserService::new(state.pool()).delete(user.id).await?;
    Ok(Json(Deleted::new("User account deleted successfully")))
}

/// Home screen chart: cumulative domain completion, Monday to Sunday.
///
/// GET /users/me/progress/weekly
async fn weekly_progress(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<WeeklyProgress>> {
    let progress = UserService::new(state.pool()).weekly_progress(user.id).await?;
    Ok(Json(progress))
}
