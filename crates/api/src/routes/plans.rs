//! On-demand workout and meal plans, merged under `/domains`.

use axum::{Json, Router, extract::State, routing::post};

use crate::ai::plans::{MealPlan, MealPlanRequest, WorkoutPlan, WorkoutPlanRequest};
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::services::PlanService;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/workout/generate-plan", post(workout_plan))
        .route("/diet/generate-meal-plan", post(meal_plan))
}

/// POST /domains/workout/generate-plan
async fn workout_plan(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<WorkoutPlanRequest>,
) -> Result<Json<WorkoutPlan>> {
    let plan = PlanService::new(state.pool(), state.gemini())
        .workout_plan(user.id, &request)
        .await?;
    Ok(Json(plan))
}

/// POST /domains/diet/generate-meal-plan
async fn meal_plan(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<MealPlanRequest>,
) -> Result<Json<MealPlan>> {
    let plan = PlanService::new(state.pool(), state.gemini())
        .meal_plan(user.id, &request)
        .await?;
    Ok(Json(plan))
}
