//! Onboarding session routes.
//!
//! Sessions are anonymous until linked, so only the link and `users/me`
//! routes require a token.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use looks_lab_core::{OnboardingStep, QuestionId};

use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::OnboardingSession;
use crate::services::OnboardingService;
use crate::services::onboarding::{
    DomainSelected, OnboardingFlow, OnboardingProgress, PaymentConfirmed, SessionLinked,
    UserAnswers, WellnessMetrics,
};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sessions", post(create_session))
        .route("/sessions/{id}", get(get_session))
        .route("/sessions/{id}/flow", get(flow))
        .route("/sessions/{id}/answers", post(submit_answer))
        .route("/sessions/{id}/progress", get(progress))
        .route("/sessions/{id}/domain", patch(select_domain))
        .route("/sessions/{id}/payment", patch(confirm_payment))
        .route("/sessions/{id}/link", patch(link_session))
        .route("/users/me/answers", get(my_answers))
        .route("/users/me/wellness", get(my_wellness))
}

#[derive(Debug, Deserialize)]
pub struct FlowQuery {
    pub step: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DomainQuery {
    pub domain: String,
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub question_id: QuestionId,
    pub answer: Value,
}

/// Parse the `step` query parameter. A missing step means the first one.
fn parse_step(raw: Option<&str>) -> Result<OnboardingStep> {
    raw.map_or(Ok(OnboardingStep::first()), |raw| {
        raw.parse().map_err(|_| {
            AppError::BadRequest(format!(
                "Invalid step '{raw}'. Must be one of: {}",
                OnboardingStep::ALL
                    .iter()
                    .map(|step| step.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        })
    })
}

/// Start an anonymous session.
///
/// POST /onboarding/sessions
async fn create_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<OnboardingSession>)> {
    let session = OnboardingService::new(state.pool()).create_session().await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// GET /onboarding/sessions/:id
async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<OnboardingSession>> {
    let session = OnboardingService::new(state.pool()).get_session(id).await?;
    Ok(Json(session))
}

/// Next question from `step` onwards, or the completion redirect.
///
/// GET /onboarding/sessions/:id/flow?step=
async fn flow(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<FlowQuery>,
) -> Result<Json<OnboardingFlow>> {
    let step = parse_step(query.step.as_deref())?;
    let flow = OnboardingService::new(state.pool())
        .next_or_complete(id, step)
        .await?;
    Ok(Json(flow))
}

/// Save an answer and return what comes next.
///
/// POST /onboarding/sessions/:id/answers
async fn submit_answer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<AnswerRequest>,
) -> Result<Json<OnboardingFlow>> {
    let service = OnboardingService::new(state.pool());
    let question = service.save_answer(id, body.question_id, &body.answer).await?;
    let flow = service.next_or_complete(id, question.step).await?;
    Ok(Json(flow))
}

/// GET /onboarding/sessions/:id/progress
async fn progress(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<OnboardingProgress>> {
    let progress = OnboardingService::new(state.pool())
        .calculate_progress(id)
        .await?;
    Ok(Json(progress))
}

/// PATCH /onboarding/sessions/:id/domain?domain=
async fn select_domain(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<DomainQuery>,
) -> Result<Json<DomainSelected>> {
    let selected = OnboardingService::new(state.pool())
        .select_domain(id, &query.domain)
        .await?;
    Ok(Json(selected))
}

/// PATCH /onboarding/sessions/:id/payment
async fn confirm_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PaymentConfirmed>> {
    let confirmed = OnboardingService::new(state.pool())
        .confirm_payment(id)
        .await?;
    Ok(Json(confirmed))
}

/// Attach the session to the signed-in user.
///
/// PATCH /onboarding/sessions/:id/link
async fn link_session(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionLinked>> {
    let linked = OnboardingService::new(state.pool())
        .link_session(id, user.id)
        .await?;
    Ok(Json(linked))
}

/// GET /onboarding/users/me/answers
async fn my_answers(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<UserAnswers>> {
    let answers = OnboardingService::new(state.pool())
        .user_answers(user.id)
        .await?;
    Ok(Json(answers))
}

/// GET /onboarding/users/me/wellness
async fn my_wellness(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<WellnessMetrics>> {
    let metrics = OnboardingService::new(state.pool()).wellness(user.id).await?;
    Ok(Json(metrics))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_step_defaults_to_first() {
        assert_eq!(parse_step(None).unwrap(), OnboardingStep::first());
    }

    #[test]
    fn test_parse_step_accepts_known_steps() {
        for &step in OnboardingStep::ALL {
            assert_eq!(parse_step(Some(step.as_str())).unwrap(), step);
        }
    }

    #[test]
    fn test_parse_step_rejects_unknown() {
        let err = parse_step(Some("warmup")).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(msg) if msg.starts_with("Invalid step 'warmup'")));
    }
}
