//! Domain questionnaire routes.
//!
//! The `{domain}` segment is parsed by hand so an unknown domain answers 422
//! with the list of valid ones.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use looks_lab_core::{Domain, QuestionId, UserId};

use crate::ai::AiOutput;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::DomainQuestion;
use crate::services::DomainService;
use crate::services::domains::{AllDomainsProgress, DomainAnswers, DomainFlow, DomainProgress};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/progress", get(all_progress))
        .route("/{domain}/questions", get(questions))
        .route("/{domain}/flow", get(flow))
        .route("/{domain}/answers", post(submit_answer).get(answers))
        .route("/{domain}/progress", get(progress))
        .route("/{domain}/retry-ai", post(retry_ai))
        .route("/{domain}/access", get(access))
}

#[derive(Debug, Deserialize)]
pub struct DomainAnswerRequest {
    pub question_id: QuestionId,
    pub answer: Value,
}

#[derive(Debug, Serialize)]
pub struct AccessStatus {
    pub has_access: bool,
    pub domain: Domain,
    pub user_id: UserId,
    pub message: String,
}

impl AccessStatus {
    fn from_check(domain: Domain, user_id: UserId, check: Result<()>) -> Result<Self> {
        let (has_access, message) = match check {
            Ok(()) => (true, "Access granted".to_string()),
            Err(AppError::PaymentRequired(msg) | AppError::Forbidden(msg)) => (false, msg),
            Err(e) => return Err(e),
        };
        Ok(Self {
            has_access,
            domain,
            user_id,
            message,
        })
    }
}

/// GET /domains/progress
async fn all_progress(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<AllDomainsProgress>> {
    let progress = DomainService::new(state.pool(), state.gemini())
        .all_domains_progress(user.id)
        .await?;
    Ok(Json(progress))
}

/// GET /domains/:domain/questions
async fn questions(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Path(domain): Path<String>,
) -> Result<Json<Vec<DomainQuestion>>> {
    let domain = Domain::parse(&domain)?;
    let questions = DomainService::new(state.pool(), state.gemini())
        .questions(domain)
        .await?;
    Ok(Json(questions))
}

/// Next unanswered question, or the analysis when all are answered.
///
/// GET /domains/:domain/flow
async fn flow(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(domain): Path<String>,
) -> Result<Json<DomainFlow>> {
    let domain = Domain::parse(&domain)?;
    let service = DomainService::new(state.pool(), state.gemini());
    service.check_domain_access(user.id, domain).await?;

    let flow = service.next_or_complete(user.id, domain).await?;
    Ok(Json(flow))
}

/// Save an answer and return what comes next.
///
/// POST /domains/:domain/answers
async fn submit_answer(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(domain): Path<String>,
    Json(body): Json<DomainAnswerRequest>,
) -> Result<Json<DomainFlow>> {
    let domain = Domain::parse(&domain)?;
    let service = DomainService::new(state.pool(), state.gemini());
    service.check_domain_access(user.id, domain).await?;

    service
        .save_answer(user.id, domain, body.question_id, &body.answer)
        .await?;
    let flow = service.next_or_complete(user.id, domain).await?;
    Ok(Json(flow))
}

/// GET /domains/:domain/answers
async fn answers(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(domain): Path<String>,
) -> Result<Json<DomainAnswers>> {
    let domain = Domain::parse(&domain)?;
    let answers = DomainService::new(state.pool(), state.gemini())
        .user_answers(user.id, domain)
        .await?;
    Ok(Json(answers))
}

/// GET /domains/:domain/progress
async fn progress(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(domain): Path<String>,
) -> Result<Json<DomainProgress>> {
    let domain = Domain::parse(&domain)?;
    let progress = DomainService::new(state.pool(), state.gemini())
        .calculate_progress(user.id, domain)
        .await?;
    Ok(Json(progress))
}

/// Rerun the AI analysis. Model failures surface as errors here.
///
/// POST /domains/:domain/retry-ai
async fn retry_ai(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(domain): Path<String>,
) -> Result<Json<AiOutput>> {
    let domain = Domain::parse(&domain)?;
    let service = DomainService::new(state.pool(), state.gemini());
    service.check_domain_access(user.id, domain).await?;

    let output = service.retry_ai(user.id, domain).await?;
    Ok(Json(output))
}

/// Whether the user may use a domain, with the reason when not.
///
/// GET /domains/:domain/access
async fn access(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(domain): Path<String>,
) -> Result<Json<AccessStatus>> {
    let domain = Domain::parse(&domain)?;
    let check = DomainService::new(state.pool(), state.gemini())
        .check_domain_access(user.id, domain)
        .await;
    Ok(Json(AccessStatus::from_check(domain, user.id, check)?))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_access_status_granted() {
        let status = AccessStatus::from_check(Domain::Diet, UserId::new(4), Ok(())).unwrap();
        assert!(status.has_access);
        assert_eq!(status.message, "Access granted");
    }

    #[test]
    fn test_access_status_denied_carries_reason() {
        let status = AccessStatus::from_check(
            Domain::Skincare,
            UserId::new(4),
            Err(AppError::PaymentRequired("Payment not completed".to_string())),
        )
        .unwrap();
        assert!(!status.has_access);
        assert_eq!(status.message, "Payment not completed");

        let status = AccessStatus::from_check(
            Domain::Skincare,
            UserId::new(4),
            Err(AppError::Forbidden("No onboarding session found".to_string())),
        )
        .unwrap();
        assert!(!status.has_access);
    }

    #[test]
    fn test_access_status_passes_through_server_errors() {
        let result = AccessStatus::from_check(
            Domain::Height,
            UserId::new(4),
            Err(AppError::Internal("pool closed".to_string())),
        );
        assert!(matches!(result, Err(AppError::Internal(_))));
    }
}
