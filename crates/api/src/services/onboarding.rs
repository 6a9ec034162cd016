//! Onboarding questionnaire flow.
//!
//! A session starts anonymous, walks the steps of [`OnboardingStep::ALL`]
//! in order, and is linked to a user after sign-in. Completing the last
//! step yields a redirect telling the client where to go next.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use looks_lab_core::{Domain, OnboardingStep, QuestionId, UserId};

use crate::db::{OnboardingRepository, RepositoryError, UserRepository};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::models::onboarding::AnsweredQuestion;
use crate::models::{OnboardingQuestion, OnboardingSession};

use super::quotes::daily_quote;

/// Steps whose answers feed the wellness overview.
const WELLNESS_STEPS: [OnboardingStep; 2] =
    [OnboardingStep::ProfileSetup, OnboardingStep::DailyLifestyle];

/// Where the client goes once onboarding is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Redirect {
    DomainSelection,
    InvalidDomain,
    PaymentRequired,
    LoginRequired,
    DomainFlow,
}

/// Decide the post-onboarding redirect. Rules apply in order.
#[must_use]
pub fn completion_redirect(session: &OnboardingSession) -> Redirect {
    let Some(domain) = session.selected_domain.as_deref() else {
        return Redirect::DomainSelection;
    };
    if Domain::parse(domain).is_err() {
        Redirect::InvalidDomain
    } else if !session.is_paid {
        Redirect::PaymentRequired
    } else if session.user_id.is_none() {
        Redirect::LoginRequired
    } else {
        Redirect::DomainFlow
    }
}

/// The next question to show, or the completion payload.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OnboardingFlow {
    InProgress {
        step: OnboardingStep,
        question: OnboardingQuestion,
        answered: Vec<QuestionId>,
        total: usize,
    },
    Completed {
        step: &'static str,
        answered: Vec<QuestionId>,
        total: usize,
        redirect: Redirect,
    },
}

impl OnboardingFlow {
    fn completed(redirect: Redirect) -> Self {
        Self::Completed {
            step: "completed",
            answered: Vec::new(),
            total: 0,
            redirect,
        }
    }
}

/// The question the flow shows next and the size of its step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextQuestion<'q> {
    pub step: OnboardingStep,
    pub question: &'q OnboardingQuestion,
    pub total: usize,
}

fn questions_in_step(
    questions: &[OnboardingQuestion],
    step: OnboardingStep,
) -> Vec<&OnboardingQuestion> {
    let mut in_step: Vec<_> = questions.iter().filter(|q| q.step == step).collect();
    in_step.sort_by_key(|q| (q.seq, q.id.as_i32()));
    in_step
}

/// Where the flow goes from `step`.
///
/// Gaps are only looked for in `step` itself. Once it is done, the first
/// question of the next step that has any is returned, skipping empty
/// steps. `None` means the last step is behind the user.
#[must_use]
pub fn next_step_question<'q>(
    step: OnboardingStep,
    questions: &'q [OnboardingQuestion],
    answered: &HashSet<QuestionId>,
) -> Option<NextQuestion<'q>> {
    let current = questions_in_step(questions, step);
    if let Some(question) = current.iter().copied().find(|q| !answered.contains(&q.id)) {
        return Some(NextQuestion {
            step,
            question,
            total: current.len(),
        });
    }

    let mut next = step.next();
    while let Some(next_step) = next {
        let upcoming = questions_in_step(questions, next_step);
        if let Some(question) = upcoming.first().copied() {
            return Some(NextQuestion {
                step: next_step,
                question,
                total: upcoming.len(),
            });
        }
        next = next_step.next();
    }
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SectionProgress {
    pub total: usize,
    pub answered: usize,
    pub completed: bool,
}

impl SectionProgress {
    #[must_use]
    pub const fn new(total: usize, answered: usize) -> Self {
        Self {
            total,
            answered,
            completed: total > 0 && answered == total,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OnboardingProgress {
    pub sections: BTreeMap<&'static str, SectionProgress>,
    pub overall: SectionProgress,
}

/// Per-step and overall progress for a set of answered question ids.
#[must_use]
pub fn progress(
    questions: &[OnboardingQuestion],
    answered: &HashSet<QuestionId>,
) -> OnboardingProgress {
    let sections = OnboardingStep::ALL
        .iter()
        .map(|step| {
            let in_step = questions.iter().filter(|q| q.step == *step);
            let total = in_step.clone().count();
            let done = in_step.filter(|q| answered.contains(&q.id)).count();
            (step.as_str(), SectionProgress::new(total, done))
        })
        .collect();

    let overall = SectionProgress::new(
        questions.len(),
        questions.iter().filter(|q| answered.contains(&q.id)).count(),
    );

    OnboardingProgress { sections, overall }
}

/// Home screen wellness figures pulled from onboarding answers.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WellnessMetrics {
    pub height: Option<Value>,
    pub weight: Option<Value>,
    pub sleep_hours: Option<Value>,
    pub water_intake: Option<Value>,
    pub daily_quote: &'static str,
}

/// Match answers to wellness metrics by keywords in the question text.
///
/// Later answers overwrite earlier ones for the same metric.
#[must_use]
pub fn wellness_metrics(answers: &[AnsweredQuestion], daily_quote: &'static str) -> WellnessMetrics {
    let mut metrics = WellnessMetrics {
        daily_quote,
        ..WellnessMetrics::default()
    };

    for answer in answers.iter().filter(|a| WELLNESS_STEPS.contains(&a.step)) {
        let text = answer.question.to_lowercase();
        let slot = if text.contains("height") {
            &mut metrics.height
        } else if text.contains("weight") {
            &mut metrics.weight
        } else if text.contains("sleep") {
            &mut metrics.sleep_hours
        } else if text.contains("water") {
            &mut metrics.water_intake
        } else {
            continue;
        };
        *slot = Some(answer.answer.clone());
    }

    metrics
}

#[derive(Debug, Serialize)]
pub struct SessionLinked {
    pub status: &'static str,
    pub user_id: UserId,
    pub session_id: Uuid,
    pub domain: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DomainSelected {
    pub status: &'static str,
    pub session_id: Uuid,
    pub domain: Domain,
}

#[derive(Debug, Serialize)]
pub struct PaymentConfirmed {
    pub status: &'static str,
    pub session_id: Uuid,
    pub is_paid: bool,
    pub domain: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserAnswers {
    pub user_id: UserId,
    pub answers: Vec<AnsweredQuestion>,
}

/// Onboarding service.
pub struct OnboardingService<'a> {
    onboarding: OnboardingRepository<'a>,
    users: UserRepository<'a>,
}

impl<'a> OnboardingService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            onboarding: OnboardingRepository::new(pool),
            users: UserRepository::new(pool),
        }
    }

    /// # Errors
    ///
    /// Returns `AppError::Database` if the insert fails.
    pub async fn create_session(&self) -> Result<OnboardingSession> {
        let session = self.onboarding.create_session().await?;
        tracing::info!(session_id = %session.id, "Created onboarding session");
        Ok(session)
    }

    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown session.
    pub async fn get_session(&self, id: Uuid) -> Result<OnboardingSession> {
        self.onboarding
            .get_session(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Onboarding session not found".to_string()))
    }

    /// Attach an anonymous session to a signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` if the session is already linked.
    #[instrument(skip(self))]
    pub async fn link_session(&self, session_id: Uuid, user_id: UserId) -> Result<SessionLinked> {
        let session = self
            .onboarding
            .link_to_user(session_id, user_id)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AppError::BadRequest(
                    "Session is already linked to a user account".to_string(),
                ),
                RepositoryError::NotFound => {
                    AppError::NotFound("Onboarding session not found".to_string())
                }
                other => other.into(),
            })?;

        tracing::info!("Linked onboarding session to user");
        Ok(SessionLinked {
            status: "linked",
            user_id,
            session_id: session.id,
            domain: session.selected_domain,
        })
    }

    /// # Errors
    ///
    /// Returns `AppError::InvalidDomain` for an unknown domain and
    /// `AppError::NotFound` for an unknown session.
    pub async fn select_domain(&self, session_id: Uuid, raw_domain: &str) -> Result<DomainSelected> {
        let domain = Domain::parse(raw_domain)?;
        let session = self
            .onboarding
            .set_domain(session_id, domain)
            .await
            .map_err(session_not_found)?;

        tracing::info!(session_id = %session.id, %domain, "Domain selected");
        Ok(DomainSelected {
            status: "domain_selected",
            session_id: session.id,
            domain,
        })
    }

    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown session.
    pub async fn confirm_payment(&self, session_id: Uuid) -> Result<PaymentConfirmed> {
        let session = self
            .onboarding
            .confirm_payment(session_id)
            .await
            .map_err(session_not_found)?;

        tracing::info!(session_id = %session.id, "Payment confirmed");
        Ok(PaymentConfirmed {
            status: "payment_confirmed",
            session_id: session.id,
            is_paid: session.is_paid,
            domain: session.selected_domain,
        })
    }

    /// Validate and store an answer, replacing any earlier one. Returns the
    /// question answered so the caller can continue from its step.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown session or question and
    /// `AppError::InvalidAnswer` if the answer doesn't fit the question.
    #[instrument(skip(self, answer))]
    pub async fn save_answer(
        &self,
        session_id: Uuid,
        question_id: QuestionId,
        answer: &Value,
    ) -> Result<OnboardingQuestion> {
        self.get_session(session_id).await?;
        let question = self
            .onboarding
            .get_question(question_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Question not found".to_string()))?;

        question.validate(answer)?;

        self.onboarding
            .upsert_answer(session_id, question_id, answer)
            .await?;

        let question_key = question_id.to_string();
        add_breadcrumb(
            "onboarding",
            "Answer saved",
            Some(&[
                ("step", question.step.as_str()),
                ("question_id", question_key.as_str()),
            ]),
        );
        Ok(question)
    }

    /// The first unanswered question from `step` onwards, or the completion
    /// payload when every remaining step is done.
    ///
    /// Only the requested step is searched for gaps; past it, the first
    /// question of the next step with questions is returned.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown session.
    #[instrument(skip(self))]
    pub async fn next_or_complete(
        &self,
        session_id: Uuid,
        step: OnboardingStep,
    ) -> Result<OnboardingFlow> {
        let session = self.get_session(session_id).await?;
        let answered: HashSet<QuestionId> = self
            .onboarding
            .answered_question_ids(session_id)
            .await?
            .into_iter()
            .collect();

        let questions = self.onboarding.all_questions().await?;
        match next_step_question(step, &questions, &answered) {
            Some(next) => Ok(in_progress(
                next.step,
                next.question.clone(),
                &answered,
                next.total,
            )),
            None => self.complete(&session).await,
        }
    }

    async fn complete(&self, session: &OnboardingSession) -> Result<OnboardingFlow> {
        if let Some(user_id) = session.user_id {
            self.users.mark_onboarding_complete(user_id).await?;
            tracing::info!(%user_id, "Marked onboarding complete");
        }

        let redirect = completion_redirect(session);
        tracing::info!(session_id = %session.id, ?redirect, "Onboarding completed");
        Ok(OnboardingFlow::completed(redirect))
    }

    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown session.
    pub async fn calculate_progress(&self, session_id: Uuid) -> Result<OnboardingProgress> {
        self.get_session(session_id).await?;
        let questions = self.onboarding.all_questions().await?;
        let answered: HashSet<QuestionId> = self
            .onboarding
            .answered_question_ids(session_id)
            .await?
            .into_iter()
            .collect();

        Ok(progress(&questions, &answered))
    }

    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn user_answers(&self, user_id: UserId) -> Result<UserAnswers> {
        let answers = self.onboarding.answers_with_questions_for_user(user_id).await?;
        Ok(UserAnswers { user_id, answers })
    }

    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn wellness(&self, user_id: UserId) -> Result<WellnessMetrics> {
        let answers = self.onboarding.answers_with_questions_for_user(user_id).await?;
        let metrics = wellness_metrics(&answers, daily_quote());
        tracing::debug!(%user_id, "Fetched wellness metrics");
        Ok(metrics)
    }
}

fn in_progress(
    step: OnboardingStep,
    question: OnboardingQuestion,
    answered: &HashSet<QuestionId>,
    total: usize,
) -> OnboardingFlow {
    let mut answered: Vec<QuestionId> = answered.iter().copied().collect();
    answered.sort_by_key(QuestionId::as_i32);
    OnboardingFlow::InProgress {
        step,
        question,
        answered,
        total,
    }
}

fn session_not_found(err: RepositoryError) -> AppError {
    match err {
        RepositoryError::NotFound => AppError::NotFound("Onboarding session not found".to_string()),
        other => other.into(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use looks_lab_core::QuestionType;
    use serde_json::json;

    use super::*;

    fn session(domain: Option<&str>, is_paid: bool, user: Option<i32>) -> OnboardingSession {
        let now = Utc::now();
        OnboardingSession {
            id: Uuid::new_v4(),
            user_id: user.map(UserId::new),
            selected_domain: domain.map(String::from),
            is_paid,
            payment_confirmed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn question(id: i32, step: OnboardingStep, seq: i32) -> OnboardingQuestion {
        OnboardingQuestion {
            id: QuestionId::new(id),
            step,
            question: format!("Question {id}"),
            kind: QuestionType::Text,
            options: None,
            constraints: None,
            seq,
        }
    }

    fn answered(text: &str, step: OnboardingStep, answer: Value) -> AnsweredQuestion {
        AnsweredQuestion {
            question_id: QuestionId::new(1),
            question: text.to_string(),
            step,
            answer,
            answered_at: None,
        }
    }

    #[test]
    fn test_redirect_rules_apply_in_order() {
        assert_eq!(
            completion_redirect(&session(None, true, Some(1))),
            Redirect::DomainSelection
        );
        assert_eq!(
            completion_redirect(&session(Some("yoga"), true, Some(1))),
            Redirect::InvalidDomain
        );
        assert_eq!(
            completion_redirect(&session(Some("skincare"), false, None)),
            Redirect::PaymentRequired
        );
        assert_eq!(
            completion_redirect(&session(Some("quit porn"), true, None)),
            Redirect::LoginRequired
        );
        assert_eq!(
            completion_redirect(&session(Some("diet"), true, Some(7))),
            Redirect::DomainFlow
        );
    }

    #[test]
    fn test_next_question_fills_gaps_in_current_step() {
        let questions = vec![
            question(1, OnboardingStep::ProfileSetup, 1),
            question(2, OnboardingStep::ProfileSetup, 2),
            question(3, OnboardingStep::DailyLifestyle, 1),
        ];
        let answered = HashSet::from([QuestionId::new(1)]);

        let next = next_step_question(OnboardingStep::ProfileSetup, &questions, &answered).unwrap();
        assert_eq!(next.step, OnboardingStep::ProfileSetup);
        assert_eq!(next.question.id, QuestionId::new(2));
        assert_eq!(next.total, 2);
    }

    #[test]
    fn test_next_question_skips_empty_steps() {
        let questions = vec![
            question(1, OnboardingStep::ProfileSetup, 1),
            question(7, OnboardingStep::GoalsFocus, 2),
            question(6, OnboardingStep::GoalsFocus, 1),
        ];
        let answered = HashSet::from([QuestionId::new(1)]);

        // daily_lifestyle and motivation have no questions
        let next = next_step_question(OnboardingStep::ProfileSetup, &questions, &answered).unwrap();
        assert_eq!(next.step, OnboardingStep::GoalsFocus);
        assert_eq!(next.question.id, QuestionId::new(6));
        assert_eq!(next.total, 2);
    }

    #[test]
    fn test_next_question_ends_only_after_last_step() {
        let questions = vec![
            question(1, OnboardingStep::Motivation, 1),
            question(2, OnboardingStep::ExperiencePlanning, 1),
        ];
        let answered = HashSet::from([QuestionId::new(1)]);
        let next = next_step_question(OnboardingStep::Motivation, &questions, &answered).unwrap();
        assert_eq!(next.step, OnboardingStep::ExperiencePlanning);

        let all = HashSet::from([QuestionId::new(1), QuestionId::new(2)]);
        assert!(next_step_question(OnboardingStep::ExperiencePlanning, &questions, &all).is_none());
        // A later step is offered even when it was already answered
        let next = next_step_question(OnboardingStep::Motivation, &questions, &all).unwrap();
        assert_eq!(next.question.id, QuestionId::new(2));
    }

    #[test]
    fn test_progress_counts_sections_and_overall() {
        let questions = vec![
            question(1, OnboardingStep::ProfileSetup, 1),
            question(2, OnboardingStep::ProfileSetup, 2),
            question(3, OnboardingStep::Motivation, 1),
        ];
        let answered = HashSet::from([QuestionId::new(1), QuestionId::new(2)]);

        let result = progress(&questions, &answered);
        assert_eq!(result.sections.len(), OnboardingStep::ALL.len());
        assert_eq!(
            result.sections["profile_setup"],
            SectionProgress {
                total: 2,
                answered: 2,
                completed: true
            }
        );
        assert!(!result.sections["motivation"].completed);
        assert!(!result.sections["goals_focus"].completed);
        assert_eq!(result.sections["goals_focus"].total, 0);
        assert_eq!(result.overall.answered, 2);
        assert!(!result.overall.completed);
    }

    #[test]
    fn test_empty_questionnaire_is_not_completed() {
        let result = progress(&[], &HashSet::new());
        assert!(!result.overall.completed);
    }

    #[test]
    fn test_wellness_metrics_match_keywords() {
        let answers = vec![
            answered("What is your height?", OnboardingStep::ProfileSetup, json!("180 cm")),
            answered("Your weight in kg", OnboardingStep::ProfileSetup, json!(72)),
            answered("Hours of sleep per night", OnboardingStep::DailyLifestyle, json!("7-8")),
            answered("Glasses of water a day", OnboardingStep::DailyLifestyle, json!(6)),
            answered("Favourite sport", OnboardingStep::DailyLifestyle, json!("tennis")),
        ];

        let metrics = wellness_metrics(&answers, "Trust The Process.");
        assert_eq!(metrics.height, Some(json!("180 cm")));
        assert_eq!(metrics.weight, Some(json!(72)));
        assert_eq!(metrics.sleep_hours, Some(json!("7-8")));
        assert_eq!(metrics.water_intake, Some(json!(6)));
        assert_eq!(metrics.daily_quote, "Trust The Process.");
    }

    #[test]
    fn test_wellness_ignores_other_steps() {
        let answers = vec![answered(
            "What height do you want to reach?",
            OnboardingStep::GoalsFocus,
            json!("190 cm"),
        )];
        assert!(wellness_metrics(&answers, "q").height.is_none());
    }

    #[test]
    fn test_flow_serializes_with_status_tag() {
        let flow = OnboardingFlow::completed(Redirect::PaymentRequired);
        let value = serde_json::to_value(&flow).unwrap();
        assert_eq!(value["status"], "completed");
        assert_eq!(value["step"], "completed");
        assert_eq!(value["total"], 0);
        assert_eq!(value["redirect"], "payment_required");
        assert_eq!(value["answered"], json!([]));

        let flow = in_progress(
            OnboardingStep::Motivation,
            question(5, OnboardingStep::Motivation, 1),
            &HashSet::from([QuestionId::new(3), QuestionId::new(1)]),
            4,
        );
        let value = serde_json::to_value(&flow).unwrap();
        assert_eq!(value["status"], "in_progress");
        assert_eq!(value["step"], "motivation");
        assert_eq!(value["question"]["id"], 5);
        assert_eq!(value["answered"], json!([1, 3]));
    }
}
