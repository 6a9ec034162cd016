//! Onboarding sessions, questions and answers.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::instrument;
use uuid::Uuid;

use looks_lab_core::{AnswerId, Domain, OnboardingStep, QuestionId, QuestionType, UserId};

use super::RepositoryError;
use crate::models::onboarding::AnsweredQuestion;
use crate::models::{OnboardingAnswer, OnboardingQuestion, OnboardingSession};

const SESSION_COLUMNS: &str =
    "id, user_id, selected_domain, is_paid, payment_confirmed_at, created_at, updated_at";
const QUESTION_COLUMNS: &str = "id, step, question, type, options, constraints, seq";

/// Step names in traversal order, bound as `text[]` for `array_position`.
fn step_order() -> Vec<&'static str> {
    OnboardingStep::ALL.iter().map(|step| step.as_str()).collect()
}

// =============================================================================
// Row types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    id: Uuid,
    user_id: Option<i32>,
    selected_domain: Option<String>,
    is_paid: bool,
    payment_confirmed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SessionRow> for OnboardingSession {
    fn from(row: SessionRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id.map(UserId::new),
            selected_domain: row.selected_domain,
            is_paid: row.is_paid,
            payment_confirmed_at: row.payment_confirmed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct QuestionRow {
    id: i32,
    step: OnboardingStep,
    question: String,
    #[sqlx(rename = "type")]
    kind: QuestionType,
    options: Option<Json<Vec<String>>>,
    constraints: Option<Value>,
    seq: i32,
}

impl From<QuestionRow> for OnboardingQuestion {
    fn from(row: QuestionRow) -> Self {
        Self {
            id: QuestionId::new(row.id),
            step: row.step,
            question: row.question,
            kind: row.kind,
            options: row.options.map(|Json(options)| options),
            constraints: row.constraints,
            seq: row.seq,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AnswerRow {
    id: i32,
    session_id: Uuid,
    question_id: i32,
    answer: Value,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AnswerRow> for OnboardingAnswer {
    fn from(row: AnswerRow) -> Self {
        Self {
            id: AnswerId::new(row.id),
            session_id: row.session_id,
            question_id: QuestionId::new(row.question_id),
            answer: row.answer,
            completed_at: row.completed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AnsweredQuestionRow {
    question_id: i32,
    question: String,
    step: OnboardingStep,
    answer: Value,
    completed_at: Option<DateTime<Utc>>,
}

impl From<AnsweredQuestionRow> for AnsweredQuestion {
    fn from(row: AnsweredQuestionRow) -> Self {
        Self {
            question_id: QuestionId::new(row.question_id),
            question: row.question,
            step: row.step,
            answer: row.answer,
            answered_at: row.completed_at,
        }
    }
}

/// A question definition loaded from a seed file.
#[derive(Debug, Clone)]
pub struct OnboardingQuestionSeed {
    pub step: OnboardingStep,
    pub question: String,
    pub kind: QuestionType,
    pub options: Option<Vec<String>>,
    pub constraints: Option<Value>,
    pub seq: i32,
}

// =============================================================================
// Repository
// =============================================================================

pub struct OnboardingRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OnboardingRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    // -------------------------------------------------------------------------
    // Sessions
    // -------------------------------------------------------------------------

    /// Start a new anonymous session.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create_session(&self) -> Result<OnboardingSession, RepositoryError> {
        let row = sqlx::query_as::<_, SessionRow>(&format!(
            "INSERT INTO onboarding_sessions (id) VALUES ($1) RETURNING {SESSION_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_session(&self, id: Uuid) -> Result<Option<OnboardingSession>, RepositoryError> {
        let row = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM onboarding_sessions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// The most recently touched session linked to a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn latest_session_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Option<OnboardingSession>, RepositoryError> {
        let row = sqlx::query_as::<_, SessionRow>(&format!(
            r"
            SELECT {SESSION_COLUMNS}
            FROM onboarding_sessions
            WHERE user_id = $1
            ORDER BY updated_at DESC
            LIMIT 1
            "
        ))
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Attach an anonymous session to a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the session is already linked.
    /// Returns `RepositoryError::NotFound` if the session doesn't exist.
    pub async fn link_to_user(
        &self,
        id: Uuid,
        user_id: UserId,
    ) -> Result<OnboardingSession, RepositoryError> {
        let row = sqlx::query_as::<_, SessionRow>(&format!(
            r"
            UPDATE onboarding_sessions
            SET user_id = $2, updated_at = NOW()
            WHERE id = $1 AND user_id IS NULL
            RETURNING {SESSION_COLUMNS}
            "
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(row) => Ok(row.into()),
            None if self.get_session(id).await?.is_some() => Err(RepositoryError::Conflict(
                "session already linked".to_owned(),
            )),
            None => Err(RepositoryError::NotFound),
        }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the session doesn't exist.
    pub async fn set_domain(
        &self,
        id: Uuid,
        domain: Domain,
    ) -> Result<OnboardingSession, RepositoryError> {
        let row = sqlx::query_as::<_, SessionRow>(&format!(
            r"
            UPDATE onboarding_sessions
            SET selected_domain = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {SESSION_COLUMNS}
            "
        ))
        .bind(id)
        .bind(domain)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Mark the session paid. The first confirmation time is kept.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the session doesn't exist.
    pub async fn confirm_payment(&self, id: Uuid) -> Result<OnboardingSession, RepositoryError> {
        let row = sqlx::query_as::<_, SessionRow>(&format!(
            r"
            UPDATE onboarding_sessions
            SET is_paid = TRUE,
                payment_confirmed_at = COALESCE(payment_confirmed_at, NOW()),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {SESSION_COLUMNS}
            "
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    // -------------------------------------------------------------------------
    // Questions
    // -------------------------------------------------------------------------

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_question(
        &self,
        id: QuestionId,
    ) -> Result<Option<OnboardingQuestion>, RepositoryError> {
        let row = sqlx::query_as::<_, QuestionRow>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM onboarding_questions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Every onboarding question in traversal order: by step, then `seq`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn all_questions(&self) -> Result<Vec<OnboardingQuestion>, RepositoryError> {
        let rows = sqlx::query_as::<_, QuestionRow>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM onboarding_questions \
             ORDER BY array_position($1::text[], step), seq, id"
        ))
        .bind(step_order())
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Insert or update a question keyed by `(step, seq)`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self, seed), fields(step = %seed.step, seq = seed.seq))]
    pub async fn upsert_question(
        &self,
        seed: &OnboardingQuestionSeed,
    ) -> Result<OnboardingQuestion, RepositoryError> {
        let row = sqlx::query_as::<_, QuestionRow>(&format!(
            r"
            INSERT INTO onboarding_questions (step, question, type, options, constraints, seq)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (step, seq) DO UPDATE
            SET question = EXCLUDED.question,
                type = EXCLUDED.type,
                options = EXCLUDED.options,
                constraints = EXCLUDED.constraints,
                updated_at = NOW()
            RETURNING {QUESTION_COLUMNS}
            "
        ))
        .bind(seed.step)
        .bind(&seed.question)
        .bind(seed.kind)
        .bind(seed.options.as_ref().map(Json))
        .bind(seed.constraints.as_ref())
        .bind(seed.seq)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    // -------------------------------------------------------------------------
    // Answers
    // -------------------------------------------------------------------------

    /// IDs of questions this session has answered.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn answered_question_ids(
        &self,
        session_id: Uuid,
    ) -> Result<Vec<QuestionId>, RepositoryError> {
        let ids: Vec<(i32,)> =
            sqlx::query_as("SELECT question_id FROM onboarding_answers WHERE session_id = $1")
                .bind(session_id)
                .fetch_all(self.pool)
                .await?;

        Ok(ids.into_iter().map(|(id,)| QuestionId::new(id)).collect())
    }

    /// Record an answer, replacing any earlier answer to the same question.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_answer(
        &self,
        session_id: Uuid,
        question_id: QuestionId,
        answer: &Value,
    ) -> Result<OnboardingAnswer, RepositoryError> {
        let row = sqlx::query_as::<_, AnswerRow>(
            r"
            INSERT INTO onboarding_answers (session_id, question_id, answer, completed_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (session_id, question_id) DO UPDATE
            SET answer = EXCLUDED.answer,
                completed_at = NOW(),
                updated_at = NOW()
            RETURNING id, session_id, question_id, answer, completed_at, created_at, updated_at
            ",
        )
        .bind(session_id)
        .bind(question_id)
        .bind(answer)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// All answers from every session linked to a user, with question text.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn answers_with_questions_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<AnsweredQuestion>, RepositoryError> {
        let rows = sqlx::query_as::<_, AnsweredQuestionRow>(
            r"
            SELECT q.id AS question_id, q.question, q.step, a.answer, a.completed_at
            FROM onboarding_answers a
            JOIN onboarding_sessions s ON s.id = a.session_id
            JOIN onboarding_questions q ON q.id = a.question_id
            WHERE s.user_id = $1
            ORDER BY array_position($2::text[], q.step), q.seq, a.completed_at
            ",
        )
        .bind(user_id)
        .bind(step_order())
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_order_follows_traversal_not_name() {
        let order = step_order();
        assert_eq!(order.first(), Some(&"profile_setup"));
        assert_eq!(order.last(), Some(&"experience_planning"));

        let mut by_name = order.clone();
        by_name.sort_unstable();
        assert_ne!(order, by_name);
    }
}
