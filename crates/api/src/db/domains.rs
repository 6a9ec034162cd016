//! Domain questionnaire questions and answers.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::instrument;

use looks_lab_core::{AnswerId, Domain, QuestionId, QuestionType, UserId};

use super::RepositoryError;
use crate::models::{DomainAnswer, DomainQuestion};

const QUESTION_COLUMNS: &str = "id, domain, question, type, options, constraints, seq";
const ANSWER_COLUMNS: &str =
    "id, user_id, question_id, domain, answer, completed_at, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct QuestionRow {
    id: i32,
    domain: Domain,
    question: String,
    #[sqlx(rename = "type")]
    kind: QuestionType,
    options: Option<Json<Vec<String>>>,
    constraints: Option<Value>,
    seq: i32,
}

impl From<QuestionRow> for DomainQuestion {
    fn from(row: QuestionRow) -> Self {
        Self {
            id: QuestionId::new(row.id),
            domain: row.domain,
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
    user_id: i32,
    question_id: i32,
    domain: String,
    answer: Value,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AnswerRow> for DomainAnswer {
    type Error = RepositoryError;

    fn try_from(row: AnswerRow) -> Result<Self, Self::Error> {
        let domain = Domain::parse(&row.domain).map_err(|e| {
            RepositoryError::DataCorruption(format!("answer {} has {e}", row.id))
        })?;

        Ok(Self {
            id: AnswerId::new(row.id),
            user_id: UserId::new(row.user_id),
            question_id: QuestionId::new(row.question_id),
            domain,
            answer: row.answer,
            completed_at: row.completed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// A question and the user's answer to it, in questionnaire order.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct AnsweredDomainQuestion {
    pub question_id: QuestionId,
    #[serde(skip)]
    pub seq: i32,
    pub question: String,
    pub answer: Value,
    pub answered_at: Option<DateTime<Utc>>,
}

/// A question definition loaded from a seed file.
#[derive(Debug, Clone)]
pub struct DomainQuestionSeed {
    pub domain: Domain,
    pub question: String,
    pub kind: QuestionType,
    pub options: Option<Vec<String>>,
    pub constraints: Option<Value>,
    pub seq: i32,
}

pub struct DomainRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DomainRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Questions of a domain, in `seq` order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn questions_for_domain(
        &self,
        domain: Domain,
    ) -> Result<Vec<DomainQuestion>, RepositoryError> {
        let rows = sqlx::query_as::<_, QuestionRow>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM domain_questions WHERE domain = $1 ORDER BY seq, id"
        ))
        .bind(domain)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_question(
        &self,
        id: QuestionId,
    ) -> Result<Option<DomainQuestion>, RepositoryError> {
        let row = sqlx::query_as::<_, QuestionRow>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM domain_questions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Insert or update a question keyed by `(domain, question)`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self, seed), fields(domain = %seed.domain, seq = seed.seq))]
    pub async fn upsert_question(
        &self,
        seed: &DomainQuestionSeed,
    ) -> Result<DomainQuestion, RepositoryError> {
        let row = sqlx::query_as::<_, QuestionRow>(&format!(
            r"
            INSERT INTO domain_questions (domain, question, type, options, constraints, seq)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (domain, question) DO UPDATE
            SET type = EXCLUDED.type,
                options = EXCLUDED.options,
                constraints = EXCLUDED.constraints,
                seq = EXCLUDED.seq,
                updated_at = NOW()
            RETURNING {QUESTION_COLUMNS}
            "
        ))
        .bind(seed.domain)
        .bind(&seed.question)
        .bind(seed.kind)
        .bind(seed.options.as_ref().map(Json))
        .bind(seed.constraints.as_ref())
        .bind(seed.seq)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// A user's answers in one domain.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn answers_for_user(
        &self,
        user_id: UserId,
        domain: Domain,
    ) -> Result<Vec<DomainAnswer>, RepositoryError> {
        let rows = sqlx::query_as::<_, AnswerRow>(&format!(
            r"
            SELECT {ANSWER_COLUMNS}
            FROM domain_answers
            WHERE user_id = $1 AND domain = $2
            ORDER BY question_id
            "
        ))
        .bind(user_id)
        .bind(domain)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// IDs of questions the user has answered in a domain.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn answered_question_ids(
        &self,
        user_id: UserId,
        domain: Domain,
    ) -> Result<Vec<QuestionId>, RepositoryError> {
        let ids: Vec<(i32,)> = sqlx::query_as(
            "SELECT question_id FROM domain_answers WHERE user_id = $1 AND domain = $2",
        )
        .bind(user_id)
        .bind(domain)
        .fetch_all(self.pool)
        .await?;

        Ok(ids.into_iter().map(|(id,)| QuestionId::new(id)).collect())
    }

    /// Number of domain questions across every domain.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_all_questions(&self) -> Result<i64, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM domain_questions")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// When each of a user's domain answers was completed, oldest first.
    /// Answers without a completion time are left out.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn completion_times(
        &self,
        user_id: UserId,
    ) -> Result<Vec<DateTime<Utc>>, RepositoryError> {
        let rows: Vec<(DateTime<Utc>,)> = sqlx::query_as(
            r"
            SELECT completed_at
            FROM domain_answers
            WHERE user_id = $1 AND completed_at IS NOT NULL
            ORDER BY completed_at
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(|(at,)| at).collect())
    }

    /// Answers joined with their questions, in questionnaire order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn answered_questions(
        &self,
        user_id: UserId,
        domain: Domain,
    ) -> Result<Vec<AnsweredDomainQuestion>, RepositoryError> {
        let rows = sqlx::query_as::<_, AnsweredDomainQuestion>(
            r"
            SELECT q.id AS question_id, q.seq, q.question, a.answer, a.completed_at AS answered_at
            FROM domain_answers a
            JOIN domain_questions q ON q.id = a.question_id
            WHERE a.user_id = $1 AND a.domain = $2
            ORDER BY q.seq, q.id
            ",
        )
        .bind(user_id)
        .bind(domain)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Record an answer, replacing any earlier answer to the same question.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_answer(
        &self,
        user_id: UserId,
        question_id: QuestionId,
        domain: Domain,
        answer: &Value,
    ) -> Result<DomainAnswer, RepositoryError> {
        let row = sqlx::query_as::<_, AnswerRow>(&format!(
            r"
            INSERT INTO domain_answers (user_id, question_id, domain, answer, completed_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (user_id, question_id) DO UPDATE
            SET answer = EXCLUDED.answer,
                domain = EXCLUDED.domain,
                completed_at = NOW(),
                updated_at = NOW()
            RETURNING {ANSWER_COLUMNS}
            "
        ))
        .bind(user_id)
        .bind(question_id)
        .bind(domain)
        .bind(answer)
        .fetch_one(self.pool)
        .await?;

        row.try_into()
    }
}
