//! Domain questionnaire types.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use looks_lab_core::{
    AnswerError, AnswerId, Domain, QuestionId, QuestionType, UserId, validate_answer,
};

#[derive(Debug, Clone, Serialize)]
pub struct DomainQuestion {
    pub id: QuestionId,
    pub domain: Domain,
    pub question: String,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    pub options: Option<Vec<String>>,
    pub constraints: Option<Value>,
    pub seq: i32,
}

impl DomainQuestion {
    /// Check an answer against this question's type, options and constraints.
    ///
    /// # Errors
    ///
    /// Returns the first rule the answer violates.
    pub fn validate(&self, answer: &Value) -> Result<(), AnswerError> {
        validate_answer(
            self.kind,
            self.options.as_deref(),
            self.constraints.as_ref(),
            answer,
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DomainAnswer {
    pub id: AnswerId,
    pub user_id: UserId,
    pub question_id: QuestionId,
    pub domain: Domain,
    pub answer: Value,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
