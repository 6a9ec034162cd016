//! Onboarding questionnaire types.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use looks_lab_core::{
    AnswerError, AnswerId, OnboardingStep, QuestionId, QuestionType, UserId, validate_answer,
};

/// An onboarding run. Starts anonymous and is linked to a user after sign-in.
///
/// `selected_domain` is kept as the raw stored string so a value that no
/// longer parses can be reported as `invalid_domain` instead of failing the
/// whole session load.
#[derive(Debug, Clone, Serialize)]
pub struct OnboardingSession {
    pub id: Uuid,
    pub user_id: Option<UserId>,
    pub selected_domain: Option<String>,
    pub is_paid: bool,
    pub payment_confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OnboardingQuestion {
    pub id: QuestionId,
    pub step: OnboardingStep,
    pub question: String,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    pub options: Option<Vec<String>>,
    pub constraints: Option<Value>,
    pub seq: i32,
}

impl OnboardingQuestion {
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
pub struct OnboardingAnswer {
    pub id: AnswerId,
    pub session_id: Uuid,
    pub question_id: QuestionId,
    pub answer: Value,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An answer joined with the question it responds to.
#[derive(Debug, Clone, Serialize)]
pub struct AnsweredQuestion {
    pub question_id: QuestionId,
    pub question: String,
    pub step: OnboardingStep,
    pub answer: Value,
    pub answered_at: Option<DateTime<Utc>>,
}
