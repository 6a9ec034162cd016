//! Workout and meal plans tailored to the signed-in user.

use sqlx::PgPool;
use tracing::instrument;

use looks_lab_core::UserId;

use crate::ai::GeminiClient;
use crate::ai::plans::diet::{self, DietProfile};
use crate::ai::plans::workout::{self, WorkoutProfile};
use crate::ai::plans::{MealPlan, MealPlanRequest, WorkoutPlan, WorkoutPlanRequest};
use crate::db::{OnboardingRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::models::User;
use crate::models::onboarding::AnsweredQuestion;

use super::onboarding::wellness_metrics;

pub struct PlanService<'a> {
    users: UserRepository<'a>,
    onboarding: OnboardingRepository<'a>,
    gemini: &'a GeminiClient,
}

impl<'a> PlanService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, gemini: &'a GeminiClient) -> Self {
        Self {
            users: UserRepository::new(pool),
            onboarding: OnboardingRepository::new(pool),
            gemini,
        }
    }

    async fn user_with_answers(&self, user_id: UserId) -> Result<(User, Vec<AnsweredQuestion>)> {
        let user = self
            .users
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        let answers = self.onboarding.answers_with_questions_for_user(user_id).await?;
        Ok((user, answers))
    }

    /// # Errors
    ///
    /// Returns `AppError::Unprocessable` for out-of-range options and
    /// `AppError::Ai` if generation fails.
    #[instrument(skip(self, request), fields(focus = request.focus.as_str()))]
    pub async fn workout_plan(
        &self,
        user_id: UserId,
        request: &WorkoutPlanRequest,
    ) -> Result<WorkoutPlan> {
        request.validate()?;
        let (user, answers) = self.user_with_answers(user_id).await?;
        let profile = WorkoutProfile::from_answers(user.age, user.gender, &answers);
        Ok(workout::generate(self.gemini, request, &profile).await?)
    }

    /// # Errors
    ///
    /// Returns `AppError::Unprocessable` for out-of-range options and
    /// `AppError::Ai` if generation fails.
    #[instrument(skip(self, request), fields(focus = request.focus.as_str()))]
    pub async fn meal_plan(&self, user_id: UserId, request: &MealPlanRequest) -> Result<MealPlan> {
        request.validate()?;
        let (user, answers) = self.user_with_answers(user_id).await?;
        let wellness = wellness_metrics(&answers, "");
        let profile = DietProfile::from_answers(
            user.age,
            user.gender.as_deref(),
            wellness.weight.as_ref(),
            wellness.height.as_ref(),
            &answers,
        );
        Ok(diet::generate(self.gemini, request, &profile).await?)
    }
}
