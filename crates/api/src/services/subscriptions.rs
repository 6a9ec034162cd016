//! Subscriptions, one per user.

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;

use looks_lab_core::{PlanType, SubscriptionId, SubscriptionStatus, UserId};

use crate::db::{RepositoryError, SubscriptionRepository};
use crate::error::{AppError, Result};
use crate::models::Subscription;

/// When a plan bought at `start` runs out.
#[must_use]
pub fn plan_end(plan: PlanType, start: DateTime<Utc>) -> DateTime<Utc> {
    let days = match plan {
        PlanType::Weekly => 7,
        PlanType::Monthly => 30,
        PlanType::Yearly => 365,
    };
    start + Duration::days(days)
}

pub struct SubscriptionService<'a> {
    subscriptions: SubscriptionRepository<'a>,
}

impl<'a> SubscriptionService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            subscriptions: SubscriptionRepository::new(pool),
        }
    }

    /// Start an active subscription ending one plan period from now.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Conflict` if the user already has a subscription.
    pub async fn create(&self, user_id: UserId, plan: PlanType) -> Result<Subscription> {
        let subscription = self
            .subscriptions
            .create(user_id, plan, Some(plan_end(plan, Utc::now())))
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => {
                    AppError::Conflict("User already has a subscription".to_string())
                }
                other => other.into(),
            })?;

        tracing::info!(%user_id, %plan, "Created subscription");
        Ok(subscription)
    }

    /// The user's subscription, with its status read as expired when the
    /// end date has passed.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the user has none.
    pub async fn for_user(&self, user_id: UserId) -> Result<Subscription> {
        let mut subscription = self
            .subscriptions
            .get_for_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("No subscription found".to_string()))?;

        subscription.status = subscription.effective_status(Utc::now());
        Ok(subscription)
    }

    /// # Errors
    ///
    /// Returns `AppError::NotFound` for a missing subscription and
    /// `AppError::Forbidden` for someone else's.
    pub async fn cancel(&self, id: SubscriptionId, user_id: UserId) -> Result<Subscription> {
        let subscription = self
            .subscriptions
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Subscription not found".to_string()))?;

        if subscription.user_id != user_id {
            return Err(AppError::Forbidden("Not authorized".to_string()));
        }

        let cancelled = self
            .subscriptions
            .set_status(id, SubscriptionStatus::Cancelled)
            .await?;
        tracing::info!(subscription_id = %id, "Cancelled subscription");
        Ok(cancelled)
    }
}
