//! Subscription repository. One subscription row per user.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use looks_lab_core::{PlanType, SubscriptionId, SubscriptionStatus, UserId};

use super::RepositoryError;
use crate::models::Subscription;

const SUBSCRIPTION_COLUMNS: &str = "id, user_id, plan, status, payment_id, start_date, end_date, \
     trial_end, cancelled_at, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: i32,
    user_id: i32,
    plan: PlanType,
    status: SubscriptionStatus,
    payment_id: Option<String>,
    start_date: DateTime<Utc>,
    end_date: Option<DateTime<Utc>>,
    trial_end: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SubscriptionRow> for Subscription {
    fn from(row: SubscriptionRow) -> Self {
        Self {
            id: SubscriptionId::new(row.id),
            user_id: UserId::new(row.user_id),
            plan: row.plan,
            status: row.status,
            payment_id: row.payment_id,
            start_date: row.start_date,
            end_date: row.end_date,
            trial_end: row.trial_end,
            cancelled_at: row.cancelled_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub struct SubscriptionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SubscriptionRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Start an active subscription for the user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the user already has one.
    pub async fn create(
        &self,
        user_id: UserId,
        plan: PlanType,
        end_date: Option<DateTime<Utc>>,
    ) -> Result<Subscription, RepositoryError> {
        let row = sqlx::query_as::<_, SubscriptionRow>(&format!(
            r"
            INSERT INTO subscriptions (user_id, plan, status, start_date, end_date)
            VALUES ($1, $2, 'active', NOW(), $3)
            RETURNING {SUBSCRIPTION_COLUMNS}
            "
        ))
        .bind(user_id)
        .bind(plan)
        .bind(end_date)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "subscription"))?;

        Ok(row.into())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: SubscriptionId) -> Result<Option<Subscription>, RepositoryError> {
        let row = sqlx::query_as::<_, SubscriptionRow>(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Option<Subscription>, RepositoryError> {
        let row = sqlx::query_as::<_, SubscriptionRow>(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the subscription doesn't exist.
    pub async fn set_status(
        &self,
        id: SubscriptionId,
        status: SubscriptionStatus,
    ) -> Result<Subscription, RepositoryError> {
        let row = sqlx::query_as::<_, SubscriptionRow>(&format!(
            r"
            UPDATE subscriptions
            SET status = $2,
                cancelled_at = CASE WHEN $2 = 'cancelled' THEN NOW() ELSE cancelled_at END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {SUBSCRIPTION_COLUMNS}
            "
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }
}
