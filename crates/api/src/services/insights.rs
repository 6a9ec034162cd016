//! Stored AI insights, scoped to the owning user.

use sqlx::PgPool;

use looks_lab_core::{InsightId, UserId};

use crate::db::InsightRepository;
use crate::error::{AppError, Result};
use crate::models::Insight;
use crate::models::insight::{InsightCreate, InsightUpdate};

pub struct InsightService<'a> {
    insights: InsightRepository<'a>,
}

impl<'a> InsightService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            insights: InsightRepository::new(pool),
        }
    }

    /// # Errors
    ///
    /// Returns `AppError::Database` if the insert fails.
    pub async fn create(&self, user_id: UserId, insight: &InsightCreate) -> Result<Insight> {
        let insight = self.insights.create(user_id, insight).await?;
        tracing::info!(insight_id = %insight.id, category = %insight.category, "Created insight");
        Ok(insight)
    }

    /// # Errors
    ///
    /// Returns `AppError::NotFound` for a missing insight and
    /// `AppError::Forbidden` for someone else's.
    pub async fn get(&self, id: InsightId, user_id: UserId) -> Result<Insight> {
        let insight = self
            .insights
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Insight not found".to_string()))?;

        if insight.user_id != user_id {
            return Err(AppError::Forbidden(
                "Not authorized to access this insight".to_string(),
            ));
        }
        Ok(insight)
    }

    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<Insight>> {
        Ok(self.insights.list_for_user(user_id).await?)
    }

    /// # Errors
    ///
    /// Same as [`Self::get`].
    pub async fn update(
        &self,
        id: InsightId,
        user_id: UserId,
        update: &InsightUpdate,
    ) -> Result<Insight> {
        self.get(id, user_id).await?;
        let insight = self.insights.update(id, update).await?;
        tracing::info!(insight_id = %id, "Updated insight");
        Ok(insight)
    }

    /// # Errors
    ///
    /// Same as [`Self::get`].
    pub async fn delete(&self, id: InsightId, user_id: UserId) -> Result<()> {
        self.get(id, user_id).await?;
        self.insights.delete(id).await?;
        tracing::info!(insight_id = %id, "Deleted insight");
        Ok(())
    }
}
