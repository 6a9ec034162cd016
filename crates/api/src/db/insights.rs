//! Stored AI insights.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;

use looks_lab_core::{InsightCategory, InsightId, UserId};

use super::RepositoryError;
use crate::models::Insight;
use crate::models::insight::{InsightCreate, InsightUpdate};

const INSIGHT_COLUMNS: &str = "id, user_id, category, content, source, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct InsightRow {
    id: i32,
    user_id: i32,
    category: InsightCategory,
    content: Value,
    source: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<InsightRow> for Insight {
    fn from(row: InsightRow) -> Self {
        Self {
            id: InsightId::new(row.id),
            user_id: UserId::new(row.user_id),
            category: row.category,
            content: row.content,
            source: row.source,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub struct InsightRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> InsightRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(
        &self,
        user_id: UserId,
        insight: &InsightCreate,
    ) -> Result<Insight, RepositoryError> {
        let row = sqlx::query_as::<_, InsightRow>(&format!(
            r"
            INSERT INTO insights (user_id, category, content, source)
            VALUES ($1, $2, $3, $4)
            RETURNING {INSIGHT_COLUMNS}
            "
        ))
        .bind(user_id)
        .bind(insight.category)
        .bind(&insight.content)
        .bind(insight.source.as_deref())
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: InsightId) -> Result<Option<Insight>, RepositoryError> {
        let row = sqlx::query_as::<_, InsightRow>(&format!(
            "SELECT {INSIGHT_COLUMNS} FROM insights WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// A user's insights, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Insight>, RepositoryError> {
        let rows = sqlx::query_as::<_, InsightRow>(&format!(
            "SELECT {INSIGHT_COLUMNS} FROM insights WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the insight doesn't exist.
    pub async fn update(
        &self,
        id: InsightId,
        update: &InsightUpdate,
    ) -> Result<Insight, RepositoryError> {
        let row = sqlx::query_as::<_, InsightRow>(&format!(
            r"
            UPDATE insights
            SET category = COALESCE($2, category),
                content = COALESCE($3, content),
                source = COALESCE($4, source),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {INSIGHT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(update.category)
        .bind(update.content.as_ref())
        .bind(update.source.as_deref())
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: InsightId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM insights WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
