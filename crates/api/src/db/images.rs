//! Image metadata repository.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{PgPool, Postgres, QueryBuilder};

use looks_lab_core::{Domain, ImageId, ImageStatus, ImageType, UserId};

use super::RepositoryError;
use crate::models::Image;
use crate::models::image::{ImageUpdate, NewImage};

const IMAGE_COLUMNS: &str = "id, user_id, file_path, s3_key, url, mime_type, file_size, \
     image_type, domain, view, status, analysis_result, error_message, uploaded_at, \
     processed_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct ImageRow {
    id: i32,
    user_id: i32,
    file_path: String,
    s3_key: Option<String>,
    url: Option<String>,
    mime_type: Option<String>,
    file_size: Option<i64>,
    image_type: ImageType,
    domain: Option<String>,
    view: Option<String>,
    status: ImageStatus,
    analysis_result: Option<Value>,
    error_message: Option<String>,
    uploaded_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

impl From<ImageRow> for Image {
    fn from(row: ImageRow) -> Self {
        Self {
            id: ImageId::new(row.id),
            user_id: UserId::new(row.user_id),
            file_path: row.file_path,
            s3_key: row.s3_key,
            url: row.url,
            mime_type: row.mime_type,
            file_size: row.file_size,
            image_type: row.image_type,
            domain: row.domain,
            view: row.view,
            status: row.status,
            analysis_result: row.analysis_result,
            error_message: row.error_message,
            uploaded_at: row.uploaded_at,
            processed_at: row.processed_at,
            updated_at: row.updated_at,
        }
    }
}

/// Optional filters for listing a user's images.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct ImageFilter {
    pub domain: Option<Domain>,
    pub view: Option<String>,
    pub status: Option<ImageStatus>,
}

pub struct ImageRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ImageRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(&self, user_id: UserId, image: &NewImage) -> Result<Image, RepositoryError> {
        let row = sqlx::query_as::<_, ImageRow>(&format!(
            r"
            INSERT INTO images (user_id, file_path, s3_key, url, mime_type, file_size,
                                image_type, domain, view)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {IMAGE_COLUMNS}
            "
        ))
        .bind(user_id)
        .bind(&image.file_path)
        .bind(image.s3_key.as_deref())
        .bind(image.url.as_deref())
        .bind(image.mime_type.as_deref())
        .bind(image.file_size)
        .bind(image.image_type)
        .bind(image.domain)
        .bind(image.view.as_deref())
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ImageId) -> Result<Option<Image>, RepositoryError> {
        let row = sqlx::query_as::<_, ImageRow>(&format!(
            "SELECT {IMAGE_COLUMNS} FROM images WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// A user's images, newest first, narrowed by `filter`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(
        &self,
        user_id: UserId,
        filter: &ImageFilter,
    ) -> Result<Vec<Image>, RepositoryError> {
        let mut query: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(format!("SELECT {IMAGE_COLUMNS} FROM images WHERE user_id = "));
        query.push_bind(user_id);
        if let Some(domain) = filter.domain {
            query.push(" AND domain = ").push_bind(domain);
        }
        if let Some(view) = &filter.view {
            query.push(" AND view = ").push_bind(view);
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status);
        }
        query.push(" ORDER BY uploaded_at DESC");

        let rows = query
            .build_query_as::<ImageRow>()
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Apply a metadata patch. Moving to `processed` stamps `processed_at`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the image doesn't exist.
    pub async fn update(&self, id: ImageId, update: &ImageUpdate) -> Result<Image, RepositoryError> {
        let row = sqlx::query_as::<_, ImageRow>(&format!(
            r"
            UPDATE images
            SET analysis_result = COALESCE($2, analysis_result),
                status = COALESCE($3, status),
                image_type = COALESCE($4, image_type),
                domain = COALESCE($5, domain),
                view = COALESCE($6, view),
                processed_at = CASE WHEN $3 = 'processed' THEN NOW() ELSE processed_at END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {IMAGE_COLUMNS}
            "
        ))
        .bind(id)
        .bind(update.analysis_result.as_ref())
        .bind(update.status)
        .bind(update.image_type)
        .bind(update.domain)
        .bind(update.view.as_deref())
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Record a successful analysis.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the image doesn't exist.
    pub async fn mark_processed(
        &self,
        id: ImageId,
        analysis_result: &Value,
    ) -> Result<Image, RepositoryError> {
        let row = sqlx::query_as::<_, ImageRow>(&format!(
            r"
            UPDATE images
            SET status = 'processed', analysis_result = $2, error_message = NULL,
                processed_at = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING {IMAGE_COLUMNS}
            "
        ))
        .bind(id)
        .bind(analysis_result)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Record a failed analysis.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the image doesn't exist.
    pub async fn mark_failed(
        &self,
        id: ImageId,
        error_message: Option<&str>,
    ) -> Result<Image, RepositoryError> {
        let row = sqlx::query_as::<_, ImageRow>(&format!(
            r"
            UPDATE images
            SET status = 'failed', error_message = $2, processed_at = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING {IMAGE_COLUMNS}
            "
        ))
        .bind(id)
        .bind(error_message)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: ImageId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM images WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
