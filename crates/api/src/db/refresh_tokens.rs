//! Refresh token storage.
//!
//! Each user has at most one refresh token row. Issuing a token overwrites
//! the previous one, so signing in on a new device signs out the old one.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use looks_lab_core::{RefreshTokenId, UserId};

use super::RepositoryError;

#[derive(Debug, Clone)]
pub struct RefreshToken {
    pub id: RefreshTokenId,
    pub user_id: UserId,
    pub token: String,
    pub is_revoked: bool,
    pub device_info: Option<String>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct RefreshTokenRow {
    id: i32,
    user_id: i32,
    token: String,
    is_revoked: bool,
    device_info: Option<String>,
    expires_at: DateTime<Utc>,
}

impl From<RefreshTokenRow> for RefreshToken {
    fn from(row: RefreshTokenRow) -> Self {
        Self {
            id: RefreshTokenId::new(row.id),
            user_id: UserId::new(row.user_id),
            token: row.token,
            is_revoked: row.is_revoked,
            device_info: row.device_info,
            expires_at: row.expires_at,
        }
    }
}

pub struct RefreshTokenRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> RefreshTokenRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store `token` as the user's only refresh token.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(
        &self,
        user_id: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
        device_info: Option<&str>,
    ) -> Result<RefreshToken, RepositoryError> {
        let row = sqlx::query_as::<_, RefreshTokenRow>(
            r"
            INSERT INTO refresh_tokens (user_id, token, expires_at, device_info)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE
            SET token = EXCLUDED.token,
                expires_at = EXCLUDED.expires_at,
                device_info = EXCLUDED.device_info,
                is_revoked = FALSE,
                updated_at = NOW()
            RETURNING id, user_id, token, is_revoked, device_info, expires_at
            ",
        )
        .bind(user_id)
        .bind(token)
        .bind(expires_at)
        .bind(device_info)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Look up a token by its value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find(&self, token: &str) -> Result<Option<RefreshToken>, RepositoryError> {
        let row = sqlx::query_as::<_, RefreshTokenRow>(
            r"
            SELECT id, user_id, token, is_revoked, device_info, expires_at
            FROM refresh_tokens
            WHERE token = $1
            ",
        )
        .bind(token)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Revoke the user's refresh token, if any.
    ///
    /// # Returns
    ///
    /// Returns `true` if a live token was revoked.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn revoke_for_user(&self, user_id: UserId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE refresh_tokens
            SET is_revoked = TRUE, updated_at = NOW()
            WHERE user_id = $1 AND is_revoked = FALSE
            ",
        )
        .bind(user_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
