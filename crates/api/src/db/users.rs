//! User repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use looks_lab_core::{AuthProvider, Email, UserId};

use super::RepositoryError;
use crate::models::User;
use crate::models::user::UserUpdate;

const USER_COLUMNS: &str = "id, email, name, provider, is_active, is_verified, google_sub, \
     google_picture, apple_sub, age, gender, profile_image, notifications_enabled, \
     onboarding_complete, last_login, created_at, updated_at";

/// Internal row type for `users` queries.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i32,
    email: String,
    name: Option<String>,
    provider: Option<String>,
    is_active: bool,
    is_verified: bool,
    google_sub: Option<String>,
    google_picture: Option<String>,
    apple_sub: Option<String>,
    age: Option<i32>,
    gender: Option<String>,
    profile_image: Option<String>,
    notifications_enabled: bool,
    onboarding_complete: bool,
    last_login: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let provider = row
            .provider
            .as_deref()
            .map(str::parse::<AuthProvider>)
            .transpose()
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;

        Ok(Self {
            id: UserId::new(row.id),
            email,
            name: row.name,
            provider,
            is_active: row.is_active,
            is_verified: row.is_verified,
            google_sub: row.google_sub,
            google_picture: row.google_picture,
            apple_sub: row.apple_sub,
            age: row.age,
            gender: row.gender,
            profile_image: row.profile_image,
            notifications_enabled: row.notifications_enabled,
            onboarding_complete: row.onboarding_complete,
            last_login: row.last_login,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Identity claims from a verified provider token.
#[derive(Debug, Clone)]
pub struct ProviderIdentity {
    pub provider: AuthProvider,
    pub subject: String,
    pub email: Email,
    pub name: Option<String>,
    pub picture: Option<String>,
    pub email_verified: bool,
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored value is invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get a user by their (normalized) email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Create a user from a verified provider identity.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    #[instrument(skip(self, identity), fields(provider = %identity.provider))]
    pub async fn create_from_identity(
        &self,
        identity: &ProviderIdentity,
    ) -> Result<User, RepositoryError> {
        let (google_sub, apple_sub) = match identity.provider {
            AuthProvider::Google => (Some(identity.subject.as_str()), None),
            AuthProvider::Apple => (None, Some(identity.subject.as_str())),
        };

        let row = sqlx::query_as::<_, UserRow>(&format!(
            r"
            INSERT INTO users (email, name, provider, is_verified, google_sub,
                               google_picture, apple_sub, last_login)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(&identity.email)
        .bind(identity.name.as_deref())
        .bind(identity.provider)
        .bind(identity.email_verified)
        .bind(google_sub)
        .bind(identity.picture.as_deref())
        .bind(apple_sub)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "email"))?;

        row.try_into()
    }

    /// Refresh provider details on an existing account.
    ///
    /// The name is only filled in when the user has none yet; the picture is
    /// always replaced.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn update_from_identity(
        &self,
        id: UserId,
        identity: &ProviderIdentity,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r"
            UPDATE users
            SET name = COALESCE(name, $2),
                google_picture = COALESCE($3, google_picture),
                google_sub = CASE WHEN $4 = 'google' THEN COALESCE(google_sub, $5) ELSE google_sub END,
                apple_sub = CASE WHEN $4 = 'apple' THEN COALESCE(apple_sub, $5) ELSE apple_sub END,
                is_verified = is_verified OR $6,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(identity.name.as_deref())
        .bind(identity.picture.as_deref())
        .bind(identity.provider)
        .bind(&identity.subject)
        .bind(identity.email_verified)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// Stamp the last login time.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn touch_last_login(&self, id: UserId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Apply a profile patch. Fields left as `None` keep their value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn update_profile(
        &self,
        id: UserId,
        update: &UserUpdate,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r"
            UPDATE users
            SET name = COALESCE($2, name),
                age = COALESCE($3, age),
                gender = COALESCE($4, gender),
                profile_image = COALESCE($5, profile_image),
                notifications_enabled = COALESCE($6, notifications_enabled),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(update.name.as_deref())
        .bind(update.age)
        .bind(update.gender.as_deref())
        .bind(update.profile_image.as_deref())
        .bind(update.notifications_enabled)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// Mark onboarding as finished.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn mark_onboarding_complete(&self, id: UserId) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE users SET onboarding_complete = TRUE, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Delete a user. Everything they own goes with them via `ON DELETE CASCADE`.
    ///
    /// # Returns
    ///
    /// Returns `true` if the user was deleted, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: UserId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
