//! Database operations for the Looks Lab `PostgreSQL` database.
//!
//! ## Tables
//!
//! - `users` - Accounts created through Google/Apple sign-in
//! - `refresh_tokens` - One opaque refresh token per user
//! - `onboarding_sessions` - Anonymous-then-linked onboarding progress
//! - `onboarding_questions` / `onboarding_answers`
//! - `domain_questions` / `domain_answers` - Per-domain questionnaires
//! - `images` - Upload metadata (files live on local disk)
//! - `insights` - Stored AI output
//! - `subscriptions` - One subscription per user
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p looks-lab-cli -- migrate
//! ```
//!
//! Queries are checked at runtime (`sqlx::query_as` with `FromRow` rows), so
//! the workspace builds without a live database.

pub mod domains;
pub mod images;
pub mod insights;
pub mod onboarding;
pub mod refresh_tokens;
pub mod subscriptions;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use domains::DomainRepository;
pub use images::ImageRepository;
pub use insights::InsightRepository;
pub use onboarding::OnboardingRepository;
pub use refresh_tokens::RefreshTokenRepository;
pub use subscriptions::SubscriptionRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a unique violation to `Conflict`, leaving other errors as-is.
    pub(crate) fn from_insert(e: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return Self::Conflict(format!("{what} already exists"));
        }
        Self::Database(e)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
