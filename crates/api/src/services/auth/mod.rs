//! Authentication service.
//!
//! Google sign-in, access token issue and verification, and refresh token
//! rotation. Apple sign-in is not supported.

mod error;
pub mod google;
pub mod tokens;

pub use error::AuthError;

use chrono::{DateTime, Duration, Utc};
use secrecy::ExposeSecret;
use serde::Serialize;
use sqlx::PgPool;
use tracing::instrument;

use looks_lab_core::UserId;

use crate::config::JwtConfig;
use crate::db::users::{ProviderIdentity, UserRepository};
use crate::db::{RefreshTokenRepository, RepositoryError};
use crate::models::User;
use tokens::{Claims, decode_access_token, encode_access_token, new_refresh_token};

/// Tokens handed to the client after sign-in or refresh.
#[derive(Debug, Serialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub user: User,
}

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    refresh_tokens: RefreshTokenRepository<'a>,
    jwt: &'a JwtConfig,
}

impl<'a> AuthService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, jwt: &'a JwtConfig) -> Self {
        Self {
            users: UserRepository::new(pool),
            refresh_tokens: RefreshTokenRepository::new(pool),
            jwt,
        }
    }

    /// Verify a Google ID token and sign the user in, creating the account
    /// on first use.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::GoogleNotConfigured` without a client id,
    /// `AuthError::InvalidGoogleToken` if Google rejects the token, and the
    /// errors of [`Self::sign_in`].
    pub async fn sign_in_with_google(
        &self,
        http: &reqwest::Client,
        client_id: Option<&str>,
        id_token: &str,
        device_info: Option<&str>,
    ) -> Result<AuthSession, AuthError> {
        let client_id = client_id.ok_or(AuthError::GoogleNotConfigured)?;
        let identity = google::verify_id_token(http, client_id, id_token).await?;
        self.sign_in(&identity, device_info).await
    }

    /// Sign in a verified identity.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::ProviderMismatch` if the email is registered with
    /// another provider and `AuthError::InactiveUser` for disabled accounts.
    #[instrument(skip(self, identity, device_info), fields(provider = %identity.provider))]
    pub async fn sign_in(
        &self,
        identity: &ProviderIdentity,
        device_info: Option<&str>,
    ) -> Result<AuthSession, AuthError> {
        let user = self.get_or_create_user(identity).await?;
        tracing::info!(user_id = %user.id, "User signed in");
        self.issue(user, device_info).await
    }

    async fn get_or_create_user(&self, identity: &ProviderIdentity) -> Result<User, AuthError> {
        let Some(existing) = self.users.get_by_email(&identity.email).await? else {
            return match self.users.create_from_identity(identity).await {
                Ok(user) => Ok(user),
                // Lost a race with a concurrent first sign-in.
                Err(RepositoryError::Conflict(_)) => self
                    .users
                    .get_by_email(&identity.email)
                    .await?
                    .ok_or(AuthError::UserNotFound),
                Err(e) => Err(e.into()),
            };
        };

        check_can_sign_in(&existing, identity)?;

        let user = self
            .users
            .update_from_identity(existing.id, identity)
            .await?;
        self.users.touch_last_login(user.id).await?;
        Ok(user)
    }

    /// Exchange a refresh token for a new token pair. The old refresh token
    /// stops working.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidRefreshToken`, `AuthError::RefreshTokenRevoked`
    /// or `AuthError::RefreshTokenExpired` when the token can't be used.
    pub async fn refresh(
        &self,
        refresh_token: &str,
        device_info: Option<&str>,
    ) -> Result<AuthSession, AuthError> {
        let stored = self
            .refresh_tokens
            .find(refresh_token)
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?;

        if stored.is_revoked {
            return Err(AuthError::RefreshTokenRevoked);
        }
        if stored.expires_at < Utc::now() {
            return Err(AuthError::RefreshTokenExpired);
        }

        let user = self
            .users
            .get_by_id(stored.user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        if !user.is_active {
            return Err(AuthError::InactiveUser);
        }

        self.issue(user, device_info.or(stored.device_info.as_deref()))
            .await
    }

    /// Revoke the user's refresh token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the update fails.
    pub async fn sign_out(&self, user_id: UserId) -> Result<bool, AuthError> {
        Ok(self.refresh_tokens.revoke_for_user(user_id).await?)
    }

    /// Resolve a bearer token to an active user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` or `AuthError::TokenExpired` for bad
    /// tokens, `AuthError::UserNotFound` if the user is gone, and
    /// `AuthError::InactiveUser` if the account is disabled.
    pub async fn authenticate(&self, access_token: &str) -> Result<User, AuthError> {
        let claims = decode_access_token(
            self.jwt.secret.expose_secret().as_bytes(),
            access_token,
            Utc::now(),
        )?;

        let user = self
            .users
            .get_by_id(claims.user_id()?)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        if !user.is_active {
            return Err(AuthError::InactiveUser);
        }
        Ok(user)
    }

    async fn issue(&self, user: User, device_info: Option<&str>) -> Result<AuthSession, AuthError> {
        let now = Utc::now();
        let access_ttl = Duration::minutes(self.jwt.access_token_minutes);
        let claims = Claims::new(user.id, &user.email, now, access_ttl);
        let access_token = encode_access_token(self.jwt.secret.expose_secret().as_bytes(), &claims)?;

        let refresh_token = new_refresh_token();
        self.refresh_tokens
            .upsert(
                user.id,
                &refresh_token,
                refresh_expiry(now, self.jwt.refresh_token_days),
                device_info,
            )
            .await?;

        Ok(AuthSession {
            access_token,
            refresh_token,
            token_type: "bearer",
            expires_in: access_ttl.num_seconds(),
            user,
        })
    }
}

fn refresh_expiry(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    now + Duration::days(days)
}

/// Reject sign-in when the account belongs to another provider or is
/// disabled. Accounts with no recorded provider accept any.
fn check_can_sign_in(user: &User, identity: &ProviderIdentity) -> Result<(), AuthError> {
    if let Some(registered) = user.provider
        && registered != identity.provider
    {
        return Err(AuthError::ProviderMismatch { registered });
    }
    if !user.is_active {
        return Err(AuthError::InactiveUser);
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use looks_lab_core::{AuthProvider, Email};

    use super::*;

    fn user(provider: Option<AuthProvider>, is_active: bool) -> User {
        let now = Utc::now();
        User {
            id: UserId::new(7),
            email: Email::parse("sam@example.com").unwrap(),
            name: None,
            provider,
            is_active,
            is_verified: true,
            google_sub: None,
            google_picture: None,
            apple_sub: None,
            age: None,
            gender: None,
            profile_image: None,
            notifications_enabled: true,
            onboarding_complete: false,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn google_identity() -> ProviderIdentity {
        ProviderIdentity {
            provider: AuthProvider::Google,
            subject: "sub-1".to_string(),
            email: Email::parse("sam@example.com").unwrap(),
            name: Some("Sam".to_string()),
            picture: None,
            email_verified: true,
        }
    }

    #[test]
    fn test_same_provider_can_sign_in() {
        assert!(check_can_sign_in(&user(Some(AuthProvider::Google), true), &google_identity()).is_ok());
        assert!(check_can_sign_in(&user(None, true), &google_identity()).is_ok());
    }

    #[test]
    fn test_other_provider_is_rejected() {
        let err = check_can_sign_in(&user(Some(AuthProvider::Apple), true), &google_identity())
            .unwrap_err();
        assert!(matches!(
            err,
            AuthError::ProviderMismatch {
                registered: AuthProvider::Apple
            }
        ));
    }

    #[test]
    fn test_inactive_user_is_rejected() {
        let err = check_can_sign_in(&user(Some(AuthProvider::Google), false), &google_identity())
            .unwrap_err();
        assert!(matches!(err, AuthError::InactiveUser));
    }

    #[test]
    fn test_refresh_expiry() {
        let now = Utc::now();
        assert_eq!(refresh_expiry(now, 30) - now, Duration::days(30));
    }
}
