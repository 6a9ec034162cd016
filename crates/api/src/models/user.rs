//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use looks_lab_core::{AuthProvider, Email, UserId};

/// An app user, created on first sign-in with an identity provider.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub name: Option<String>,
    pub provider: Option<AuthProvider>,
    pub is_active: bool,
    pub is_verified: bool,
    #[serde(skip)]
    pub google_sub: Option<String>,
    pub google_picture: Option<String>,
    #[serde(skip)]
    pub apple_sub: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub profile_image: Option<String>,
    pub notifications_enabled: bool,
    pub onboarding_complete: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Profile fields a user may change about themselves.
///
/// `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub profile_image: Option<String>,
    pub notifications_enabled: Option<bool>,
}

impl UserUpdate {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.age.is_none()
            && self.gender.is_none()
            && self.profile_image.is_none()
            && self.notifications_enabled.is_none()
    }
}
