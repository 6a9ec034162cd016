//! Business logic services.
//!
//! Each service borrows the connection pool and builds the repositories it
//! needs, so handlers construct one per request:
//!
//! ```rust,ignore
//! let flow = DomainService::new(state.pool(), state.gemini())
//!     .next_or_complete(user.id, domain)
//!     .await?;
//! ```
//!
//! # Services
//!
//! - `auth` - Google sign-in, access tokens and refresh token rotation
//! - `onboarding` - Anonymous onboarding sessions and their questionnaire
//! - `domains` - Per-domain questionnaires, access checks and AI completion
//! - `images` - Uploads and image metadata
//! - `plans` - AI workout and meal plans
//! - `insights` / `subscriptions` / `users` - Owned-resource CRUD
//! - `storage` - Local disk storage for uploads

pub mod auth;
pub mod domains;
pub mod images;
pub mod insights;
pub mod onboarding;
pub mod plans;
pub mod quotes;
pub mod storage;
pub mod subscriptions;
pub mod users;

pub use auth::AuthService;
pub use domains::DomainService;
pub use images::ImageService;
pub use insights::InsightService;
pub use onboarding::OnboardingService;
pub use plans::PlanService;
pub use storage::LocalStorage;
pub use subscriptions::SubscriptionService;
pub use users::UserService;
