//! Domain models for the API.
//!
//! These types are validated domain objects, separate from the `FromRow`
//! row types in [`crate::db`]. They serialize directly as API responses.

pub mod domain;
pub mod image;
pub mod insight;
pub mod onboarding;
pub mod subscription;
pub mod user;

pub use domain::{DomainAnswer, DomainQuestion};
pub use image::Image;
pub use insight::Insight;
pub use onboarding::{OnboardingAnswer, OnboardingQuestion, OnboardingSession};
pub use subscription::Subscription;
pub use user::User;
