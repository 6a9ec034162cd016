//! Looks Lab Core - Shared types library.
//!
//! This crate provides common types used across all Looks Lab components:
//! - `api` - The mobile app backend (onboarding, domains, AI analysis)
//! - `cli` - Command-line tools for migrations and question seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure validation logic - no I/O, no
//! database access, no HTTP clients. This keeps it lightweight and allows it
//! to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, wellness domains, and status enums
//! - [`answer`] - Validation of questionnaire answers against their question

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod answer;
pub mod types;

pub use answer::{AnswerError, validate_answer};
pub use types::*;
