//! Looks Lab API library.
//!
//! Onboarding, per-domain questionnaires with AI analysis, image uploads
//! and subscriptions, exposed as a library so the binary, the CLI and the
//! integration tests share one implementation.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod ai;
pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
