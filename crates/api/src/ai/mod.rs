//! Generative AI analysis for completed domain questionnaires.
//!
//! [`GeminiClient`] is a thin "send prompt, parse JSON" wrapper around the
//! Gemini REST API. The [`processors`] module holds one prompt template and
//! response reshaper per domain, and [`plans`] builds workout and meal plans
//! on request.

pub mod client;
pub mod error;
pub mod json;
pub mod plans;
pub mod processors;

pub use client::GeminiClient;
pub use error::GeminiError;
pub use json::clean_json_response;
pub use processors::{AiOutput, AnswerContext, ImageContext, Requirements, analyze, requirements};
