//! Per-domain prompt templates and response reshaping.
//!
//! Each domain module supplies a [`Template`] (what to ask for) and a
//! `reshape` function that reads the model's JSON leniently into typed
//! sections, filling defaults for anything missing and truncating lists.
//! The sections land in the flat [`AiOutput`] fields the API returns.

mod diet;
mod facial;
mod fashion;
pub(crate) mod fields;
mod haircare;
mod height;
mod quit_porn;
mod skincare;
mod workout;

use serde::Serialize;
use serde_json::{Map, Value};

use looks_lab_core::Domain;

use super::json::missing_fields;
use super::{GeminiClient, GeminiError};

/// An answered domain question as given to the model.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerContext {
    pub step: i32,
    pub question: String,
    pub answer: Value,
}

/// An uploaded image for the domain.
#[derive(Debug, Clone, Serialize)]
pub struct ImageContext {
    pub view: Option<String>,
    pub url: Option<String>,
}

/// What a domain needs before analysis is worth running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requirements {
    pub min_answers: usize,
    pub requires_images: bool,
}

#[must_use]
pub const fn requirements(domain: Domain) -> Requirements {
    match domain {
        Domain::Skincare => Requirements {
            min_answers: 6,
            requires_images: true,
        },
        Domain::Haircare => Requirements {
            min_answers: 4,
            requires_images: false,
        },
        _ => Requirements {
            min_answers: 5,
            requires_images: false,
        },
    }
}

/// Reshaped analysis, flattened into the fields a completed flow returns.
///
/// Each domain fills the subset it produces; the rest stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AiOutput {
    pub ai_attributes: Option<Value>,
    pub ai_health: Option<Value>,
    pub ai_concerns: Option<Value>,
    pub ai_message: Option<Value>,
    pub ai_remedies: Option<Value>,
    pub ai_products: Option<Value>,
    pub ai_routine: Option<Value>,
    pub ai_exercises: Option<Value>,
    pub ai_progress: Option<Value>,
    pub ai_today_focus: Option<Value>,
    pub ai_workout_summary: Option<Value>,
    pub ai_nutrition: Option<Value>,
    pub ai_recovery: Option<Value>,
    pub ai_features: Option<Value>,
    pub ai_style: Option<Value>,
}

/// Prompt pieces for one domain.
struct Template {
    role: &'static str,
    schema: &'static str,
    /// Top-level keys the reply should carry. Missing ones are only logged.
    required: &'static [&'static str],
    /// Whether image presence is part of the prompt context.
    with_images: bool,
}

const fn template(domain: Domain) -> &'static Template {
    match domain {
        Domain::Skincare => &skincare::TEMPLATE,
        Domain::Haircare => &haircare::TEMPLATE,
        Domain::Fashion => &fashion::TEMPLATE,
        Domain::Workout => &workout::TEMPLATE,
        Domain::Diet => &diet::TEMPLATE,
        Domain::Height => &height::TEMPLATE,
        Domain::QuitPorn => &quit_porn::TEMPLATE,
        Domain::Facial => &facial::TEMPLATE,
    }
}

#[derive(Serialize)]
struct PromptContext<'a> {
    answers: &'a [AnswerContext],
    images: Vec<PromptImage<'a>>,
}

#[derive(Serialize)]
struct PromptImage<'a> {
    view: Option<&'a str>,
    present: bool,
}

/// Build the full prompt for `domain` from the user's answers and images.
#[must_use]
pub fn build_prompt(domain: Domain, answers: &[AnswerContext], images: &[ImageContext]) -> String {
    let template = template(domain);
    let images = if template.with_images {
        images
            .iter()
            .map(|image| PromptImage {
                view: image.view.as_deref(),
                present: image.url.is_some(),
            })
            .collect()
    } else {
        Vec::new()
    };
    let context = serde_json::to_string_pretty(&PromptContext { answers, images })
        .unwrap_or_else(|_| "{}".to_string());

    format!(
        "{role}\n\nReturn STRICT JSON ONLY, with no markdown and no commentary, \
         matching this schema:\n{schema}\n\nUser context:\n{context}\n",
        role = template.role,
        schema = template.schema.trim(),
    )
}

/// Reshape a raw model reply for `domain`.
#[must_use]
pub fn reshape(domain: Domain, raw: &Map<String, Value>) -> AiOutput {
    match domain {
        Domain::Skincare => skincare::reshape(raw),
        Domain::Haircare => haircare::reshape(raw),
        Domain::Fashion => fashion::reshape(raw),
        Domain::Workout => workout::reshape(raw),
        Domain::Diet => diet::reshape(raw),
        Domain::Height => height::reshape(raw),
        Domain::QuitPorn => quit_porn::reshape(raw),
        Domain::Facial => facial::reshape(raw),
    }
}

/// Run the analysis for `domain` end to end.
///
/// # Errors
///
/// Returns the client's error if the model call fails or the reply isn't
/// a JSON object.
pub async fn analyze(
    client: &GeminiClient,
    domain: Domain,
    answers: &[AnswerContext],
    images: &[ImageContext],
) -> Result<AiOutput, GeminiError> {
    tracing::info!(
        domain = %domain,
        answers = answers.len(),
        images = images.len(),
        "Starting AI analysis"
    );

    let prompt = build_prompt(domain, answers, images);
    let raw = client.generate_json(&prompt, domain).await?;

    let missing = missing_fields(&raw, template(domain).required);
    if !missing.is_empty() {
        tracing::warn!(domain = %domain, ?missing, "AI reply is missing sections, using defaults");
    }

    Ok(reshape(domain, &raw))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn answers() -> Vec<AnswerContext> {
        vec![AnswerContext {
            step: 1,
            question: "How would you describe your skin?".to_string(),
            answer: json!("Oily"),
        }]
    }

    fn images() -> Vec<ImageContext> {
        vec![ImageContext {
            view: Some("front".to_string()),
            url: Some("http://localhost:8000/media/skincare/1/front_x.jpg".to_string()),
        }]
    }

    #[test]
    fn test_requirements() {
        assert_eq!(requirements(Domain::Skincare).min_answers, 6);
        assert!(requirements(Domain::Skincare).requires_images);
        assert_eq!(requirements(Domain::Haircare).min_answers, 4);
        for domain in [Domain::Fashion, Domain::Workout, Domain::QuitPorn, Domain::Facial] {
            assert_eq!(requirements(domain).min_answers, 5);
            assert!(!requirements(domain).requires_images);
        }
    }

    #[test]
    fn test_prompt_carries_context_and_schema() {
        let prompt = build_prompt(Domain::Skincare, &answers(), &images());
        assert!(prompt.contains("Return STRICT JSON ONLY"));
        assert!(prompt.contains("How would you describe your skin?"));
        assert!(prompt.contains("\"present\": true"));
        assert!(prompt.contains("\"attributes\""));
        // Image URLs are never sent to the model.
        assert!(!prompt.contains("localhost"));
    }

    #[test]
    fn test_prompt_omits_images_for_text_only_domains() {
        let prompt = build_prompt(Domain::Workout, &answers(), &images());
        assert!(!prompt.contains("\"present\""));
    }

    #[test]
    fn test_every_domain_reshapes_empty_reply() {
        let raw = Map::new();
        for domain in Domain::ALL {
            let output = reshape(domain, &raw);
            assert!(output.ai_attributes.is_some(), "{domain} has no attributes");
        }
    }
}
