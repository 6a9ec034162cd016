//! Seed onboarding and domain questions from a YAML file.
//!
//! The file maps a section name to its questions, in display order:
//!
//! ```yaml
//! profile_setup:
//!   - question: What is your height?
//!     type: numeric
//!     constraints: { min: 50, max: 250, unit: cm }
//! skincare:
//!   - question: How would you describe your skin?
//!     type: choice
//!     options: [Oily, Dry, Combination, Normal]
//! ```
//!
//! A section is either an onboarding step or a domain. Each question's `seq`
//! is its 1-based position in the section. Re-running the command updates
//! questions in place.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info, warn};

use looks_lab_api::db;
use looks_lab_api::db::domains::{DomainQuestionSeed, DomainRepository};
use looks_lab_api::db::onboarding::{OnboardingQuestionSeed, OnboardingRepository};
use looks_lab_core::{Domain, OnboardingStep, QuestionType};

use super::{CommandError, database_url};

#[derive(Debug, Deserialize)]
struct QuestionEntry {
    #[serde(default)]
    question: String,
    #[serde(rename = "type")]
    kind: Option<QuestionType>,
    #[serde(default)]
    options: Option<Vec<String>>,
    #[serde(default)]
    constraints: Option<Value>,
}

type SeedFile = BTreeMap<String, Vec<QuestionEntry>>;

/// Questions ready to upsert.
#[derive(Debug, Default)]
struct SeedPlan {
    onboarding: Vec<OnboardingQuestionSeed>,
    domains: Vec<DomainQuestionSeed>,
    skipped: usize,
}

/// Sort sections into onboarding steps and domains. Entries without a
/// question or type are skipped; unknown sections are errors.
fn plan(file: SeedFile) -> Result<SeedPlan, Vec<String>> {
    let mut plan = SeedPlan::default();
    let mut errors = Vec::new();

    for (section, entries) in file {
        let step = section.parse::<OnboardingStep>().ok();
        let domain = Domain::parse(&section).ok();
        if step.is_none() && domain.is_none() {
            errors.push(format!(
                "unknown section '{section}': not an onboarding step or domain"
            ));
            continue;
        }

        for (index, entry) in entries.into_iter().enumerate() {
            let seq = i32::try_from(index + 1).unwrap_or(i32::MAX);
            let question = entry.question.trim().to_string();
            let Some(kind) = entry.kind.filter(|_| !question.is_empty()) else {
                warn!(%section, seq, "Skipping question without text or type");
                plan.skipped += 1;
                continue;
            };

            if let Some(step) = step {
                plan.onboarding.push(OnboardingQuestionSeed {
                    step,
                    question,
                    kind,
                    options: entry.options,
                    constraints: entry.constraints,
                    seq,
                });
            } else if let Some(domain) = domain {
                plan.domains.push(DomainQuestionSeed {
                    domain,
                    question,
                    kind,
                    options: entry.options,
                    constraints: entry.constraints,
                    seq,
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(plan)
    } else {
        Err(errors)
    }
}

/// Upsert every question in `file_path`.
///
/// # Errors
///
/// Returns an error if the file can't be read or parsed, names an unknown
/// section, or a database write fails.
pub async fn questions(file_path: &Path) -> Result<(), CommandError> {
    info!(path = %file_path.display(), "Loading questions from file");

    // Read and validate YAML before connecting to database
    let content = tokio::fs::read_to_string(file_path)
        .await
        .map_err(|source| CommandError::Read {
            path: file_path.display().to_string(),
            source,
        })?;
    let file: SeedFile = serde_yaml::from_str(&content)?;

    let plan = plan(file).map_err(|errors| {
        error!("Seed file validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        CommandError::InvalidSeed(errors.len())
    })?;
    info!(
        onboarding = plan.onboarding.len(),
        domains = plan.domains.len(),
        skipped = plan.skipped,
        "Parsed seed file"
    );

    let pool = db::create_pool(&database_url()?).await?;
    info!("Connected to database");

    let onboarding = OnboardingRepository::new(&pool);
    for seed in &plan.onboarding {
        onboarding.upsert_question(seed).await?;
    }

    let domains = DomainRepository::new(&pool);
    for seed in &plan.domains {
        domains.upsert_question(seed).await?;
    }

    info!("Seeding complete!");
    info!("  Onboarding questions: {}", plan.onboarding.len());
    info!("  Domain questions: {}", plan.domains.len());
    info!("  Skipped: {}", plan.skipped);
    Ok(())
}
