//! Domain questionnaires, access checks and AI completion.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;
use tracing::instrument;

use looks_lab_core::{Domain, QuestionId, SubscriptionStatus, UserId};

use crate::ai::{self, AiOutput, AnswerContext, GeminiClient, GeminiError, ImageContext};
use crate::db::domains::AnsweredDomainQuestion;
use crate::db::images::ImageFilter;
use crate::db::{DomainRepository, ImageRepository, OnboardingRepository, SubscriptionRepository};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::models::{DomainAnswer, DomainQuestion, OnboardingSession, Subscription};

use super::onboarding::SectionProgress;

/// Gate a domain behind the user's onboarding choice, payment and
/// subscription. Checks run in order and the first failure wins.
///
/// # Errors
///
/// Returns `AppError::Forbidden` or `AppError::PaymentRequired` naming the
/// failed check.
pub fn check_access(
    session: Option<&OnboardingSession>,
    subscription: Option<&Subscription>,
    domain: Domain,
    now: DateTime<Utc>,
) -> Result<()> {
    let session =
        session.ok_or_else(|| AppError::Forbidden("No onboarding session found".to_string()))?;

    let selected = session.selected_domain.as_deref().unwrap_or_default();
    if Domain::parse(selected).ok() != Some(domain) {
        return Err(AppError::Forbidden(format!(
            "Access denied. Your selected domain is '{selected}'"
        )));
    }

    if !session.is_paid {
        return Err(AppError::PaymentRequired(
            "Payment required for domain access".to_string(),
        ));
    }

    let subscription = subscription
        .ok_or_else(|| AppError::Forbidden("No active subscription found".to_string()))?;

    if subscription.is_past_end(now) {
        return Err(AppError::PaymentRequired("Subscription expired".to_string()));
    }

    if subscription.status != SubscriptionStatus::Active {
        return Err(AppError::Forbidden(format!(
            "Subscription not active (status: {})",
            subscription.status
        )));
    }

    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct DomainProgress {
    pub user_id: UserId,
    pub domain: Domain,
    pub progress: SectionProgress,
    pub answered_questions: Vec<QuestionId>,
    pub total_questions: usize,
    pub progress_percent: f64,
    pub subscription_status: Option<SubscriptionStatus>,
}

/// Share of `answered` over `total`, as a percentage.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn percent(answered: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        answered as f64 / total as f64 * 100.0
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10_f64.powi(places);
    (value * factor).round() / factor
}

/// Next question of a domain, or the analysis once all are answered.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DomainFlow {
    InProgress {
        question: DomainQuestion,
        next: Option<DomainQuestion>,
        progress: DomainProgress,
    },
    Completed {
        progress: DomainProgress,
        redirect: &'static str,
        #[serde(flatten)]
        analysis: AiOutput,
    },
}

#[derive(Debug, Serialize)]
pub struct DomainAnswers {
    pub user_id: UserId,
    pub domain: Domain,
    pub answers: Vec<AnsweredDomainQuestion>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainSummary {
    pub domain: Domain,
    pub progress_percent: f64,
    pub answered_questions: usize,
    pub total_questions: usize,
    pub is_completed: bool,
}

impl DomainSummary {
    const fn empty(domain: Domain) -> Self {
        Self {
            domain,
            progress_percent: 0.0,
            answered_questions: 0,
            total_questions: 0,
            is_completed: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AllDomainsProgress {
    pub user_id: UserId,
    pub domains: Vec<DomainSummary>,
    pub overall_average: f64,
    pub domains_started: usize,
    pub domains_completed: usize,
    pub total_domains: usize,
}

/// Roll per-domain summaries up into the home screen overview.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn summarize(user_id: UserId, domains: Vec<DomainSummary>) -> AllDomainsProgress {
    let average = if domains.is_empty() {
        0.0
    } else {
        domains.iter().map(|d| d.progress_percent).sum::<f64>() / domains.len() as f64
    };

    AllDomainsProgress {
        user_id,
        overall_average: round_to(average, 2),
        domains_started: domains.iter().filter(|d| d.progress_percent > 0.0).count(),
        domains_completed: domains.iter().filter(|d| d.is_completed).count(),
        total_domains: domains.len(),
        domains,
    }
}

/// Whether a domain has enough input for the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisGate {
    Ready,
    TooFewAnswers { answered: usize, required: usize },
    MissingImages,
}

/// Decide whether analysis runs for `answers` answered questions and
/// `images` uploaded images. The answer count is checked first.
#[must_use]
pub const fn analysis_gate(domain: Domain, answers: usize, images: usize) -> AnalysisGate {
    let needs = ai::requirements(domain);
    if answers < needs.min_answers {
        return AnalysisGate::TooFewAnswers {
            answered: answers,
            required: needs.min_answers,
        };
    }
    if needs.requires_images && images == 0 {
        return AnalysisGate::MissingImages;
    }
    AnalysisGate::Ready
}

/// Domain questionnaire service.
pub struct DomainService<'a> {
    domains: DomainRepository<'a>,
    onboarding: OnboardingRepository<'a>,
    subscriptions: SubscriptionRepository<'a>,
    images: ImageRepository<'a>,
    gemini: &'a GeminiClient,
}

impl<'a> DomainService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, gemini: &'a GeminiClient) -> Self {
        Self {
            domains: DomainRepository::new(pool),
            onboarding: OnboardingRepository::new(pool),
            subscriptions: SubscriptionRepository::new(pool),
            images: ImageRepository::new(pool),
            gemini,
        }
    }

    /// # Errors
    ///
    /// Returns the first failed access check, see [`check_access`].
    #[instrument(skip(self))]
    pub async fn check_domain_access(&self, user_id: UserId, domain: Domain) -> Result<()> {
        let session = self.onboarding.latest_session_for_user(user_id).await?;
        let subscription = self.subscriptions.get_for_user(user_id).await?;
        check_access(session.as_ref(), subscription.as_ref(), domain, Utc::now())
    }

    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the domain has no questions.
    pub async fn questions(&self, domain: Domain) -> Result<Vec<DomainQuestion>> {
        let questions = self.domains.questions_for_domain(domain).await?;
        if questions.is_empty() {
            return Err(AppError::NotFound(format!(
                "No questions found for domain '{domain}'"
            )));
        }
        Ok(questions)
    }

    /// Validate and store an answer, replacing any earlier one.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the question doesn't exist in this
    /// domain and `AppError::InvalidAnswer` if the answer doesn't fit it.
    #[instrument(skip(self, answer))]
    pub async fn save_answer(
        &self,
        user_id: UserId,
        domain: Domain,
        question_id: QuestionId,
        answer: &Value,
    ) -> Result<DomainAnswer> {
        let question = self
            .domains
            .get_question(question_id)
            .await?
            .filter(|q| q.domain == domain)
            .ok_or_else(|| AppError::NotFound("Question not found".to_string()))?;

        question.validate(answer)?;

        let saved = self
            .domains
            .upsert_answer(user_id, question_id, domain, answer)
            .await?;

        let question_key = question_id.to_string();
        add_breadcrumb(
            "domain",
            "Answer saved",
            Some(&[
                ("domain", domain.as_str()),
                ("question_id", question_key.as_str()),
            ]),
        );
        tracing::info!("Saved domain answer");
        Ok(saved)
    }

    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the domain has no questions.
    pub async fn calculate_progress(
        &self,
        user_id: UserId,
        domain: Domain,
    ) -> Result<DomainProgress> {
        let questions = self.questions(domain).await?;
        let answered = self.domains.answered_question_ids(user_id, domain).await?;
        let subscription = self.subscriptions.get_for_user(user_id).await?;

        let total = questions.len();
        Ok(DomainProgress {
            user_id,
            domain,
            progress: SectionProgress::new(total, answered.len()),
            progress_percent: percent(answered.len(), total),
            answered_questions: answered,
            total_questions: total,
            subscription_status: subscription.map(|s| s.effective_status(Utc::now())),
        })
    }

    /// The first unanswered question, or the AI analysis when none remain.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the domain has no questions. AI
    /// failures never fail this call.
    #[instrument(skip(self))]
    pub async fn next_or_complete(&self, user_id: UserId, domain: Domain) -> Result<DomainFlow> {
        let questions = self.questions(domain).await?;
        let answered: HashSet<QuestionId> = self
            .domains
            .answered_question_ids(user_id, domain)
            .await?
            .into_iter()
            .collect();

        let mut remaining = questions.iter().skip_while(|q| answered.contains(&q.id));
        if let Some(question) = remaining.next() {
            return Ok(DomainFlow::InProgress {
                question: question.clone(),
                next: remaining.next().cloned(),
                progress: self.calculate_progress(user_id, domain).await?,
            });
        }

        let analysis = match self.run_analysis(user_id, domain).await {
            Ok(analysis) => analysis,
            Err(e) => {
                tracing::error!(error = %e, "AI processing failed");
                AiOutput::default()
            }
        };

        Ok(DomainFlow::Completed {
            progress: self.calculate_progress(user_id, domain).await?,
            redirect: "completed_flow",
            analysis,
        })
    }

    /// Rerun the analysis on demand. Unlike the completed flow, failures are
    /// returned to the caller.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Ai` if the model call fails.
    pub async fn retry_ai(&self, user_id: UserId, domain: Domain) -> Result<AiOutput> {
        Ok(self.run_analysis(user_id, domain).await?)
    }

    /// Run the processor when the user has given enough input. Below the
    /// minimum the call is skipped and every field is `None`.
    async fn run_analysis(
        &self,
        user_id: UserId,
        domain: Domain,
    ) -> std::result::Result<AiOutput, AnalysisError> {
        let answers: Vec<AnswerContext> = self
            .domains
            .answered_questions(user_id, domain)
            .await?
            .into_iter()
            .map(|a| AnswerContext {
                step: a.seq,
                question: a.question,
                answer: a.answer,
            })
            .collect();
        let images = self.domain_images(user_id, domain).await;

        match analysis_gate(domain, answers.len(), images.len()) {
            AnalysisGate::Ready => {}
            AnalysisGate::TooFewAnswers { answered, required } => {
                tracing::warn!(answered, required, "Not enough answers for AI analysis");
                return Ok(AiOutput::default());
            }
            AnalysisGate::MissingImages => {
                tracing::warn!("AI analysis requires images but none were uploaded");
                return Ok(AiOutput::default());
            }
        }

        let output = ai::analyze(self.gemini, domain, &answers, &images).await?;
        tracing::info!("AI processing complete");
        Ok(output)
    }

    async fn domain_images(&self, user_id: UserId, domain: Domain) -> Vec<ImageContext> {
        let filter = ImageFilter {
            domain: Some(domain),
            ..ImageFilter::default()
        };
        match self.images.list_for_user(user_id, &filter).await {
            Ok(images) => images
                .into_iter()
                .map(|image| ImageContext {
                    url: image.url.or(image.s3_key),
                    view: image.view,
                })
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "Could not fetch domain images");
                Vec::new()
            }
        }
    }

    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn user_answers(&self, user_id: UserId, domain: Domain) -> Result<DomainAnswers> {
        let answers = self.domains.answered_questions(user_id, domain).await?;
        Ok(DomainAnswers {
            user_id,
            domain,
            answers,
        })
    }

    /// Progress across every domain. A domain that can't be measured counts
    /// as untouched.
    ///
    /// # Errors
    ///
    /// This call does not fail on per-domain errors.
    pub async fn all_domains_progress(&self, user_id: UserId) -> Result<AllDomainsProgress> {
        let mut summaries = Vec::with_capacity(Domain::ALL.len());
        for domain in Domain::ALL {
            let summary = match self.calculate_progress(user_id, domain).await {
                Ok(progress) => DomainSummary {
                    domain,
                    progress_percent: round_to(progress.progress_percent, 1),
                    answered_questions: progress.answered_questions.len(),
                    total_questions: progress.total_questions,
                    is_completed: progress.progress.completed,
                },
                Err(AppError::NotFound(_)) => DomainSummary::empty(domain),
                Err(e) => {
                    tracing::error!(%domain, error = %e, "Error getting domain progress");
                    DomainSummary::empty(domain)
                }
            };
            summaries.push(summary);
        }

        Ok(summarize(user_id, summaries))
    }
}

/// Why an analysis run stopped.
#[derive(Debug, thiserror::Error)]
enum AnalysisError {
    #[error(transparent)]
    Database(#[from] crate::db::RepositoryError),
    #[error(transparent)]
    Ai(#[from] GeminiError),
}

impl From<AnalysisError> for AppError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::Database(e) => Self::Database(e),
            AnalysisError::Ai(e) => Self::Ai(e),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;
    use looks_lab_core::{PlanType, SubscriptionId};
    use uuid::Uuid;

    use super::*;

    fn session(domain: Option<&str>, is_paid: bool) -> OnboardingSession {
        let now = Utc::now();
        OnboardingSession {
            id: Uuid::new_v4(),
            user_id: Some(UserId::new(1)),
            selected_domain: domain.map(String::from),
            is_paid,
            payment_confirmed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn subscription(status: SubscriptionStatus, end_date: Option<DateTime<Utc>>) -> Subscription {
        let now = Utc::now();
        Subscription {
            id: SubscriptionId::new(1),
            user_id: UserId::new(1),
            plan: PlanType::Monthly,
            status,
            payment_id: None,
            start_date: now,
            end_date,
            trial_end: None,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn denial(result: Result<()>) -> (u16, String) {
        match result.unwrap_err() {
            AppError::Forbidden(msg) => (403, msg),
            AppError::PaymentRequired(msg) => (402, msg),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_access_requires_session() {
        let now = Utc::now();
        assert_eq!(
            denial(check_access(None, None, Domain::Diet, now)),
            (403, "No onboarding session found".to_string())
        );
    }

    #[test]
    fn test_access_rejects_other_domain() {
        let now = Utc::now();
        let session = session(Some("skincare"), true);
        assert_eq!(
            denial(check_access(Some(&session), None, Domain::Diet, now)),
            (403, "Access denied. Your selected domain is 'skincare'".to_string())
        );
    }

    #[test]
    fn test_access_requires_payment_before_subscription() {
        let now = Utc::now();
        let session = session(Some("diet"), false);
        assert_eq!(
            denial(check_access(Some(&session), None, Domain::Diet, now)),
            (402, "Payment required for domain access".to_string())
        );
    }

    #[test]
    fn test_access_subscription_checks() {
        let now = Utc::now();
        let session = session(Some("quit porn"), true);

        assert_eq!(
            denial(check_access(Some(&session), None, Domain::QuitPorn, now)),
            (403, "No active subscription found".to_string())
        );

        let expired = subscription(SubscriptionStatus::Active, Some(now - Duration::days(1)));
        assert_eq!(
            denial(check_access(Some(&session), Some(&expired), Domain::QuitPorn, now)),
            (402, "Subscription expired".to_string())
        );

        let cancelled = subscription(SubscriptionStatus::Cancelled, None);
        assert_eq!(
            denial(check_access(Some(&session), Some(&cancelled), Domain::QuitPorn, now)),
            (403, "Subscription not active (status: cancelled)".to_string())
        );

        let active = subscription(SubscriptionStatus::Active, Some(now + Duration::days(30)));
        assert!(check_access(Some(&session), Some(&active), Domain::QuitPorn, now).is_ok());
    }

    #[test]
    fn test_analysis_gate_needs_minimum_answers() {
        assert_eq!(
            analysis_gate(Domain::Haircare, 3, 0),
            AnalysisGate::TooFewAnswers {
                answered: 3,
                required: 4
            }
        );
        assert_eq!(analysis_gate(Domain::Haircare, 4, 0), AnalysisGate::Ready);
        assert_eq!(
            analysis_gate(Domain::Workout, 4, 2),
            AnalysisGate::TooFewAnswers {
                answered: 4,
                required: 5
            }
        );
    }

    #[test]
    fn test_analysis_gate_skincare_needs_images() {
        assert_eq!(analysis_gate(Domain::Skincare, 6, 0), AnalysisGate::MissingImages);
        assert_eq!(analysis_gate(Domain::Skincare, 6, 1), AnalysisGate::Ready);
        // Too few answers is reported before missing images
        assert_eq!(
            analysis_gate(Domain::Skincare, 2, 0),
            AnalysisGate::TooFewAnswers {
                answered: 2,
                required: 6
            }
        );
        assert_eq!(analysis_gate(Domain::Fashion, 5, 0), AnalysisGate::Ready);
    }

    #[test]
    fn test_percent() {
        assert!((percent(0, 0) - 0.0).abs() < f64::EPSILON);
        assert!((percent(1, 4) - 25.0).abs() < f64::EPSILON);
        assert!((percent(3, 3) - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_summarize_rounds_and_counts() {
        let domains = vec![
            DomainSummary {
                domain: Domain::Skincare,
                progress_percent: round_to(percent(1, 3), 1),
                answered_questions: 1,
                total_questions: 3,
                is_completed: false,
            },
            DomainSummary {
                domain: Domain::Diet,
                progress_percent: 100.0,
                answered_questions: 5,
                total_questions: 5,
                is_completed: true,
            },
            DomainSummary::empty(Domain::Height),
        ];

        let overview = summarize(UserId::new(9), domains);
        assert!((overview.domains[0].progress_percent - 33.3).abs() < 1e-9);
        assert!((overview.overall_average - 44.43).abs() < 1e-9);
        assert_eq!(overview.domains_started, 2);
        assert_eq!(overview.domains_completed, 1);
        assert_eq!(overview.total_domains, 3);
    }

    #[test]
    fn test_completed_flow_flattens_ai_fields() {
        let progress = DomainProgress {
            user_id: UserId::new(1),
            domain: Domain::Height,
            progress: SectionProgress::new(5, 5),
            answered_questions: vec![],
            total_questions: 5,
            progress_percent: 100.0,
            subscription_status: Some(SubscriptionStatus::Active),
        };
        let flow = DomainFlow::Completed {
            progress,
            redirect: "completed_flow",
            analysis: AiOutput::default(),
        };

        let value = serde_json::to_value(&flow).unwrap();
        assert_eq!(value["status"], "completed");
        assert_eq!(value["redirect"], "completed_flow");
        assert!(value["ai_attributes"].is_null());
        assert!(value.as_object().unwrap().contains_key("ai_style"));
        assert_eq!(value["progress"]["subscription_status"], "active");
    }
}
