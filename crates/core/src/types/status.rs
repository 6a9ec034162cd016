//! Status and kind enums stored as `TEXT` columns.

/// A string did not match any variant of a [`text_enum!`] type.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

text_enum! {
    /// Sections of the onboarding questionnaire, in traversal order.
    OnboardingStep {
        ProfileSetup => "profile_setup",
        DailyLifestyle => "daily_lifestyle",
        Motivation => "motivation",
        GoalsFocus => "goals_focus",
        ExperiencePlanning => "experience_planning",
    }
}

impl OnboardingStep {
    /// The step that follows this one, or `None` after the last step.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        let pos = Self::ALL.iter().position(|s| *s == self)?;
        Self::ALL.get(pos + 1).copied()
    }

    /// The first step of the questionnaire.
    #[must_use]
    pub const fn first() -> Self {
        Self::ProfileSetup
    }
}

text_enum! {
    /// How a question expects to be answered.
    QuestionType {
        Text => "text",
        Choice => "choice",
        MultiChoice => "multi-choice",
        Numeric => "numeric",
    }
}

text_enum! {
    /// Identity provider a user signed up with.
    AuthProvider {
        Google => "google",
        Apple => "apple",
    }
}

text_enum! {
    /// Processing state of an uploaded image.
    #[derive(Default)]
    ImageStatus {
        #[default]
        Pending => "pending",
        Processed => "processed",
        Failed => "failed",
    }
}

text_enum! {
    /// Origin of an image record.
    #[derive(Default)]
    ImageType {
        #[default]
        Uploaded => "uploaded",
        Generated => "generated",
        Preview => "preview",
        Final => "final",
    }
}

text_enum! {
    PlanType {
        Weekly => "weekly",
        Monthly => "monthly",
        Yearly => "yearly",
    }
}

text_enum! {
    /// Subscription lifecycle state.
    ///
    /// `Expired` is also reported for an `Active` row whose end date has
    /// passed, before any job has rewritten the stored value.
    SubscriptionStatus {
        Pending => "pending",
        Active => "active",
        Expired => "expired",
        Cancelled => "cancelled",
    }
}

text_enum! {
    /// Category of a stored AI insight. Mirrors the wellness domains.
    InsightCategory {
        Skincare => "skincare",
        HairCare => "hair care",
        Fashion => "fashion",
        Workout => "workout",
        QuitPorn => "quit porn",
        Diet => "diet",
        Height => "height",
        Facial => "facial",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_onboarding_steps_chain_in_order() {
        let mut step = OnboardingStep::first();
        let mut visited = vec![step];
        while let Some(next) = step.next() {
            visited.push(next);
            step = next;
        }
        assert_eq!(visited, OnboardingStep::ALL);
        assert_eq!(OnboardingStep::ExperiencePlanning.next(), None);
    }

    #[test]
    fn test_question_type_uses_hyphenated_multi_choice() {
        assert_eq!(QuestionType::MultiChoice.as_str(), "multi-choice");
        assert_eq!(
            "multi-choice".parse::<QuestionType>().unwrap(),
            QuestionType::MultiChoice
        );
        let json = serde_json::to_string(&QuestionType::MultiChoice).unwrap();
        assert_eq!(json, "\"multi-choice\"");
    }

    #[test]
    fn test_unknown_variant_error_names_the_kind() {
        let err = "lifetime".parse::<PlanType>().unwrap_err();
        assert_eq!(err.to_string(), "invalid PlanType: lifetime");
    }

    #[test]
    fn test_defaults() {
        assert_eq!(ImageStatus::default(), ImageStatus::Pending);
        assert_eq!(ImageType::default(), ImageType::Uploaded);
    }

    #[test]
    fn test_insight_category_spaced_names() {
        assert_eq!(InsightCategory::HairCare.to_string(), "hair care");
        assert_eq!(
            serde_json::from_str::<InsightCategory>("\"quit porn\"").unwrap(),
            InsightCategory::QuitPorn
        );
    }
}
