//! Wellness domains.
//!
//! A domain is one of the eight areas a user can pick after onboarding. Each
//! domain owns its questionnaire and its AI prompt. The canonical string form
//! is what gets stored in `domain_questions.domain` and
//! `onboarding_sessions.selected_domain`; note that `quit porn` contains a
//! space.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::status::InsightCategory;

/// The input did not name a known domain.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid domain. Must be one of: {}", Domain::names().join(", "))]
pub struct DomainError {
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum Domain {
    Skincare,
    Haircare,
    Fashion,
    Workout,
    Diet,
    Height,
    QuitPorn,
    Facial,
}

impl Domain {
    pub const ALL: [Self; 8] = [
        Self::Skincare,
        Self::Haircare,
        Self::Fashion,
        Self::Workout,
        Self::Diet,
        Self::Height,
        Self::QuitPorn,
        Self::Facial,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Skincare => "skincare",
            Self::Haircare => "haircare",
            Self::Fashion => "fashion",
            Self::Workout => "workout",
            Self::Diet => "diet",
            Self::Height => "height",
            Self::QuitPorn => "quit porn",
            Self::Facial => "facial",
        }
    }

    /// Canonical names of every domain, in display order.
    #[must_use]
    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|d| d.as_str()).collect()
    }

    /// Parse a user-supplied domain name.
    ///
    /// Matching ignores case and surrounding whitespace, and treats `_` and
    /// `-` as spaces so `quit_porn` and `Quit-Porn` both resolve.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] if the name matches no domain.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let normalized = raw.trim().to_lowercase().replace(['_', '-'], " ");
        match normalized.as_str() {
            "skincare" | "skin care" => Ok(Self::Skincare),
            "haircare" | "hair care" => Ok(Self::Haircare),
            "fashion" => Ok(Self::Fashion),
            "workout" => Ok(Self::Workout),
            "diet" => Ok(Self::Diet),
            "height" => Ok(Self::Height),
            "quit porn" | "quitporn" => Ok(Self::QuitPorn),
            "facial" => Ok(Self::Facial),
            _ => Err(DomainError {
                value: raw.to_owned(),
            }),
        }
    }

    #[must_use]
    pub const fn insight_category(self) -> InsightCategory {
        match self {
            Self::Skincare => InsightCategory::Skincare,
            Self::Haircare => InsightCategory::HairCare,
            Self::Fashion => InsightCategory::Fashion,
            Self::Workout => InsightCategory::Workout,
            Self::Diet => InsightCategory::Diet,
            Self::Height => InsightCategory::Height,
            Self::QuitPorn => InsightCategory::QuitPorn,
            Self::Facial => InsightCategory::Facial,
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Domain {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Domain {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Domain> for &'static str {
    fn from(domain: Domain) -> Self {
        domain.as_str()
    }
}

impl_text_sqlx!(Domain);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_forgiving_about_spelling() {
        assert_eq!(Domain::parse("Skincare").unwrap(), Domain::Skincare);
        assert_eq!(Domain::parse(" haircare ").unwrap(), Domain::Haircare);
        assert_eq!(Domain::parse("quit porn").unwrap(), Domain::QuitPorn);
        assert_eq!(Domain::parse("quit_porn").unwrap(), Domain::QuitPorn);
        assert_eq!(Domain::parse("Quit-Porn").unwrap(), Domain::QuitPorn);
    }

    #[test]
    fn test_parse_rejects_unknown_with_full_list() {
        let err = Domain::parse("yoga").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid domain. Must be one of: skincare, haircare, fashion, workout, diet, height, quit porn, facial"
        );
        assert_eq!(err.value, "yoga");
    }

    #[test]
    fn test_round_trips_through_canonical_name() {
        for domain in Domain::ALL {
            assert_eq!(domain.as_str().parse::<Domain>().unwrap(), domain);
        }
    }

    #[test]
    fn test_serde_uses_canonical_name() {
        let json = serde_json::to_string(&Domain::QuitPorn).unwrap();
        assert_eq!(json, "\"quit porn\"");
        let parsed: Domain = serde_json::from_str("\"FACIAL\"").unwrap();
        assert_eq!(parsed, Domain::Facial);
    }

    #[test]
    fn test_insight_category_matches_domain() {
        assert_eq!(
            Domain::Haircare.insight_category(),
            InsightCategory::HairCare
        );
    }
}
