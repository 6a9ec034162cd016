//! Privacy policy and terms of service, served as structured JSON so the
//! app renders them natively.

use axum::{Json, Router, routing::get};
use serde::Serialize;

use crate::state::AppState;

const APP_NAME: &str = "Looks Lab";
const LAST_UPDATED: &str = "2026-02-17";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/privacy-policy", get(privacy_policy))
        .route("/terms-of-service", get(terms_of_service))
}

#[derive(Debug, Clone, Serialize)]
pub struct LegalSection {
    pub title: Option<&'static str>,
    pub content: &'static str,
    pub points: Option<&'static [&'static str]>,
}

impl LegalSection {
    const fn text(content: &'static str) -> Self {
        Self {
            title: None,
            content,
            points: None,
        }
    }

    const fn titled(title: &'static str, content: &'static str) -> Self {
        Self {
            title: Some(title),
            content,
            points: None,
        }
    }

    const fn with_points(mut self, points: &'static [&'static str]) -> Self {
        self.points = Some(points);
        self
    }
}

#[derive(Debug, Serialize)]
pub struct PrivacyPolicy {
    pub title: &'static str,
    pub last_updated: &'static str,
    pub app_name: &'static str,
    pub sections: &'static [LegalSection],
}

#[derive(Debug, Serialize)]
pub struct TermsOfService {
    pub title: &'static str,
    pub last_updated: &'static str,
    pub app_name: &'static str,
    pub intro: &'static str,
    pub sections: &'static [LegalSection],
}

const PRIVACY_SECTIONS: &[LegalSection] = &[
    LegalSection::text(
        "Looks Lab values your privacy and is committed to protecting your personal information. \
         When you use our app, we may collect certain personal information such as your name, \
         email address, username, and account details to allow you to sign up, log in, and \
         personalize your experience.",
    ),
    LegalSection::text(
        "We may also collect non-personal information including device type, operating system, \
         language preferences, and app usage data to improve app performance and stability. \
         Any prompts, preferences, or content you submit within the app may be temporarily \
         stored for processing and service improvement, but will not be shared with third \
         parties for advertising or resale.",
    ),
    LegalSection::text(
        "We do not sell, trade, or rent your personal information. Your data may only be \
         shared with trusted service providers that help operate the app or if required by law. \
         Data is retained only as long as necessary to provide the service, after which it is \
         securely deleted. You can request deletion of your account and related data at any \
         time by contacting us.",
    ),
    LegalSection::text(
        "We take appropriate technical and organizational measures to protect your information \
         from unauthorized access, loss, or misuse, but please understand that no digital \
         system can be completely secure.",
    ),
    LegalSection::text(
        "Looks Lab is intended for general audiences and does not knowingly collect data from \
         children under 13 years of age. If such data is discovered, it will be deleted \
         immediately.",
    ),
    LegalSection::text(
        "By using Looks Lab, you consent to the collection and use of information as described \
         in this policy. We may update this Privacy Policy periodically, and the updated version \
         will be available in the app. Continued use of the app after updates means you accept \
         the revised terms.",
    ),
    LegalSection::text(
        "For any questions, concerns, or requests regarding your privacy, please contact us at \
         support@looks-lab.com.",
    ),
];

const TERMS_INTRO: &str = "Welcome to Looks Lab ('we', 'our', 'us'). These Terms of Use govern \
     your use of our mobile application (the 'Service'). By accessing or using Looks Lab, you \
     agree to be bound by these Terms.";

const TERMS_SECTIONS: &[LegalSection] = &[
    LegalSection::titled(
        "Acceptance of Terms",
        "By registering or using our Service, you confirm that you are at least 13 years of age \
         and you agree to these Terms and our Privacy Policy. If you do not agree, please \
         discontinue use of the Service.",
    ),
    LegalSection::titled(
        "Description of Service",
        "Looks Lab is an AI-powered personal transformation app that provides personalized \
         recommendations for skincare, hair care, fitness, diet, fashion, and more based on \
         your unique profile and goals.",
    )
    .with_points(&[
        "Get AI-powered personalized recommendations",
        "Track your transformation progress over time",
        "Access domain-specific routines and product recommendations",
        "Upload photos for AI analysis and personalized insights",
        "Access premium features with an active subscription",
    ]),
    LegalSection::titled(
        "User Accounts",
        "When creating an account, you must provide accurate and complete information. \
         You are responsible for maintaining the confidentiality of your login credentials \
         and all activity conducted under your account.",
    ),
    LegalSection::titled(
        "Intellectual Property",
        "All content, design, branding, and features within Looks Lab are the exclusive \
         property of our company. You may not copy, modify, reverse engineer, or redistribute \
         any part of the Service without prior permission.",
    ),
    LegalSection::titled(
        "User Content",
        "Any content you create remains yours. However, by using Looks Lab, you grant us \
         permission to store, process, and use anonymized data to improve the Service. \
         You are responsible for:",
    )
    .with_points(&[
        "Ensuring your content does not violate laws or third-party rights",
        "Not generating harmful, illegal, or offensive content",
        "Avoiding false or misleading information",
        "Not uploading content that violates others' privacy",
    ]),
    LegalSection::titled(
        "Subscription & Payments",
        "Access to premium features requires an active subscription. Subscriptions are billed \
         on a weekly, monthly, or yearly basis depending on your selected plan. All payments \
         are non-refundable unless required by law. You may cancel your subscription at any \
         time through the app settings.",
    ),
    LegalSection::titled(
        "Privacy",
        "Your use of the Service is also governed by our Privacy Policy, which is incorporated \
         into these Terms by reference. Please review our Privacy Policy to understand our \
         practices.",
    ),
    LegalSection::titled(
        "Termination",
        "We reserve the right to suspend or terminate your account if you violate these Terms \
         or engage in any activity that harms the Service or other users. You may delete your \
         account at any time through the app settings.",
    ),
    LegalSection::titled(
        "Limitation of Liability",
        "Looks Lab is provided 'as is' without warranties of any kind. We are not liable for \
         any indirect, incidental, or consequential damages arising from your use of the \
         Service. AI recommendations are for informational purposes only and should not \
         replace professional medical or health advice.",
    ),
    LegalSection::titled(
        "Changes to Terms",
        "We may update these Terms from time to time. The updated version will be available \
         in the app. Continued use of the Service after changes means you accept the revised \
         Terms.",
    ),
    LegalSection::titled(
        "Contact Us",
        "For any questions or concerns about these Terms, please contact us at \
         support@looks-lab.com.",
    ),
];

/// GET /legal/privacy-policy
async fn privacy_policy() -> Json<PrivacyPolicy> {
    Json(PrivacyPolicy {
        title: "Privacy Policy",
        last_updated: LAST_UPDATED,
        app_name: APP_NAME,
        sections: PRIVACY_SECTIONS,
    })
}

/// GET /legal/terms-of-service
async fn terms_of_service() -> Json<TermsOfService> {
    Json(TermsOfService {
        title: "Terms of Service",
        last_updated: LAST_UPDATED,
        app_name: APP_NAME,
        intro: TERMS_INTRO,
        sections: TERMS_SECTIONS,
    })
}
