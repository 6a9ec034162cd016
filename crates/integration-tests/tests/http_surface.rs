//! HTTP surface tests.
//!
//! Exercise the full router in-process: middleware, auth rejection and
//! request validation that happens before any database access.

#![allow(clippy::unwrap_used)]

use axum::body::Body;
use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::json;
use tower::ServiceExt;

use looks_lab_api::services::auth::tokens::{Claims, encode_access_token};
use looks_lab_core::{Email, UserId};
use looks_lab_integration_tests::{
    TEST_JWT_SECRET, body_json, body_text, get, json, request, test_app,
};

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_is_ok_without_database() {
    let response = test_app().oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");
}

#[tokio::test]
async fn test_readiness_reports_unreachable_database() {
    let response = test_app().oneshot(get("/health/ready")).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

// =============================================================================
// Middleware
// =============================================================================

#[tokio::test]
async fn test_security_headers_on_every_response() {
    let response = test_app().oneshot(get("/health")).await.unwrap();
    let headers = response.headers();

    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers["referrer-policy"], "strict-origin-when-cross-origin");
    // Development config: no HSTS
    assert!(headers.get("strict-transport-security").is_none());
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let req = request("GET", "/health")
        .header("x-request-id", "req-abc-123")
        .body(Body::empty())
        .unwrap();
    let response = test_app().oneshot(req).await.unwrap();

    assert_eq!(response.headers()["x-request-id"], "req-abc-123");
}

#[tokio::test]
async fn test_request_id_is_generated_when_missing() {
    let response = test_app().oneshot(get("/health")).await.unwrap();

    let id = response.headers()["x-request-id"].to_str().unwrap();
    assert!(uuid::Uuid::parse_str(id).is_ok(), "not a UUID: {id}");
}

#[tokio::test]
async fn test_cors_preflight_allows_any_origin_by_default() {
    let req = request("OPTIONS", "/api/v1/onboarding/sessions")
        .header("origin", "https://app.looks-lab.example")
        .header("access-control-request-method", "POST")
        .body(Body::empty())
        .unwrap();
    let response = test_app().oneshot(req).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let body = "x".repeat(3 * 1024 * 1024);
    let req = request("POST", "/api/v1/auth/google")
        .header("content-type", "application/json")
        .header("content-length", body.len())
        .body(Body::from(body))
        .unwrap();
    let response = test_app().oneshot(req).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let response = test_app().oneshot(get("/api/v1/carts")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Authentication
// =============================================================================

fn bearer(uri: &str, token: &str) -> axum::http::Request<Body> {
    request("GET", uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_protected_route_without_token_is_unauthorized() {
    let response = test_app().oneshot(get("/api/v1/users/me")).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await, json!({"detail": "Not authenticated"}));
}

#[tokio::test]
async fn test_protected_route_with_garbage_token_is_unauthorized() {
    let response = test_app()
        .oneshot(bearer("/api/v1/insights/me", "not.a.jwt"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await,
        json!({"detail": "Could not validate credentials"})
    );
}

#[tokio::test]
async fn test_protected_route_with_expired_token_is_unauthorized() {
    let email = Email::parse("sam@example.com").unwrap();
    let issued = Utc::now() - Duration::hours(2);
    let claims = Claims::new(UserId::new(7), &email, issued, Duration::minutes(30));
    let token = encode_access_token(TEST_JWT_SECRET.as_bytes(), &claims).unwrap();

    let response = test_app()
        .oneshot(bearer("/api/v1/subscriptions/me", &token))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await, json!({"detail": "Token has expired"}));
}

#[tokio::test]
async fn test_token_signed_with_another_secret_is_rejected() {
    let email = Email::parse("sam@example.com").unwrap();
    let claims = Claims::new(UserId::new(7), &email, Utc::now(), Duration::minutes(30));
    let token = encode_access_token(b"some-other-signing-secret-value!", &claims).unwrap();

    let response = test_app()
        .oneshot(bearer("/api/v1/domains/progress", &token))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_google_sign_in_unavailable_without_client_id() {
    let req = json(
        "POST",
        "/api/v1/auth/google",
        &json!({"id_token": "eyJhbGciOiJSUzI1NiJ9.e30.sig"}),
    );
    let response = test_app().oneshot(req).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        body_json(response).await,
        json!({"detail": "Google sign-in is not available"})
    );
}

#[tokio::test]
async fn test_domain_routes_require_auth_before_domain_parsing() {
    let response = test_app()
        .oneshot(get("/api/v1/domains/yoga/questions"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_sign_out_requires_auth() {
    let req = json("POST", "/api/v1/auth/sign-out", &json!({}));
    let response = test_app().oneshot(req).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Onboarding validation
// =============================================================================

#[tokio::test]
async fn test_onboarding_flow_rejects_unknown_step() {
    let uri = format!(
        "/api/v1/onboarding/sessions/{}/flow?step=bonus_round",
        uuid::Uuid::new_v4()
    );
    let response = test_app().oneshot(get(&uri)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.starts_with("Invalid step 'bonus_round'"));
    assert!(detail.contains("profile_setup"));
    assert!(detail.contains("experience_planning"));
}

#[tokio::test]
async fn test_onboarding_session_id_must_be_a_uuid() {
    let response = test_app()
        .oneshot(get("/api/v1/onboarding/sessions/12345"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_onboarding_answer_requires_json_body() {
    let uri = format!("/api/v1/onboarding/sessions/{}/answers", uuid::Uuid::new_v4());
    let req = request("POST", &uri)
        .header("content-type", "text/plain")
        .body(Body::from("height=180"))
        .unwrap();
    let response = test_app().oneshot(req).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn test_weekly_progress_requires_auth() {
    let response = test_app()
        .oneshot(get("/api/v1/users/me/progress/weekly"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Plans
// =============================================================================

#[tokio::test]
async fn test_plan_routes_require_auth() {
    for uri in [
        "/api/v1/domains/workout/generate-plan",
        "/api/v1/domains/diet/generate-meal-plan",
    ] {
        let req = json("POST", uri, &json!({"focus": "build_muscle"}));
        let response = test_app().oneshot(req).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
    }
}

#[tokio::test]
async fn test_plan_route_is_not_a_domain_question_route() {
    let response = test_app()
        .oneshot(get("/api/v1/domains/workout/generate-plan"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

// =============================================================================
// Legal
// =============================================================================

#[tokio::test]
async fn test_privacy_policy_is_public() {
    let response = test_app()
        .oneshot(get("/api/v1/legal/privacy-policy"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["title"], "Privacy Policy");
    assert_eq!(body["app_name"], "Looks Lab");
    assert_eq!(body["last_updated"], "2026-02-17");
    assert_eq!(body["sections"].as_array().unwrap().len(), 7);
    assert!(body["sections"][0]["title"].is_null());
}

#[tokio::test]
async fn test_terms_of_service_is_public() {
    let response = test_app()
        .oneshot(get("/api/v1/legal/terms-of-service"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["title"], "Terms of Service");
    let sections = body["sections"].as_array().unwrap();
    assert_eq!(sections.len(), 11);
    assert_eq!(sections[0]["title"], "Acceptance of Terms");
    assert_eq!(sections[1]["points"].as_array().unwrap().len(), 5);
    assert!(sections[2]["points"].is_null());
}
