//! Access token signing and verification.

#![allow(clippy::unwrap_used)]

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{Duration, TimeZone, Utc};

use looks_lab_api::services::auth::AuthError;
use looks_lab_api::services::auth::tokens::{
    Claims, decode_access_token, encode_access_token, new_refresh_token,
};
use looks_lab_core::{Email, UserId};
use looks_lab_integration_tests::TEST_JWT_SECRET;

const SECRET: &[u8] = TEST_JWT_SECRET.as_bytes();

fn claims(ttl: Duration) -> Claims {
    let email = Email::parse("Riley@Example.com").unwrap();
    let issued = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
    Claims::new(UserId::new(42), &email, issued, ttl)
}

#[test]
fn test_token_round_trip() {
    let claims = claims(Duration::minutes(60));
    let token = encode_access_token(SECRET, &claims).unwrap();
    assert_eq!(token.split('.').count(), 3);

    let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();
    let decoded = decode_access_token(SECRET, &token, now).unwrap();
    assert_eq!(decoded, claims);
    assert_eq!(decoded.user_id().unwrap(), UserId::new(42));
    assert_eq!(decoded.exp - decoded.iat, 3600);
}

#[test]
fn test_token_expires_at_exp() {
    let token = encode_access_token(SECRET, &claims(Duration::minutes(60))).unwrap();

    let at_expiry = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();
    assert!(matches!(
        decode_access_token(SECRET, &token, at_expiry),
        Err(AuthError::TokenExpired)
    ));
}

#[test]
fn test_tampered_payload_is_rejected() {
    let token = encode_access_token(SECRET, &claims(Duration::minutes(60))).unwrap();
    let mut parts: Vec<&str> = token.split('.').collect();

    let forged = URL_SAFE_NO_PAD.encode(
        r#"{"sub":"1","email":"admin@example.com","iat":1772355600,"exp":4102444800}"#,
    );
    parts[1] = &forged;
    let forged_token = parts.join(".");

    let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();
    assert!(matches!(
        decode_access_token(SECRET, &forged_token, now),
        Err(AuthError::InvalidToken)
    ));
}

#[test]
fn test_unsigned_tokens_are_rejected() {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(r#"{"sub":"42","email":"a@b.co","iat":0,"exp":4102444800}"#);
    let token = format!("{header}.{payload}.");

    assert!(matches!(
        decode_access_token(SECRET, &token, Utc::now()),
        Err(AuthError::InvalidToken)
    ));
}

#[test]
fn test_malformed_tokens_are_rejected() {
    for token in ["", "abc", "a.b", "a.b.c.d", "...."] {
        assert!(
            matches!(
                decode_access_token(SECRET, token, Utc::now()),
                Err(AuthError::InvalidToken)
            ),
            "{token:?}"
        );
    }
}

#[test]
fn test_refresh_tokens_are_unique() {
    let first = new_refresh_token();
    let second = new_refresh_token();
    assert_ne!(first, second);
    assert!(uuid::Uuid::parse_str(&first).is_ok());
}
