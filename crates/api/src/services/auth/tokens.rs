//! Signed access tokens and opaque refresh tokens.
//!
//! Access tokens are compact HS256 JWTs carrying the user id and email.
//! Refresh tokens are random UUIDs stored server-side.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

use looks_lab_core::{Email, UserId};

use super::AuthError;

type HmacSha256 = Hmac<Sha256>;

const JWT_HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

/// Access token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id, as a string per JWT convention.
    pub sub: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    #[must_use]
    pub fn new(user_id: UserId, email: &Email, issued_at: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            sub: user_id.to_string(),
            email: email.as_str().to_string(),
            iat: issued_at.timestamp(),
            exp: (issued_at + ttl).timestamp(),
        }
    }

    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if `sub` isn't a user id.
    pub fn user_id(&self) -> Result<UserId, AuthError> {
        self.sub
            .parse::<i32>()
            .map(UserId::new)
            .map_err(|_| AuthError::InvalidToken)
    }
}

#[derive(Deserialize)]
struct Header {
    alg: String,
}

fn mac(secret: &[u8]) -> Result<HmacSha256, AuthError> {
    HmacSha256::new_from_slice(secret).map_err(|_| AuthError::InvalidToken)
}

/// Sign `claims` into a compact JWT.
///
/// # Errors
///
/// Returns `AuthError::Encoding` if the claims can't be serialized.
pub fn encode_access_token(secret: &[u8], claims: &Claims) -> Result<String, AuthError> {
    let header = URL_SAFE_NO_PAD.encode(JWT_HEADER);
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?);
    let signing_input = format!("{header}.{payload}");

    let mut mac = mac(secret)?;
    mac.update(signing_input.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{signing_input}.{signature}"))
}

/// Verify a compact JWT and return its claims.
///
/// # Errors
///
/// Returns `AuthError::InvalidToken` if the token is malformed, uses another
/// algorithm, or the signature doesn't match. Returns
/// `AuthError::TokenExpired` if `exp` is not after `now`.
pub fn decode_access_token(
    secret: &[u8],
    token: &str,
    now: DateTime<Utc>,
) -> Result<Claims, AuthError> {
    let mut parts = token.split('.');
    let (Some(header), Some(payload), Some(signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(AuthError::InvalidToken);
    };

    let header_bytes = URL_SAFE_NO_PAD
        .decode(header)
        .map_err(|_| AuthError::InvalidToken)?;
    let header: Header =
        serde_json::from_slice(&header_bytes).map_err(|_| AuthError::InvalidToken)?;
    if header.alg != "HS256" {
        return Err(AuthError::InvalidToken);
    }

    let signature = URL_SAFE_NO_PAD
        .decode(signature)
        .map_err(|_| AuthError::InvalidToken)?;
    let mut mac = mac(secret)?;
    mac.update(signing_input(token).as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| AuthError::InvalidToken)?;

    let payload = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| AuthError::InvalidToken)?;
    let claims: Claims = serde_json::from_slice(&payload).map_err(|_| AuthError::InvalidToken)?;

    if claims.exp <= now.timestamp() {
        return Err(AuthError::TokenExpired);
    }
    Ok(claims)
}

/// Everything before the last `.`.
fn signing_input(token: &str) -> &str {
    token.rsplit_once('.').map_or(token, |(input, _)| input)
}

/// A fresh opaque refresh token.
#[must_use]
pub fn new_refresh_token() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"kP9$mX2vL7nQ4wR8tY1zB5cF3hJ6dG0sA";

    fn claims(now: DateTime<Utc>) -> Claims {
        Claims::new(
            UserId::new(42),
            &Email::parse("ada@example.com").unwrap(),
            now,
            Duration::minutes(60),
        )
    }

    #[test]
    fn test_token_round_trip() {
        let now = Utc::now();
        let token = encode_access_token(SECRET, &claims(now)).unwrap();
        assert_eq!(token.split('.').count(), 3);

        let decoded = decode_access_token(SECRET, &token, now).unwrap();
        assert_eq!(decoded, claims(now));
        assert_eq!(decoded.user_id().unwrap(), UserId::new(42));
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let now = Utc::now();
        let token = encode_access_token(SECRET, &claims(now)).unwrap();
        assert!(matches!(
            decode_access_token(b"another-secret-entirely", &token, now),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let issued = Utc::now() - Duration::hours(2);
        let token = encode_access_token(SECRET, &claims(issued)).unwrap();
        assert!(matches!(
            decode_access_token(SECRET, &token, Utc::now()),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn test_tampered_payload_is_rejected() {
        let now = Utc::now();
        let token = encode_access_token(SECRET, &claims(now)).unwrap();
        let (header, rest) = token.split_once('.').unwrap();
        let (_, signature) = rest.split_once('.').unwrap();

        let mut forged = claims(now);
        forged.sub = "1".to_string();
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged).unwrap());
        let tampered = format!("{header}.{payload}.{signature}");

        assert!(matches!(
            decode_access_token(SECRET, &tampered, now),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_malformed_tokens() {
        let now = Utc::now();
        for token in ["", "abc", "a.b", "a.b.c.d", "!!.??.**"] {
            assert!(matches!(
                decode_access_token(SECRET, token, now),
                Err(AuthError::InvalidToken)
            ));
        }
    }

    #[test]
    fn test_refresh_tokens_are_unique() {
        assert_ne!(new_refresh_token(), new_refresh_token());
        assert!(Uuid::parse_str(&new_refresh_token()).is_ok());
    }
}
