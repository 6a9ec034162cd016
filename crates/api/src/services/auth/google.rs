//! Google ID token verification via the `tokeninfo` endpoint.

use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;
use url::Url;

use looks_lab_core::{AuthProvider, Email};

use super::AuthError;
use crate::db::users::ProviderIdentity;

const TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";
const GOOGLE_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

/// Claims returned by `tokeninfo`. Google encodes booleans as strings here.
#[derive(Debug, Deserialize)]
pub struct TokenInfo {
    pub aud: String,
    pub iss: String,
    pub sub: String,
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: Option<Value>,
    pub name: Option<String>,
    pub picture: Option<String>,
}

impl TokenInfo {
    fn email_verified(&self) -> bool {
        match &self.email_verified {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }

    /// Check audience and issuer, then extract the identity.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidGoogleToken` if the token was issued for
    /// another client, by another issuer, or carries no email.
    pub fn into_identity(self, client_id: &str) -> Result<ProviderIdentity, AuthError> {
        if self.aud != client_id {
            return Err(AuthError::InvalidGoogleToken("audience mismatch".to_string()));
        }
        if !GOOGLE_ISSUERS.contains(&self.iss.as_str()) {
            return Err(AuthError::InvalidGoogleToken(format!(
                "unexpected issuer {}",
                self.iss
            )));
        }

        let email_verified = self.email_verified();
        let email = self
            .email
            .as_deref()
            .ok_or_else(|| AuthError::InvalidGoogleToken("no email claim".to_string()))?;

        Ok(ProviderIdentity {
            provider: AuthProvider::Google,
            subject: self.sub,
            email: Email::parse(email)?,
            name: self.name,
            picture: self.picture,
            email_verified,
        })
    }
}

/// Ask Google to validate `id_token` and return the signed-in identity.
///
/// # Errors
///
/// Returns `AuthError::InvalidGoogleToken` if Google rejects the token or
/// its claims don't match `client_id`, and `AuthError::Http` if Google
/// can't be reached.
#[instrument(skip(http, id_token))]
pub async fn verify_id_token(
    http: &reqwest::Client,
    client_id: &str,
    id_token: &str,
) -> Result<ProviderIdentity, AuthError> {
    let url = Url::parse_with_params(TOKENINFO_URL, &[("id_token", id_token)])
        .map_err(|e| AuthError::InvalidGoogleToken(e.to_string()))?;

    let response = http.get(url).send().await?;
    if !response.status().is_success() {
        tracing::info!(status = %response.status(), "Google rejected ID token");
        return Err(AuthError::InvalidGoogleToken(format!(
            "tokeninfo returned {}",
            response.status()
        )));
    }

    let info: TokenInfo = response.json().await?;
    info.into_identity(client_id)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const CLIENT_ID: &str = "1234.apps.googleusercontent.com";

    fn token_info(aud: &str, iss: &str) -> TokenInfo {
        serde_json::from_value(serde_json::json!({
            "aud": aud,
            "iss": iss,
            "sub": "1100220033",
            "email": "Ada@Example.com",
            "email_verified": "true",
            "name": "Ada",
            "picture": "https://lh3.googleusercontent.com/a/x"
        }))
        .unwrap()
    }

    #[test]
    fn test_valid_token_info() {
        let identity = token_info(CLIENT_ID, "https://accounts.google.com")
            .into_identity(CLIENT_ID)
            .unwrap();
        assert_eq!(identity.provider, AuthProvider::Google);
        assert_eq!(identity.subject, "1100220033");
        assert_eq!(identity.email.as_str(), "ada@example.com");
        assert!(identity.email_verified);
    }

    #[test]
    fn test_audience_mismatch() {
        let err = token_info("someone-else", "accounts.google.com")
            .into_identity(CLIENT_ID)
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidGoogleToken(_)));
    }

    #[test]
    fn test_issuer_mismatch() {
        let err = token_info(CLIENT_ID, "https://evil.example.com")
            .into_identity(CLIENT_ID)
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidGoogleToken(_)));
    }
}
