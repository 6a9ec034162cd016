//! Gemini REST client.
//!
//! Sends a single-turn prompt to `generateContent` and returns the reply
//! parsed as a JSON object. Transient failures are retried with linear
//! backoff; rate limits and unparseable replies are returned immediately.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::instrument;

use looks_lab_core::Domain;

use super::error::{ApiErrorResponse, GeminiError};
use super::json::parse_object;
use crate::config::GeminiConfig;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Gemini API client.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct GeminiClient {
    inner: Arc<GeminiClientInner>,
}

struct GeminiClientInner {
    client: reqwest::Client,
    api_key: Option<SecretString>,
    model: String,
    max_retries: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [RequestPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate.
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

impl GeminiClient {
    /// Create a new Gemini client.
    ///
    /// A missing API key is allowed; every call then fails with
    /// `GeminiError::NotConfigured`.
    ///
    /// # Errors
    ///
    /// Returns `GeminiError::Http` if the HTTP client can't be built.
    pub fn new(config: &GeminiConfig) -> Result<Self, GeminiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            inner: Arc::new(GeminiClientInner {
                client,
                api_key: config.api_key.clone(),
                model: config.model.clone(),
                max_retries: config.max_retries,
            }),
        })
    }

    /// Whether an API key is configured.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.inner.api_key.is_some()
    }

    /// Send `prompt` and parse the reply as a JSON object.
    ///
    /// # Errors
    ///
    /// Returns the last error once retries are exhausted, or the first
    /// error that isn't worth retrying.
    #[instrument(skip(self, prompt), fields(model = %self.inner.model, domain = %domain))]
    pub async fn generate_json(
        &self,
        prompt: &str,
        domain: Domain,
    ) -> Result<Map<String, Value>, GeminiError> {
        let attempts = self.inner.max_retries + 1;
        let mut attempt = 1;

        loop {
            tracing::info!(attempt, attempts, "Calling Gemini");

            let result = async {
                let text = self.generate_text(prompt).await?;
                tracing::debug!(chars = text.len(), "Gemini reply received");
                parse_object(&text)
            }
            .await;

            match result {
                Ok(data) => return Ok(data),
                Err(err) if attempt >= attempts || !err.is_retryable() => {
                    tracing::error!(error = %err, attempt, "Gemini call failed");
                    return Err(err);
                }
                Err(err) => {
                    tracing::warn!(error = %err, attempt, "Gemini call failed, retrying");
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn generate_text(&self, prompt: &str) -> Result<String, GeminiError> {
        let api_key = self
            .inner
            .api_key
            .as_ref()
            .ok_or(GeminiError::NotConfigured)?;

        let request = GenerateRequest {
            contents: [Content {
                role: "user",
                parts: [RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
            },
        };

        let url = format!("{GEMINI_API_BASE}/{}:generateContent", self.inner.model);
        let response = self
            .inner
            .client
            .post(url)
            .header("x-goog-api-key", api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(GeminiError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::handle_error_status(status, response).await);
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GeminiError::Parse(format!("Failed to parse response: {e}")))?;

        body.text().ok_or(GeminiError::Empty)
    }

    async fn handle_error_status(
        status: reqwest::StatusCode,
        response: reqwest::Response,
    ) -> GeminiError {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok());

        match response.text().await {
            Ok(body) => {
                let message = serde_json::from_str::<ApiErrorResponse>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                GeminiError::from_status(status.as_u16(), message, retry_after)
            }
            Err(e) => GeminiError::from_transport(e),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config(api_key: Option<&str>) -> GeminiConfig {
        GeminiConfig {
            api_key: api_key.map(|k| SecretString::from(k.to_string())),
            model: "gemini-2.5-flash".to_string(),
            timeout_secs: 30,
            max_retries: 2,
        }
    }

    #[test]
    fn test_gemini_client_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<GeminiClient>();
    }

    #[test]
    fn test_gemini_client_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<GeminiClient>();
    }

    #[tokio::test]
    async fn test_unconfigured_client_fails_fast() {
        let client = GeminiClient::new(&config(None)).unwrap();
        assert!(!client.is_configured());

        let err = client
            .generate_json("hello", Domain::Skincare)
            .await
            .unwrap_err();
        assert!(matches!(err, GeminiError::NotConfigured));
    }

    #[test]
    fn test_request_serialization() {
        let request = GenerateRequest {
            contents: [Content {
                role: "user",
                parts: [RequestPart { text: "hi" }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
            },
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(
            value["generationConfig"]["responseMimeType"],
            "application/json"
        );
    }

    #[test]
    fn test_response_text_joins_parts() {
        let json = r#"{
            "candidates": [{
                "content": {"parts": [{"text": "{\"a\":"}, {"text": " 1}"}], "role": "model"},
                "finishReason": "STOP"
            }]
        }"#;
        let response: GenerateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.text().as_deref(), Some("{\"a\": 1}"));
    }

    #[test]
    fn test_response_without_candidates_is_empty() {
        let response: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert!(response.text().is_none());
    }
}
