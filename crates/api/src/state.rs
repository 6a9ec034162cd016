//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;

use crate::ai::{GeminiClient, GeminiError};
use crate::config::ApiConfig;
use crate::services::LocalStorage;

/// Timeout for outbound calls other than the AI client, which has its own.
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("AI client error: {0}")]
    Gemini(#[from] GeminiError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    pool: PgPool,
    gemini: GeminiClient,
    storage: LocalStorage,
    http: reqwest::Client,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client can't be built.
    pub fn new(config: ApiConfig, pool: PgPool) -> Result<Self, StateError> {
        let gemini = GeminiClient::new(&config.gemini)?;
        if !gemini.is_configured() {
            tracing::warn!("GEMINI_API_KEY not set, AI analysis is disabled");
        }
        let storage = LocalStorage::new(&config.storage, config.base_url.as_deref());
        let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                gemini,
                storage,
                http,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn gemini(&self) -> &GeminiClient {
        &self.inner.gemini
    }

    #[must_use]
    pub fn storage(&self) -> &LocalStorage {
        &self.inner.storage
    }

    /// Shared client for outbound calls such as Google token verification.
    #[must_use]
    pub fn http(&self) -> &reqwest::Client {
        &self.inner.http
    }
}
