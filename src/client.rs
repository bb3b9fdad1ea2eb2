//! HTTP client for the Hatchling backend.
//!
//! Only the read side the dashboards poll is covered: routines, caregiver
//! updates (served under `/sms`) and the health check. Day fetches go
//! through [`RetryingFetcher`] and fall back to the last good snapshot, or
//! to sample data in offline demo mode.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::config::HatchlingConfig;
use crate::fetch::{FetchError, FetchPolicy, Fetched, Retryable, RetryingFetcher};
use crate::models::*;

/// HTTP client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: API key required or invalid")]
    Unauthorized,

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Server error: {0}")]
    Server(String),
}

impl Retryable for ClientError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => !e.is_decode() && !e.is_builder(),
            Self::Server(_) => true,
            Self::NotFound(_) | Self::BadRequest(_) | Self::Unauthorized | Self::Rejected(_) => {
                false
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
}

type CacheKey = (String, Option<NaiveDate>);

/// HTTP client for the Hatchling API.
#[derive(Debug, Clone)]
pub struct HatchlingClient {
    base_url: String,
    api_key: Option<String>,
    client: Client,
    fetcher: RetryingFetcher,
    offline_demo: bool,
    /// Last good snapshot per user and day.
    cache: Arc<Mutex<HashMap<CacheKey, DaySnapshot>>>,
}

impl HatchlingClient {
    /// Create with explicit configuration and the default fetch policy.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            client: Client::new(),
            fetcher: RetryingFetcher::new(FetchPolicy::default()),
            offline_demo: false,
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn from_config(config: &HatchlingConfig) -> Self {
        Self::new(config.base_url.clone(), config.api_key.clone())
            .with_policy(config.fetch_policy())
            .with_offline_demo(config.offline_demo)
    }

    pub fn with_policy(mut self, policy: FetchPolicy) -> Self {
        self.fetcher = RetryingFetcher::new(policy);
        self
    }

    /// Tie in-flight fetches to `parent`; cancelling it aborts them.
    pub fn with_cancel(mut self, parent: &CancellationToken) -> Self {
        self.fetcher = RetryingFetcher::with_parent(*self.fetcher.policy(), parent);
        self
    }

    pub fn with_offline_demo(mut self, enabled: bool) -> Self {
        self.offline_demo = enabled;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a request with optional auth header.
    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.client.request(method, &url);
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }
        req
    }

    /// Handle response, converting HTTP errors to ClientError.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            Ok(response.json().await?)
        } else {
            let body = response.text().await.unwrap_or_default();
            match status {
                StatusCode::NOT_FOUND => Err(ClientError::NotFound(body)),
                StatusCode::BAD_REQUEST => Err(ClientError::BadRequest(body)),
                StatusCode::UNAUTHORIZED => Err(ClientError::Unauthorized),
                StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
                    Err(ClientError::Server(format!("{}: {}", status, body)))
                }
                s if s.is_client_error() => {
                    Err(ClientError::Rejected(format!("{}: {}", status, body)))
                }
                _ => Err(ClientError::Server(format!("{}: {}", status, body))),
            }
        }
    }

    async fn get_list<T: DeserializeOwned>(
        &self,
        path: &str,
        session: &Session,
        date: Option<NaiveDate>,
    ) -> Result<Vec<T>, ClientError> {
        let mut params = vec![("user_id", session.user_id.clone())];
        if let Some(date) = date {
            params.push(("date", date.format("%Y-%m-%d").to_string()));
        }
        let response = self
            .request(reqwest::Method::GET, path)
            .query(&params)
            .send()
            .await?;
        self.handle_response(response).await
    }

    // ============================================================
    // Single-attempt reads
    // ============================================================

    /// Routines for a user, optionally scoped to one day.
    pub async fn get_routines(
        &self,
        session: &Session,
        date: Option<NaiveDate>,
    ) -> Result<Vec<Routine>, ClientError> {
        self.get_list("/routines", session, date).await
    }

    /// Caregiver updates for a user, optionally scoped to one day.
    pub async fn get_caregiver_updates(
        &self,
        session: &Session,
        date: Option<NaiveDate>,
    ) -> Result<Vec<CaregiverUpdate>, ClientError> {
        self.get_list("/sms", session, date).await
    }

    /// Whether the backend reports itself healthy. Never errors.
    pub async fn check_health(&self) -> bool {
        let response = match self.request(reqwest::Method::GET, "/health").send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Health check failed: {}", e);
                return false;
            }
        };
        match self.handle_response::<HealthResponse>(response).await {
            Ok(health) => health.status == "healthy",
            Err(e) => {
                tracing::warn!("Health check failed: {}", e);
                false
            }
        }
    }

    async fn load_day(
        &self,
        session: &Session,
        date: Option<NaiveDate>,
    ) -> Result<DaySnapshot, ClientError> {
        let (routines, updates) = tokio::try_join!(
            self.get_routines(session, date),
            self.get_caregiver_updates(session, date)
        )?;
        Ok(DaySnapshot { routines, updates })
    }

    // ============================================================
    // Resilient reads
    // ============================================================

    /// Fetch routines and caregiver updates for one day with retries.
    ///
    /// Fallback order: last good snapshot for the same user and day, then
    /// sample data if offline demo mode is on.
    pub async fn fetch_day(
        &self,
        session: &Session,
        date: Option<NaiveDate>,
    ) -> Result<Fetched<DaySnapshot>, FetchError<ClientError>> {
        let key = (session.user_id.clone(), date);
        let fallback = self
            .cached(&key)
            .or_else(|| self.offline_demo.then(demo_snapshot));

        let fetched = self
            .fetcher
            .fetch("day", fallback, || self.load_day(session, date))
            .await?;

        if !fetched.is_fallback() {
            self.store(key, fetched.data.clone());
        }
        Ok(fetched)
    }

    /// Abort any fetch in flight on this client.
    pub fn cancel(&self) {
        self.fetcher.cancel();
    }

    fn cached(&self, key: &CacheKey) -> Option<DaySnapshot> {
        match self.cache.lock() {
            Ok(cache) => cache.get(key).cloned(),
            Err(poisoned) => poisoned.into_inner().get(key).cloned(),
        }
    }

    fn store(&self, key: CacheKey, snapshot: DaySnapshot) {
        let mut cache = match self.cache.lock() {
            Ok(cache) => cache,
            Err(poisoned) => poisoned.into_inner(),
        };
        cache.insert(key, snapshot);
    }
}
