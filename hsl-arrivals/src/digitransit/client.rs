//! Digitransit GraphQL HTTP client.
//!
//! Provides the `GraphqlTransport` seam the lookup layer talks to, and the
//! reqwest-backed implementation used in production. Credentials are never
//! stored on the client: each call carries its own header map.

use std::future::Future;
use std::sync::Arc;

use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue};
use serde_json::{Value, json};
use tokio::sync::Semaphore;

use crate::domain::ApiKey;

use super::error::DigitransitError;

/// Default endpoint of the HSL routing API (v2).
pub const DEFAULT_BASE_URL: &str = "https://api.digitransit.fi/routing/v2/hsl/gtfs/v1";

/// Default maximum concurrent requests.
const DEFAULT_MAX_CONCURRENT: usize = 5;

/// Executes GraphQL documents.
///
/// Implementations return the full response body (`{"data": ..., "errors":
/// ...}`) and fail only on transport-level problems.
pub trait GraphqlTransport: Send + Sync {
    fn execute(
        &self,
        query: &str,
        variables: Value,
        headers: HeaderMap,
    ) -> impl Future<Output = Result<Value, DigitransitError>> + Send;
}

/// Build the request headers for one call.
///
/// Digitransit has accepted the key under both header names over time, so
/// both are sent.
pub fn request_headers(api_key: &ApiKey) -> Result<HeaderMap, DigitransitError> {
    let key =
        HeaderValue::from_str(api_key.expose()).map_err(|_| DigitransitError::InvalidHeader)?;

    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static("digitransit-subscription-key"),
        key.clone(),
    );
    headers.insert(HeaderName::from_static("ocp-apim-subscription-key"), key);
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    Ok(headers)
}

/// Configuration for the Digitransit client.
#[derive(Debug, Clone)]
pub struct DigitransitConfig {
    /// GraphQL endpoint (defaults to the HSL routing API)
    pub base_url: String,
    /// Maximum concurrent requests
    pub max_concurrent: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl DigitransitConfig {
    /// Create a config pointing at the given endpoint.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set maximum concurrent requests.
    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n;
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl Default for DigitransitConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            timeout_secs: 30,
        }
    }
}

/// Digitransit GraphQL client.
///
/// Uses a semaphore to limit concurrent requests and avoid rate limiting.
#[derive(Debug, Clone)]
pub struct DigitransitClient {
    http: reqwest::Client,
    base_url: String,
    semaphore: Arc<Semaphore>,
}

impl DigitransitClient {
    /// Create a new client with the given configuration.
    pub fn new(config: DigitransitConfig) -> Result<Self, DigitransitError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
        })
    }
}

impl GraphqlTransport for DigitransitClient {
    async fn execute(
        &self,
        query: &str,
        variables: Value,
        headers: HeaderMap,
    ) -> Result<Value, DigitransitError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| DigitransitError::ApiError {
                status: 0,
                message: "Semaphore closed".to_string(),
            })?;

        let response = self
            .http
            .post(&self.base_url)
            .headers(headers)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(DigitransitError::Unauthorized);
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(DigitransitError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DigitransitError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;

        serde_json::from_str(&body).map_err(|e| DigitransitError::Json {
            message: e.to_string(),
        })
    }
}
