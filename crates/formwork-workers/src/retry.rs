//! # Retry With Backoff
//!
//! JSON fetch with exponential backoff and jitter.
//!
//! ## Schedule (defaults)
//! ```text
//! attempt 1 ──fail──► sleep 1000ms ±10% ──► attempt 2 ──fail──► sleep 2000ms ±10%
//!     ──► attempt 3 ──fail──► NetworkError "Max retries reached" (503)
//!                             or JSONError "Failed to parse JSON response: ..."
//! ```
//!
//! `retries` is the total number of attempts. Attempts never overlap, and an
//! abort ends a pending request or sleep immediately.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use formwork_core::{success_json, AppError, AppResult, ErrorKind};

use crate::abort::AbortSignal;

// =============================================================================
// Request / Response
// =============================================================================

/// Method, headers and body of an outgoing request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestInit {
    pub method: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
}

impl Default for RequestInit {
    fn default() -> Self {
        RequestInit {
            method: "GET".to_string(),
            headers: BTreeMap::new(),
            body: None,
        }
    }
}

impl RequestInit {
    /// A POST with `body` serialized as JSON.
    pub fn post_json<T: Serialize>(body: &T) -> Result<Self, AppError> {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());

        Ok(RequestInit {
            method: "POST".to_string(),
            headers,
            body: Some(serde_json::to_string(body)?),
        })
    }
}

/// Status and raw body of a completed request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Sends one request. Transport failures are `NetworkError`s.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, url: &str, init: &RequestInit) -> Result<HttpResponse, AppError>;
}

/// [`HttpClient`] over reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    pub fn new() -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| AppError::network("Failed to build HTTP client").with_source(&e))?;
        Ok(ReqwestClient { client })
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        ReqwestClient { client }
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn execute(&self, url: &str, init: &RequestInit) -> Result<HttpResponse, AppError> {
        let method = reqwest::Method::from_bytes(init.method.as_bytes()).map_err(|e| {
            AppError::http(format!("Invalid HTTP method '{}'", init.method)).with_source(&e)
        })?;

        let mut request = self.client.request(method, url);
        for (name, value) in &init.headers {
            request = request.header(name, value);
        }
        if let Some(body) = &init.body {
            request = request.body(body.clone());
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::network(format!("Request to {} failed", url)).with_source(&e))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::network("Failed to read response body").with_source(&e))?;

        Ok(HttpResponse { status, body })
    }
}

// =============================================================================
// Options
// =============================================================================

/// Backoff parameters. `retries` counts total attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryOptions {
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

fn default_backoff_factor() -> f64 {
    2.0
}

fn default_retries() -> u32 {
    3
}

fn default_delay_ms() -> u64 {
    1000
}

impl Default for RetryOptions {
    fn default() -> Self {
        RetryOptions {
            backoff_factor: default_backoff_factor(),
            retries: default_retries(),
            delay_ms: default_delay_ms(),
        }
    }
}

impl RetryOptions {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Rejects options that would never attempt or never grow.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.retries == 0 {
            return Err(AppError::invariant("retries must be at least 1"));
        }
        if !self.backoff_factor.is_finite() || self.backoff_factor < 1.0 {
            return Err(AppError::invariant("backoff_factor must be a finite number >= 1"));
        }
        Ok(())
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.delay())
            .with_multiplier(self.backoff_factor)
            .with_randomization_factor(0.1)
            .with_max_interval(Duration::from_secs(3600))
            .with_max_elapsed_time(None)
            .build()
    }
}

// =============================================================================
// Retry Loop
// =============================================================================

/// Fetches `url` and parses the body as JSON, retrying on failure.
///
/// A network failure, an empty or unparseable body, or a literal `null`
/// counts as a failed attempt.
///
/// ## Errors
/// * `AbortError` - `signal` fired before or during an attempt or sleep
/// * `NetworkError` (503) - the last attempt failed in transport
/// * `JSONError` - the last attempt returned an unusable body
pub async fn retry_fetch(
    client: &dyn HttpClient,
    url: &str,
    init: &RequestInit,
    options: &RetryOptions,
    signal: &AbortSignal,
) -> AppResult<Value> {
    let attempts = options.retries.max(1);
    let mut backoff = options.backoff();
    let mut last_failure = AppError::network("No attempt was made");

    for attempt in 1..=attempts {
        if let Some(reason) = signal.reason() {
            return Err(aborted(url, &reason));
        }

        debug!(url, attempt, attempts, "Fetch attempt");

        let outcome = tokio::select! {
            biased;
            reason = signal.aborted() => return Err(aborted(url, &reason)),
            response = client.execute(url, init) => response,
        };

        let failure = match outcome.and_then(|response| parse_body(&response)) {
            Ok(body) => {
                info!(url, attempt, "Fetch succeeded");
                return success_json(body);
            }
            Err(err) => err,
        };

        warn!(url, attempt, attempts, error = %failure, "Fetch attempt failed");
        last_failure = failure;

        if attempt == attempts {
            break;
        }

        let delay = backoff.next_backoff().unwrap_or_else(|| options.delay());
        debug!(url, delay_ms = delay.as_millis() as u64, "Backing off");

        tokio::select! {
            biased;
            reason = signal.aborted() => return Err(aborted(url, &reason)),
            _ = tokio::time::sleep(delay) => {}
        }
    }

    Err(exhausted(last_failure))
}

fn parse_body(response: &HttpResponse) -> Result<Value, AppError> {
    if response.body.trim().is_empty() {
        return Err(AppError::json("Response body was empty"));
    }

    let body: Value = serde_json::from_str(&response.body)?;
    if body.is_null() {
        return Err(AppError::json("Response body was null"));
    }
    Ok(body)
}

fn exhausted(last: AppError) -> AppError {
    match last.kind {
        ErrorKind::Json => {
            AppError::json("Failed to parse JSON response: max retries reached").caused_by(&last)
        }
        _ => AppError::network("Max retries reached").caused_by(&last),
    }
}

fn aborted(url: &str, reason: &str) -> AppError {
    AppError::abort(format!("Request to {} aborted: {}", url, reason))
}

// =============================================================================
// Unit Tests
// =============================================================================
