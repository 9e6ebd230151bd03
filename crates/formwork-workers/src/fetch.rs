//! # Fetch Worker
//!
//! Runs [`retry_fetch`] under a timeout and decodes the body against the
//! schema registered for the URL.
//!
//! ## Decoding
//! ```text
//! body ─► SchemaTable[url] ─► object → decode as T
//!                           └► array  → decode every element as T
//! ```
//!
//! Decoding goes through the typed value and back, so fields the schema does
//! not know are dropped.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use formwork_core::{AppError, AppResult, AppResultExt};

use crate::abort::{AbortSignal, TimeoutGuard};
use crate::retry::{retry_fetch, HttpClient, RequestInit, RetryOptions};
use crate::runtime::{WorkerBehavior, WorkerKind};

/// Default timeout for a whole fetch, retries included.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Message accepted by the fetch worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchRequest {
    pub url: String,
    #[serde(default)]
    pub request_init: RequestInit,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>, request_init: RequestInit) -> Self {
        FetchRequest {
            url: url.into(),
            request_init,
        }
    }
}

// =============================================================================
// Schema Table
// =============================================================================

type Decoder = Arc<dyn Fn(&Value) -> Result<Value, AppError> + Send + Sync>;

/// URL → response decoder.
#[derive(Clone, Default)]
pub struct SchemaTable {
    decoders: HashMap<String, Decoder>,
}

impl SchemaTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T` as the response shape for `url`.
    pub fn register<T>(mut self, url: impl Into<String>) -> Self
    where
        T: DeserializeOwned + Serialize + 'static,
    {
        let decoder: Decoder = Arc::new(|body: &Value| decode_body::<T>(body));
        self.decoders.insert(url.into(), decoder);
        self
    }

    pub fn contains(&self, url: &str) -> bool {
        self.decoders.contains_key(url)
    }

    /// Decodes `body` with the decoder registered for `url`.
    ///
    /// ## Errors
    /// * `WorkerError` - no decoder for `url`
    /// * `ParseError` - `body` does not match the registered shape
    pub fn decode(&self, url: &str, body: &Value) -> Result<Value, AppError> {
        let decoder = self
            .decoders
            .get(url)
            .ok_or_else(|| missing_schema(url))?;
        decoder(body)
    }
}

impl fmt::Debug for SchemaTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut urls: Vec<&String> = self.decoders.keys().collect();
        urls.sort();
        f.debug_struct("SchemaTable").field("urls", &urls).finish()
    }
}

fn decode_body<T>(body: &Value) -> Result<Value, AppError>
where
    T: DeserializeOwned + Serialize,
{
    match body {
        Value::Array(items) => items
            .iter()
            .map(decode_one::<T>)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        other => decode_one::<T>(other),
    }
}

fn decode_one<T>(value: &Value) -> Result<Value, AppError>
where
    T: DeserializeOwned + Serialize,
{
    let typed = T::deserialize(value).map_err(|e| {
        AppError::parse("Response does not match the expected schema").with_source(&e)
    })?;
    Ok(serde_json::to_value(typed)?)
}

fn missing_schema(url: &str) -> AppError {
    AppError::worker(format!("No schema found for URL: {}", url))
}

// =============================================================================
// Worker
// =============================================================================

pub struct FetchWorker {
    client: Arc<dyn HttpClient>,
    schemas: SchemaTable,
    retry: RetryOptions,
    timeout: Duration,
}

impl FetchWorker {
    pub fn new(client: Arc<dyn HttpClient>, schemas: SchemaTable) -> Self {
        FetchWorker {
            client,
            schemas,
            retry: RetryOptions::default(),
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_retry(mut self, retry: RetryOptions) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn execute(&self, request: &FetchRequest, parent: &AbortSignal) -> AppResult<Value> {
        if !self.schemas.contains(&request.url) {
            return Err(missing_schema(&request.url));
        }

        let guard = TimeoutGuard::new(self.timeout, "fetch", parent);
        let body = retry_fetch(
            self.client.as_ref(),
            &request.url,
            &request.request_init,
            &self.retry,
            &guard.signal(),
        )
        .await
        .require_present("fetch response body")?;

        let decoded = self.schemas.decode(&request.url, &body)?;
        debug!(url = %request.url, "Decoded response");
        Ok(Some(decoded))
    }
}

#[async_trait]
impl WorkerBehavior for FetchWorker {
    type Message = FetchRequest;

    fn kind(&self) -> WorkerKind {
        WorkerKind::Fetch
    }

    async fn handle(&mut self, message: FetchRequest, signal: &AbortSignal) -> AppResult<Value> {
        self.execute(&message, signal).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::HttpResponse;
    use formwork_core::{ErrorKind, ResponseData};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const POSTS: &str = "https://api.example.test/posts";

    /// Answers every request with the same body.
    struct FixedClient {
        body: String,
        calls: AtomicUsize,
    }

    impl FixedClient {
        fn new(body: Value) -> Arc<Self> {
            Arc::new(FixedClient {
                body: body.to_string(),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl HttpClient for FixedClient {
        async fn execute(&self, _url: &str, _init: &RequestInit) -> Result<HttpResponse, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(HttpResponse {
                status: 200,
                body: self.body.clone(),
            })
        }
    }

    /// Never answers.
    struct HangingClient;

    #[async_trait]
    impl HttpClient for HangingClient {
        async fn execute(&self, _url: &str, _init: &RequestInit) -> Result<HttpResponse, AppError> {
            std::future::pending().await
        }
    }

    fn schemas() -> SchemaTable {
        SchemaTable::new().register::<ResponseData>(POSTS)
    }

    fn post(user_id: i64, id: i64) -> Value {
        json!({"userId": user_id, "id": id, "title": "t", "body": "b", "extra": true})
    }

    #[tokio::test]
    async fn test_object_body_is_decoded_and_stripped() {
        let worker = FetchWorker::new(FixedClient::new(post(1, 2)), schemas());

        let decoded = worker
            .execute(&FetchRequest::new(POSTS, RequestInit::default()), &AbortSignal::never())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(decoded, json!({"userId": 1, "id": 2, "title": "t", "body": "b"}));
    }

    #[tokio::test]
    async fn test_array_body_is_decoded_per_element() {
        let body = json!([post(1, 1), post(1, 2)]);
        let worker = FetchWorker::new(FixedClient::new(body), schemas());

        let decoded = worker
            .execute(&FetchRequest::new(POSTS, RequestInit::default()), &AbortSignal::never())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(decoded.as_array().map(Vec::len), Some(2));
        assert_eq!(decoded[1]["id"], json!(2));
    }

    #[tokio::test]
    async fn test_schema_mismatch_is_parse_error() {
        let worker = FetchWorker::new(FixedClient::new(json!({"id": "nope"})), schemas());

        let err = worker
            .execute(&FetchRequest::new(POSTS, RequestInit::default()), &AbortSignal::never())
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::Parse);
    }

    #[tokio::test]
    async fn test_unregistered_url_fails_without_fetching() {
        let client = FixedClient::new(post(1, 1));
        let worker = FetchWorker::new(client.clone(), schemas());

        let err = worker
            .execute(
                &FetchRequest::new("https://api.example.test/other", RequestInit::default()),
                &AbortSignal::never(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::Worker);
        assert_eq!(err.message, "No schema found for URL: https://api.example.test/other");
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_body_is_never_absent() {
        let client = Arc::new(FixedClient {
            body: String::new(),
            calls: AtomicUsize::new(0),
        });
        let worker = FetchWorker::new(client.clone(), schemas());

        let err = worker
            .execute(&FetchRequest::new(POSTS, RequestInit::default()), &AbortSignal::never())
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::Json);
        assert_eq!(client.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_request_times_out() {
        let worker = FetchWorker::new(Arc::new(HangingClient), schemas());

        let err = worker
            .execute(&FetchRequest::new(POSTS, RequestInit::default()), &AbortSignal::never())
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::Abort);
        assert!(err.message.contains("fetch timed out after 15000ms"));
    }

    #[test]
    fn test_fetch_request_wire_shape() {
        let parsed: FetchRequest = serde_json::from_value(json!({
            "url": POSTS,
            "requestInit": {"method": "POST", "body": "{}"}
        }))
        .unwrap();

        assert_eq!(parsed.url, POSTS);
        assert_eq!(parsed.request_init.method, "POST");
        assert!(parsed.request_init.headers.is_empty());
    }
}
