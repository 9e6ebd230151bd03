//! # Storage Worker
//!
//! Persists values through a [`KeyValueStore`]. Every operation runs under a
//! timeout linked to the worker's shutdown signal.
//!
//! ## Failure Mapping
//! ```text
//! ┌───────────────────────────────┬──────────────────────────────────────┐
//! │ Condition                     │ Reply                                │
//! ├───────────────────────────────┼──────────────────────────────────────┤
//! │ unknown kind / bad arity      │ WorkerMessageError                   │
//! │ sendAll                       │ WorkerMessageError (unsupported)     │
//! │ signal aborted before start   │ PromiseAbortedError "...before start"│
//! │ timeout or terminate midway   │ PromiseAbortedError                  │
//! │ store error                   │ CacheError naming the key            │
//! └───────────────────────────────┴──────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use formwork_core::{absent, success_json, AppError, AppResult};
use formwork_store::{KeyValueStore, StoreError};

use crate::abort::{make_abortable, AbortSignal, TimeoutGuard};
use crate::envelope::{Envelope, Request};
use crate::runtime::{WorkerBehavior, WorkerKind};

/// Default per-operation timeout.
pub const DEFAULT_STORAGE_TIMEOUT: Duration = Duration::from_secs(10);

pub struct StorageWorker {
    store: Arc<dyn KeyValueStore>,
    timeout: Duration,
}

impl StorageWorker {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        StorageWorker {
            store,
            timeout: DEFAULT_STORAGE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Runs one request against the store under `parent`.
    pub async fn execute(&self, request: Request, parent: &AbortSignal) -> AppResult<Value> {
        let context = format!("storage {}", request.kind());
        let guard = TimeoutGuard::new(self.timeout, &context, parent);
        let signal = guard.signal();

        match request {
            Request::Get(key) => {
                let value = make_abortable(self.store.get(&key), &signal, &context)
                    .await?
                    .map_err(|e| store_failure("get", &key, e))?;
                match value {
                    Some(value) => success_json(value),
                    None => absent(),
                }
            }
            Request::Set(key, value) => {
                make_abortable(self.store.set(&key, &value), &signal, &context)
                    .await?
                    .map_err(|e| store_failure("set", &key, e))?;
                debug!(key = %key, "Stored value");
                absent()
            }
            Request::Remove(key) => {
                make_abortable(self.store.remove(&key), &signal, &context)
                    .await?
                    .map_err(|e| store_failure("remove", &key, e))?;
                absent()
            }
            Request::SendAll => Err(AppError::worker_message(
                "Unsupported message kind in storage worker: 'sendAll'",
            )),
        }
    }
}

#[async_trait]
impl WorkerBehavior for StorageWorker {
    type Message = Envelope;

    fn kind(&self) -> WorkerKind {
        WorkerKind::Storage
    }

    async fn handle(&mut self, message: Envelope, signal: &AbortSignal) -> AppResult<Value> {
        let request = message.decode(WorkerKind::Storage)?;
        self.execute(request, signal).await
    }
}

fn store_failure(operation: &str, key: &str, err: StoreError) -> AppError {
    warn!(operation, key, error = %err, "Storage operation failed");
    AppError::cache(format!("Failed to {} key '{}'", operation, key)).with_source(&err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abort::AbortController;
    use crate::runtime::spawn_worker;
    use formwork_core::ErrorKind;
    use formwork_store::{Database, DbConfig, StoreResult};
    use serde_json::json;
    use tokio::sync::mpsc;

    /// Never completes.
    struct StalledStore;

    #[async_trait]
    impl KeyValueStore for StalledStore {
        async fn get(&self, _key: &str) -> StoreResult<Option<Value>> {
            std::future::pending().await
        }

        async fn set(&self, _key: &str, _value: &Value) -> StoreResult<()> {
            std::future::pending().await
        }

        async fn remove(&self, _key: &str) -> StoreResult<()> {
            std::future::pending().await
        }
    }

    /// Always fails.
    struct BrokenStore;

    #[async_trait]
    impl KeyValueStore for BrokenStore {
        async fn get(&self, _key: &str) -> StoreResult<Option<Value>> {
            Err(StoreError::QueryFailed("disk I/O error".into()))
        }

        async fn set(&self, _key: &str, _value: &Value) -> StoreResult<()> {
            Err(StoreError::QueryFailed("disk I/O error".into()))
        }

        async fn remove(&self, _key: &str) -> StoreResult<()> {
            Err(StoreError::QueryFailed("disk I/O error".into()))
        }
    }

    async fn sqlite_store() -> Arc<dyn KeyValueStore> {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.run_migrations().await.unwrap();
        Arc::new(db.kv())
    }

    #[tokio::test]
    async fn test_round_trip_through_sqlite() {
        let worker = StorageWorker::new(sqlite_store().await);
        let never = AbortSignal::never();

        let set = worker
            .execute(Request::Set("username".into(), json!("alice")), &never)
            .await;
        assert_eq!(set, Ok(None));

        let get = worker.execute(Request::Get("username".into()), &never).await;
        assert_eq!(get, Ok(Some(json!("alice"))));

        worker
            .execute(Request::Remove("username".into()), &never)
            .await
            .unwrap();
        let get = worker.execute(Request::Get("username".into()), &never).await;
        assert_eq!(get, Ok(None));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_store_times_out() {
        let worker =
            StorageWorker::new(Arc::new(StalledStore)).with_timeout(Duration::from_secs(10));

        let err = worker
            .execute(Request::Get("k".into()), &AbortSignal::never())
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::PromiseAborted);
        assert!(err.message.contains("timed out after 10000ms"));
    }

    #[tokio::test]
    async fn test_aborted_parent_fails_before_start() {
        let worker = StorageWorker::new(Arc::new(StalledStore));
        let parent = AbortController::new();
        parent.abort("storage worker terminated");

        let err = worker
            .execute(Request::Set("k".into(), json!(1)), &parent.signal())
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::PromiseAborted);
        assert_eq!(err.message, "storage set aborted before start");
    }

    #[tokio::test]
    async fn test_store_failure_names_the_key() {
        let worker = StorageWorker::new(Arc::new(BrokenStore));

        let err = worker
            .execute(Request::Remove("username".into()), &AbortSignal::never())
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::Cache);
        assert!(err.message.starts_with("Failed to remove key 'username'"));
        assert_eq!(err.original, "StoreError");
    }

    #[tokio::test]
    async fn test_send_all_is_unsupported() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = spawn_worker(StorageWorker::new(Arc::new(BrokenStore)), tx);

        handle.send(Envelope::send_all()).unwrap();

        let reply = rx.recv().await.unwrap();
        assert_eq!(reply.worker, WorkerKind::Storage);
        assert_eq!(reply.result.unwrap_err().kind, ErrorKind::WorkerMessage);
    }
}
