//! # Form Workers
//!
//! The resources a form is given at mount time ([`FormServices`]) and the
//! three workers it spawns from them ([`FormWorkers`]).
//!
//! ## Ownership
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Arc<FormServices>   shared, read-only                                 │
//! │    • WorkerSettings (timeouts, retry)                                  │
//! │    • Arc<dyn KeyValueStore>                                            │
//! │    • Arc<dyn HttpClient>                                               │
//! │    • SchemaTable, EndpointSettings                                     │
//! │            │                                                            │
//! │            ▼ FormWorkers::spawn                                        │
//! │  FormWorkers         owned by exactly one mounted form                 │
//! │    • cache   WorkerHandle<Envelope>                                    │
//! │    • storage WorkerHandle<Envelope>                                    │
//! │    • fetch   WorkerHandle<FetchRequest>                                │
//! │    • replies UnboundedReceiver<WorkerReply>                            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

use formwork_core::{AppError, ResponseData};
use formwork_store::KeyValueStore;
use formwork_workers::{
    spawn_worker, CacheWorker, Envelope, FetchRequest, FetchWorker, HttpClient, SchemaTable,
    StorageWorker, WorkerHandle, WorkerReply, WorkerSettings,
};

use crate::config::EndpointSettings;

// =============================================================================
// Services
// =============================================================================

/// Resources a form needs to spawn its workers.
#[derive(Clone)]
pub struct FormServices {
    pub settings: WorkerSettings,
    pub store: Arc<dyn KeyValueStore>,
    pub http: Arc<dyn HttpClient>,
    pub schemas: SchemaTable,
    pub endpoints: EndpointSettings,
}

impl FormServices {
    /// Builds services whose schema table covers both form endpoints.
    pub fn new(
        settings: WorkerSettings,
        store: Arc<dyn KeyValueStore>,
        http: Arc<dyn HttpClient>,
        endpoints: EndpointSettings,
    ) -> Self {
        let schemas = Self::schemas_for(&endpoints);
        FormServices {
            settings,
            store,
            http,
            schemas,
            endpoints,
        }
    }

    /// Every form endpoint answers with [`ResponseData`] records.
    pub fn schemas_for(endpoints: &EndpointSettings) -> SchemaTable {
        SchemaTable::new()
            .register::<ResponseData>(endpoints.login_url.clone())
            .register::<ResponseData>(endpoints.register_url.clone())
    }
}

impl std::fmt::Debug for FormServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormServices")
            .field("settings", &self.settings)
            .field("schemas", &self.schemas)
            .field("endpoints", &self.endpoints)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Workers
// =============================================================================

/// The three worker handles of one mounted form, plus its reply channel.
#[derive(Debug)]
pub struct FormWorkers {
    pub cache: Option<WorkerHandle<Envelope>>,
    pub storage: Option<WorkerHandle<Envelope>>,
    pub fetch: Option<WorkerHandle<FetchRequest>>,
    replies: mpsc::UnboundedReceiver<WorkerReply>,
}

impl FormWorkers {
    /// Spawns cache, storage and fetch workers. Requires a tokio runtime.
    pub fn spawn(services: &FormServices) -> Self {
        let (tx, replies) = mpsc::unbounded_channel();
        let settings = &services.settings;

        let cache = spawn_worker(CacheWorker::new(), tx.clone());

        let storage = spawn_worker(
            StorageWorker::new(services.store.clone()).with_timeout(settings.storage_timeout()),
            tx.clone(),
        );

        let fetch = spawn_worker(
            FetchWorker::new(services.http.clone(), services.schemas.clone())
                .with_retry(settings.retry.clone())
                .with_timeout(settings.fetch_timeout()),
            tx,
        );

        FormWorkers {
            cache: Some(cache),
            storage: Some(storage),
            fetch: Some(fetch),
            replies,
        }
    }

    /// No workers at all; every message fails with `NotFoundError`.
    pub fn empty() -> Self {
        let (_tx, replies) = mpsc::unbounded_channel();
        FormWorkers {
            cache: None,
            storage: None,
            fetch: None,
            replies,
        }
    }

    /// Returns a reply if one is already waiting.
    pub fn try_next_reply(&mut self) -> Option<WorkerReply> {
        self.replies.try_recv().ok()
    }

    /// Waits for the next reply. `None` once every worker has stopped.
    pub async fn next_reply(&mut self) -> Option<WorkerReply> {
        self.replies.recv().await
    }

    /// Terminates and releases all three workers.
    pub fn terminate_all(&mut self) {
        if let Some(cache) = self.cache.take() {
            cache.terminate();
        }
        if let Some(storage) = self.storage.take() {
            storage.terminate();
        }
        if let Some(fetch) = self.fetch.take() {
            fetch.terminate();
        }
        debug!("All form workers terminated");
    }
}

/// Posts `message` to `worker`.
///
/// ## Errors
/// * `NotFoundError` - the worker handle is missing
/// * `WorkerMessageError` - the worker has stopped
pub fn send_message_to_worker<M>(
    worker: Option<&WorkerHandle<M>>,
    message: M,
) -> Result<(), AppError>
where
    M: Serialize,
{
    match worker {
        Some(handle) => handle.send(message),
        None => {
            let rendered = serde_json::to_string(&message)
                .unwrap_or_else(|_| "<unserializable>".to_string());
            Err(AppError::not_found(format!(
                "Worker is not initialized for message: {}",
                rendered
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::testing::test_services;
    use formwork_core::ErrorKind;
    use formwork_workers::WorkerKind;
    use serde_json::json;

    #[test]
    fn test_missing_worker_is_not_found() {
        let workers = FormWorkers::empty();

        let err =
            send_message_to_worker(workers.cache.as_ref(), Envelope::get("username")).unwrap_err();

        assert_eq!(err.kind, ErrorKind::NotFound);
        assert_eq!(
            err.message,
            r#"Worker is not initialized for message: {"kind":"get","payload":["username"]}"#
        );
    }

    #[tokio::test]
    async fn test_spawned_workers_reply_on_shared_channel() {
        let services = test_services(vec![]);
        let mut workers = FormWorkers::spawn(&services);

        send_message_to_worker(workers.cache.as_ref(), Envelope::set("k", "v")).unwrap();
        send_message_to_worker(workers.storage.as_ref(), Envelope::set("k", "v")).unwrap();

        let mut seen = Vec::new();
        for _ in 0..2 {
            let reply = workers.next_reply().await.unwrap();
            assert_eq!(reply.result, Ok(None));
            seen.push(reply.worker);
        }
        seen.sort_by_key(|kind| kind.as_str());
        assert_eq!(seen, vec![WorkerKind::Cache, WorkerKind::Storage]);

        assert_eq!(services.store.get("k").await.unwrap(), Some(json!("v")));
    }

    #[tokio::test]
    async fn test_terminated_workers_reject_messages() {
        let services = test_services(vec![]);
        let mut workers = FormWorkers::spawn(&services);
        let cache = workers.cache.take().unwrap();

        workers.terminate_all();
        cache.terminate();

        let err = send_message_to_worker(Some(&cache), Envelope::get("k")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::WorkerMessage);
        assert!(workers.cache.is_none() && workers.storage.is_none() && workers.fetch.is_none());
    }

    #[test]
    fn test_schema_table_covers_endpoints() {
        let endpoints = EndpointSettings {
            login_url: "https://a.test/login".into(),
            register_url: "https://a.test/register".into(),
        };
        let schemas = FormServices::schemas_for(&endpoints);
        assert!(schemas.contains("https://a.test/login"));
        assert!(schemas.contains("https://a.test/register"));
    }
}
