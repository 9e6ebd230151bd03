//! # Cache Worker
//!
//! Volatile key-value map. Lost when the worker terminates.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::trace;

use formwork_core::{absent, success, success_json, AppResult};

use crate::abort::AbortSignal;
use crate::envelope::{Envelope, Request};
use crate::runtime::{WorkerBehavior, WorkerKind};

#[derive(Debug, Default)]
pub struct CacheWorker {
    entries: HashMap<String, Value>,
}

impl CacheWorker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one envelope. A rejected envelope leaves the map untouched.
    pub fn apply(&mut self, envelope: Envelope) -> AppResult<Value> {
        let request = envelope.decode(WorkerKind::Cache)?;
        trace!(kind = request.kind(), "Cache request");

        match request {
            Request::Get(key) => match self.entries.get(&key) {
                Some(value) => success_json(value.clone()),
                None => absent(),
            },
            Request::Set(key, value) => {
                self.entries.insert(key, value);
                absent()
            }
            Request::Remove(key) => {
                self.entries.remove(&key);
                absent()
            }
            Request::SendAll => {
                let all: Map<String, Value> = self
                    .entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                success(Value::Object(all))
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl WorkerBehavior for CacheWorker {
    type Message = Envelope;

    fn kind(&self) -> WorkerKind {
        WorkerKind::Cache
    }

    async fn handle(&mut self, message: Envelope, _signal: &AbortSignal) -> AppResult<Value> {
        self.apply(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::spawn_worker;
    use formwork_core::ErrorKind;
    use serde_json::json;
    use tokio::sync::mpsc;

    #[test]
    fn test_set_get_remove() {
        let mut cache = CacheWorker::new();

        assert_eq!(cache.apply(Envelope::get("username")), Ok(None));
        assert_eq!(cache.apply(Envelope::set("username", "alice")), Ok(None));
        assert_eq!(cache.apply(Envelope::get("username")), Ok(Some(json!("alice"))));
        assert_eq!(cache.apply(Envelope::remove("username")), Ok(None));
        assert_eq!(cache.apply(Envelope::get("username")), Ok(None));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_stored_null_reads_as_absent() {
        let mut cache = CacheWorker::new();
        cache.apply(Envelope::set("k", Value::Null)).unwrap();
        assert_eq!(cache.apply(Envelope::get("k")), Ok(None));
    }

    #[test]
    fn test_send_all_returns_every_entry() {
        let mut cache = CacheWorker::new();
        cache.apply(Envelope::set("a", 1)).unwrap();
        cache.apply(Envelope::set("b", "two")).unwrap();

        let all = cache.apply(Envelope::send_all()).unwrap().unwrap();
        assert_eq!(all, json!({"a": 1, "b": "two"}));
    }

    #[test]
    fn test_rejected_envelope_leaves_map_untouched() {
        let mut cache = CacheWorker::new();
        cache.apply(Envelope::set("a", 1)).unwrap();

        let err = cache
            .apply(Envelope::new("set", vec![json!("a")]))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::WorkerMessage);

        let err = cache.apply(Envelope::new("purge", vec![])).unwrap_err();
        assert_eq!(err.kind, ErrorKind::WorkerMessage);

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.apply(Envelope::get("a")), Ok(Some(json!(1))));
    }

    #[tokio::test]
    async fn test_spawned_cache_round_trip() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = spawn_worker(CacheWorker::new(), tx);

        handle.send(Envelope::set("username", "alice")).unwrap();
        handle.send(Envelope::get("username")).unwrap();

        assert_eq!(rx.recv().await.unwrap().result, Ok(None));
        assert_eq!(rx.recv().await.unwrap().result, Ok(Some(json!("alice"))));
    }
}
