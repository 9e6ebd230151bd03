//! Fakes shared by the component tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use formwork_core::AppError;
use formwork_store::{KeyValueStore, StoreResult};
use formwork_workers::{HttpClient, HttpResponse, RequestInit, RetryOptions, WorkerSettings};

use crate::components::workers::FormServices;
use crate::config::EndpointSettings;

pub const LOGIN_URL: &str = "https://auth.example.test/login";
pub const REGISTER_URL: &str = "https://auth.example.test/register";

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &Value) -> StoreResult<()> {
        self.entries.lock().unwrap().insert(key.to_string(), value.clone());
        Ok(())
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

/// Replays scripted responses, then refuses connections.
#[derive(Default)]
pub struct ScriptedClient {
    script: Mutex<VecDeque<Result<HttpResponse, AppError>>>,
    requests: Mutex<Vec<(String, RequestInit)>>,
}

impl ScriptedClient {
    pub fn requests(&self) -> Vec<(String, RequestInit)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpClient for ScriptedClient {
    async fn execute(&self, url: &str, init: &RequestInit) -> Result<HttpResponse, AppError> {
        self.requests.lock().unwrap().push((url.to_string(), init.clone()));
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(AppError::network("connection refused")))
    }
}

pub fn ok_json(body: Value) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse {
        status: 200,
        body: body.to_string(),
    })
}

/// Services with one fetch attempt per request.
pub fn test_services_with_client(
    script: Vec<Result<HttpResponse, AppError>>,
) -> (Arc<FormServices>, Arc<ScriptedClient>) {
    let client = Arc::new(ScriptedClient {
        script: Mutex::new(script.into()),
        requests: Mutex::new(Vec::new()),
    });

    let settings = WorkerSettings {
        retry: RetryOptions {
            retries: 1,
            ..RetryOptions::default()
        },
        ..WorkerSettings::default()
    };

    let endpoints = EndpointSettings {
        login_url: LOGIN_URL.to_string(),
        register_url: REGISTER_URL.to_string(),
    };

    let services = FormServices::new(
        settings,
        Arc::new(MemoryStore::default()),
        client.clone(),
        endpoints,
    );

    (Arc::new(services), client)
}

pub fn test_services(script: Vec<Result<HttpResponse, AppError>>) -> Arc<FormServices> {
    test_services_with_client(script).0
}
