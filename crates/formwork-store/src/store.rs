//! # Key-Value Store Contract
//!
//! The three operations the storage worker relies on. Anything that can get,
//! set and remove JSON values by string key can back a storage worker.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreResult;

/// Durable key-value storage.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns the value under `key`, or `None` when absent.
    async fn get(&self, key: &str) -> StoreResult<Option<Value>>;

    /// Stores `value` under `key`.
    async fn set(&self, key: &str, value: &Value) -> StoreResult<()>;

    /// Removes `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> StoreResult<()>;
}
