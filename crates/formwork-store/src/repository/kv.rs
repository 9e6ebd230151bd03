//! # Key-Value Repository
//!
//! get / set / remove over the `kv_store` table.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │  kv_store                                                     │
//! │  ───────────────────────────────────────────────────────────  │
//! │  key TEXT PK  │  value TEXT (JSON)  │  updated_at TEXT (UTC)  │
//! └───────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::StoreResult;
use crate::store::KeyValueStore;

/// Repository for key-value operations.
#[derive(Debug, Clone)]
pub struct KvRepository {
    pool: SqlitePool,
}

impl KvRepository {
    /// Creates a new KvRepository.
    pub fn new(pool: SqlitePool) -> Self {
        KvRepository { pool }
    }

    /// Returns the value stored under `key`, if any.
    pub async fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        let text: Option<String> = sqlx::query_scalar("SELECT value FROM kv_store WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        let value = text.map(|t| serde_json::from_str(&t)).transpose()?;
        Ok(value)
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub async fn set(&self, key: &str, value: &Value) -> StoreResult<()> {
        let text = serde_json::to_string(value)?;

        debug!(key = %key, "Storing value");

        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(text)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Removes `key`. Returns true if a value was removed.
    pub async fn remove(&self, key: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM kv_store WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Returns the number of stored keys.
    pub async fn count(&self) -> StoreResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM kv_store")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[async_trait]
impl KeyValueStore for KvRepository {
    async fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        KvRepository::get(self, key).await
    }

    async fn set(&self, key: &str, value: &Value) -> StoreResult<()> {
        KvRepository::set(self, key, value).await
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        KvRepository::remove(self, key).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use serde_json::json;

    async fn repo() -> KvRepository {
        Database::new(DbConfig::in_memory()).await.unwrap().kv()
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let kv = repo().await;

        kv.set("username", &json!("alice")).await.unwrap();
        assert_eq!(kv.get("username").await.unwrap(), Some(json!("alice")));
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let kv = repo().await;

        kv.set("k", &json!({ "n": 1 })).await.unwrap();
        kv.set("k", &json!({ "n": 2 })).await.unwrap();

        assert_eq!(kv.get("k").await.unwrap(), Some(json!({ "n": 2 })));
        assert_eq!(kv.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_remove() {
        let kv = repo().await;

        kv.set("k", &json!("v")).await.unwrap();
        assert!(kv.remove("k").await.unwrap());
        assert!(!kv.remove("k").await.unwrap());
        assert_eq!(kv.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_trait_object_access() {
        let store: Box<dyn KeyValueStore> = Box::new(repo().await);

        store.set("k", &json!([1, 2])).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(json!([1, 2])));
        store.remove("k").await.unwrap();
        assert_eq!(store.get("missing").await.unwrap(), None);
    }
}
