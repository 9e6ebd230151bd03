//! # formwork-store: Persistent Key-Value Store
//!
//! Durable storage for the storage worker, on SQLite via sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Formwork Data Flow                               │
//! │                                                                         │
//! │  Storage worker ({kind:"set", payload:[key, value]})                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  formwork-store (THIS CRATE)                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │ KeyValueStore │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │  (store.rs)   │    │  (embedded)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ KvRepository  │    │ 001_kv_store │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (data dir) or :memory: in tests                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use formwork_store::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("formwork.db")).await?;
//! db.kv().set("username", &serde_json::json!("alice")).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{StoreError, StoreResult};
pub use pool::{Database, DbConfig};
pub use repository::kv::KvRepository;
pub use store::KeyValueStore;
