//! # formwork-workers: Background Workers
//!
//! Cache, storage and fetch workers, each on its own tokio task, answering a
//! form component over a reply channel.
//!
//! ## Message Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Form component                                                        │
//! │     │ post(Envelope)            post(Envelope)        post(FetchRequest)│
//! │     ▼                           ▼                     ▼                 │
//! │  ┌──────────────┐         ┌──────────────┐      ┌──────────────┐       │
//! │  │ CacheWorker  │         │StorageWorker │      │ FetchWorker  │       │
//! │  │  HashMap     │         │ KeyValueStore│      │ retry_fetch  │       │
//! │  └──────┬───────┘         └──────┬───────┘      └──────┬───────┘       │
//! │         │                        │                     │               │
//! │         └──────────── WorkerReply { worker, result } ──┘               │
//! │                                  │                                      │
//! │                                  ▼                                      │
//! │                     component reply receiver                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Within one worker, replies follow posting order. Across workers there is
//! no ordering.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod abort;
pub mod cache;
pub mod config;
pub mod envelope;
pub mod fetch;
pub mod retry;
pub mod runtime;
pub mod storage;

// =============================================================================
// Re-exports
// =============================================================================

pub use abort::{make_abortable, AbortController, AbortSignal, TimeoutGuard};
pub use cache::CacheWorker;
pub use config::WorkerSettings;
pub use envelope::{Envelope, Request};
pub use fetch::{FetchRequest, FetchWorker, SchemaTable};
pub use retry::{retry_fetch, HttpClient, HttpResponse, ReqwestClient, RequestInit, RetryOptions};
pub use runtime::{spawn_worker, WorkerBehavior, WorkerHandle, WorkerKind, WorkerReply};
pub use storage::StorageWorker;
