//! # Worker Runtime
//!
//! Hosts a [`WorkerBehavior`] on its own tokio task with a FIFO mailbox.
//!
//! ## Task Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  WorkerHandle::post(Some(msg))                                         │
//! │       │                                                                 │
//! │       ▼  unbounded mailbox (FIFO)                                      │
//! │  ┌──────────────────────────────┐                                      │
//! │  │ worker task                  │   one message at a time:             │
//! │  │   loop {                     │   None      → WorkerMessageError     │
//! │  │     select! {                │   Some(msg) → behavior.handle()      │
//! │  │       shutdown => break      │   panic     → WorkerError            │
//! │  │       mailbox  => handle     │                                      │
//! │  │     }                        │                                      │
//! │  │   }                          │                                      │
//! │  └──────────────┬───────────────┘                                      │
//! │                 │ JoinHandle                                            │
//! │                 ▼                                                       │
//! │  ┌──────────────────────────────┐                                      │
//! │  │ supervisor task              │   escaped panic → WorkerError        │
//! │  │   join.await                 │   cancellation  → PromiseRejection   │
//! │  └──────────────────────────────┘                                      │
//! │                                                                         │
//! │  Every outcome lands on the component's reply channel as a             │
//! │  WorkerReply { worker, worker_id, result }.                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use formwork_core::{AppError, AppResult};

use crate::abort::{AbortController, AbortSignal};

// =============================================================================
// Worker Identity
// =============================================================================

/// The three background workers a form owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerKind {
    Cache,
    Storage,
    Fetch,
}

impl WorkerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerKind::Cache => "cache",
            WorkerKind::Storage => "storage",
            WorkerKind::Fetch => "fetch",
        }
    }
}

impl fmt::Display for WorkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One outcome delivered back to the owning component.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerReply {
    pub worker: WorkerKind,
    pub worker_id: Uuid,
    pub result: AppResult<Value>,
}

// =============================================================================
// Behavior
// =============================================================================

/// What a worker does with each message.
///
/// `signal` is the worker's shutdown signal. Long-running handlers race
/// their work against it so that termination cancels in-flight operations.
#[async_trait]
pub trait WorkerBehavior: Send + 'static {
    type Message: Send + 'static;

    fn kind(&self) -> WorkerKind;

    async fn handle(&mut self, message: Self::Message, signal: &AbortSignal) -> AppResult<Value>;
}

// =============================================================================
// Handle
// =============================================================================

/// The owning side of a running worker.
///
/// Dropping the handle closes the mailbox, which also stops the worker once
/// queued messages are processed.
#[derive(Debug)]
pub struct WorkerHandle<M> {
    id: Uuid,
    kind: WorkerKind,
    tx: mpsc::UnboundedSender<Option<M>>,
    shutdown: AbortController,
}

impl<M> WorkerHandle<M> {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> WorkerKind {
        self.kind
    }

    /// Queues a message without waiting for the reply.
    ///
    /// `None` is delivered as-is and answered with a `WorkerMessageError`.
    ///
    /// ## Errors
    /// `WorkerMessageError` if the worker was terminated or its task has
    /// stopped.
    pub fn post(&self, message: Option<M>) -> Result<(), AppError> {
        if self.shutdown.is_aborted() {
            return Err(AppError::worker_message(format!(
                "The {} worker has been terminated",
                self.kind
            )));
        }

        self.tx.send(message).map_err(|_| {
            AppError::worker_message(format!("The {} worker mailbox is closed", self.kind))
        })
    }

    /// Queues a present message.
    pub fn send(&self, message: M) -> Result<(), AppError> {
        self.post(Some(message))
    }

    /// Stops the worker. Queued messages are discarded and in-flight work is
    /// aborted.
    pub fn terminate(&self) {
        if !self.shutdown.is_aborted() {
            debug!(worker = %self.kind, id = %self.id, "Terminating worker");
        }
        self.shutdown.abort(format!("{} worker terminated", self.kind));
    }

    pub fn is_terminated(&self) -> bool {
        self.shutdown.is_aborted()
    }
}

// =============================================================================
// Spawning
// =============================================================================

/// Starts `behavior` on its own task and returns the handle.
///
/// Replies go to `replies`. A second task supervises the worker and reports
/// anything that escapes the message loop on the same channel.
pub fn spawn_worker<B>(
    behavior: B,
    replies: mpsc::UnboundedSender<WorkerReply>,
) -> WorkerHandle<B::Message>
where
    B: WorkerBehavior,
{
    let id = Uuid::new_v4();
    let kind = behavior.kind();
    let (tx, mailbox) = mpsc::unbounded_channel();
    let shutdown = AbortController::new();

    let task = WorkerTask {
        id,
        kind,
        behavior,
        mailbox,
        replies: replies.clone(),
        shutdown: shutdown.signal(),
    };

    let join = tokio::spawn(task.run());
    tokio::spawn(supervise(id, kind, join, replies));

    WorkerHandle {
        id,
        kind,
        tx,
        shutdown,
    }
}

struct WorkerTask<B: WorkerBehavior> {
    id: Uuid,
    kind: WorkerKind,
    behavior: B,
    mailbox: mpsc::UnboundedReceiver<Option<B::Message>>,
    replies: mpsc::UnboundedSender<WorkerReply>,
    shutdown: AbortSignal,
}

impl<B: WorkerBehavior> WorkerTask<B> {
    async fn run(mut self) {
        info!(worker = %self.kind, id = %self.id, "Worker started");

        loop {
            let next = tokio::select! {
                biased;
                _ = self.shutdown.aborted() => None,
                message = self.mailbox.recv() => message,
            };

            let Some(message) = next else {
                break;
            };

            let result = match message {
                None => Err(AppError::worker_message(format!(
                    "No data received in {} worker message",
                    self.kind
                ))),
                Some(message) => self.dispatch(message).await,
            };

            if let Err(err) = &result {
                debug!(worker = %self.kind, error = %err, "Worker replied with failure");
            }

            let reply = WorkerReply {
                worker: self.kind,
                worker_id: self.id,
                result,
            };

            if self.replies.send(reply).is_err() {
                debug!(worker = %self.kind, "Reply channel closed");
                break;
            }
        }

        info!(worker = %self.kind, id = %self.id, "Worker stopped");
    }

    async fn dispatch(&mut self, message: B::Message) -> AppResult<Value> {
        let handled = AssertUnwindSafe(self.behavior.handle(message, &self.shutdown))
            .catch_unwind()
            .await;

        match handled {
            Ok(result) => result,
            Err(panic) => {
                error!(worker = %self.kind, "Worker message handler panicked");
                Err(AppError::worker(format!(
                    "Unhandled error in {} worker message handler: {}",
                    self.kind,
                    panic_message(panic.as_ref())
                )))
            }
        }
    }
}

async fn supervise(
    id: Uuid,
    kind: WorkerKind,
    join: JoinHandle<()>,
    replies: mpsc::UnboundedSender<WorkerReply>,
) {
    let err = match join.await {
        Ok(()) => return,
        Err(err) => err,
    };

    let result = if err.is_panic() {
        error!(worker = %kind, id = %id, "Worker task panicked");
        Err(AppError::worker(format!("Unhandled error in {} worker", kind)))
    } else {
        warn!(worker = %kind, id = %id, "Worker task was cancelled");
        Err(AppError::promise_rejection(format!(
            "Unhandled promise rejection in {} worker",
            kind
        )))
    };

    let reply = WorkerReply {
        worker: kind,
        worker_id: id,
        result,
    };

    if replies.send(reply).is_err() {
        warn!(worker = %kind, id = %id, "Reply channel closed, dropping unhandled worker failure");
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(text) = panic.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = panic.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use formwork_core::ErrorKind;
    use serde_json::json;
    use std::time::Duration;

    /// Echoes numbers; panics on negative input; sleeps on 0.
    struct Echo;

    #[async_trait]
    impl WorkerBehavior for Echo {
        type Message = i64;

        fn kind(&self) -> WorkerKind {
            WorkerKind::Cache
        }

        async fn handle(&mut self, message: i64, signal: &AbortSignal) -> AppResult<Value> {
            if message < 0 {
                panic!("negative input");
            }
            if message == 0 {
                let reason = signal.aborted().await;
                return Err(AppError::abort(reason));
            }
            Ok(Some(json!(message)))
        }
    }

    /// Panics when dropped, which happens after the message loop has exited.
    struct PanicsOnDrop;

    impl Drop for PanicsOnDrop {
        fn drop(&mut self) {
            panic!("dropped during shutdown");
        }
    }

    #[async_trait]
    impl WorkerBehavior for PanicsOnDrop {
        type Message = i64;

        fn kind(&self) -> WorkerKind {
            WorkerKind::Storage
        }

        async fn handle(&mut self, message: i64, _signal: &AbortSignal) -> AppResult<Value> {
            Ok(Some(json!(message)))
        }
    }

    fn channel() -> (
        mpsc::UnboundedSender<WorkerReply>,
        mpsc::UnboundedReceiver<WorkerReply>,
    ) {
        mpsc::unbounded_channel()
    }

    #[tokio::test]
    async fn test_replies_arrive_in_fifo_order() {
        let (tx, mut rx) = channel();
        let handle = spawn_worker(Echo, tx);

        for n in 1..=5 {
            handle.send(n).unwrap();
        }

        for n in 1..=5 {
            let reply = rx.recv().await.unwrap();
            assert_eq!(reply.worker, WorkerKind::Cache);
            assert_eq!(reply.worker_id, handle.id());
            assert_eq!(reply.result, Ok(Some(json!(n))));
        }
    }

    #[tokio::test]
    async fn test_empty_message_is_rejected() {
        let (tx, mut rx) = channel();
        let handle = spawn_worker(Echo, tx);

        handle.post(None).unwrap();

        let err = rx.recv().await.unwrap().result.unwrap_err();
        assert_eq!(err.kind, ErrorKind::WorkerMessage);
        assert_eq!(err.message, "No data received in cache worker message");
    }

    #[tokio::test]
    async fn test_handler_panic_becomes_failure_and_worker_survives() {
        let (tx, mut rx) = channel();
        let handle = spawn_worker(Echo, tx);

        handle.send(-1).unwrap();
        handle.send(7).unwrap();

        let err = rx.recv().await.unwrap().result.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Worker);
        assert!(err.message.contains("negative input"));

        assert_eq!(rx.recv().await.unwrap().result, Ok(Some(json!(7))));
    }

    #[tokio::test]
    async fn test_post_after_terminate_fails() {
        let (tx, _rx) = channel();
        let handle = spawn_worker(Echo, tx);

        handle.terminate();

        assert!(handle.is_terminated());
        let err = handle.send(1).unwrap_err();
        assert_eq!(err.kind, ErrorKind::WorkerMessage);
    }

    #[tokio::test]
    async fn test_terminate_aborts_in_flight_work() {
        let (tx, mut rx) = channel();
        let handle = spawn_worker(Echo, tx);

        handle.send(0).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.terminate();

        let err = rx.recv().await.unwrap().result.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Abort);
        assert_eq!(err.message, "cache worker terminated");
    }

    #[tokio::test]
    async fn test_panic_outside_handler_is_reported() {
        let (tx, mut rx) = channel();
        let handle = spawn_worker(PanicsOnDrop, tx);

        handle.terminate();

        let reply = rx.recv().await.unwrap();
        assert_eq!(reply.worker, WorkerKind::Storage);
        assert_eq!(reply.worker_id, handle.id());

        let err = reply.result.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Worker);
        assert_eq!(err.message, "Unhandled error in storage worker");
    }

    #[tokio::test]
    async fn test_cancelled_task_is_reported_as_rejection() {
        let (tx, mut rx) = channel();
        let id = Uuid::new_v4();
        let task = tokio::spawn(std::future::pending::<()>());
        task.abort();

        supervise(id, WorkerKind::Fetch, task, tx).await;

        let reply = rx.recv().await.unwrap();
        assert_eq!(reply.worker, WorkerKind::Fetch);
        assert_eq!(reply.worker_id, id);

        let err = reply.result.unwrap_err();
        assert_eq!(err.kind, ErrorKind::PromiseRejection);
        assert_eq!(err.message, "Unhandled promise rejection in fetch worker");
    }

    #[tokio::test]
    async fn test_finished_task_sends_nothing() {
        let (tx, mut rx) = channel();
        let task = tokio::spawn(async {});

        supervise(Uuid::new_v4(), WorkerKind::Cache, task, tx).await;

        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_worker_ids_are_unique() {
        let (tx, _rx) = channel();
        let a = spawn_worker(Echo, tx.clone());
        let b = spawn_worker(Echo, tx);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_kind_serializes_lowercase() {
        assert_eq!(serde_json::to_value(WorkerKind::Storage).unwrap(), json!("storage"));
        assert_eq!(WorkerKind::Fetch.to_string(), "fetch");
    }
}
