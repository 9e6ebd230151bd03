//! # Abort Signals
//!
//! Cancellation for in-flight worker operations.
//!
//! ## Signal Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  AbortController ──signal()──► AbortSignal (clone freely)              │
//! │       │                              │                                  │
//! │    abort(reason)                 aborted().await                        │
//! │       │                              │                                  │
//! │       └──────── watch channel ───────┘                                  │
//! │                                                                         │
//! │  TimeoutGuard::new(10s, "storage get", &parent)                        │
//! │       │                                                                 │
//! │       ├── timer fires ─────────► abort("storage get timed out ...")    │
//! │       ├── parent aborts ───────► abort(parent reason)                  │
//! │       └── guard dropped ───────► timer task cancelled                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! An abort is sticky: once a signal reports aborted it stays aborted.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use formwork_core::AppError;

// =============================================================================
// Controller
// =============================================================================

/// The aborting side.
#[derive(Debug, Clone)]
pub struct AbortController {
    tx: Arc<watch::Sender<Option<String>>>,
}

impl AbortController {
    /// Creates a controller that has not aborted.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        AbortController { tx: Arc::new(tx) }
    }

    /// Returns a signal observing this controller.
    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Aborts with `reason`. Later calls keep the first reason.
    pub fn abort(&self, reason: impl Into<String>) {
        let reason = reason.into();
        self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason);
            true
        });
    }

    /// Returns true once [`abort`](Self::abort) has been called.
    pub fn is_aborted(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// Shorthand for a [`TimeoutGuard`] with no parent signal.
    pub fn with_timeout(timeout: Duration, context: &str) -> TimeoutGuard {
        TimeoutGuard::new(timeout, context, &AbortSignal::never())
    }
}

impl Default for AbortController {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Signal
// =============================================================================

/// The observing side.
#[derive(Debug, Clone)]
pub struct AbortSignal {
    rx: watch::Receiver<Option<String>>,
}

impl AbortSignal {
    /// A signal that never aborts.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(None);
        AbortSignal { rx }
    }

    /// Returns true if the controller has aborted.
    pub fn is_aborted(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// Returns the abort reason, if aborted.
    pub fn reason(&self) -> Option<String> {
        self.rx.borrow().clone()
    }

    /// Resolves with the reason once aborted. Pends forever if the controller
    /// is dropped without aborting.
    pub async fn aborted(&self) -> String {
        let mut rx = self.rx.clone();
        loop {
            let current = rx.borrow_and_update().clone();
            if let Some(reason) = current {
                return reason;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

// =============================================================================
// Timeout Guard
// =============================================================================

/// A controller that aborts itself after a timeout or when a parent signal
/// aborts. Dropping the guard cancels the timer.
#[derive(Debug)]
pub struct TimeoutGuard {
    controller: AbortController,
    timer: JoinHandle<()>,
}

impl TimeoutGuard {
    /// Starts the timer. Must be called inside a tokio runtime.
    pub fn new(timeout: Duration, context: &str, parent: &AbortSignal) -> Self {
        let controller = AbortController::new();

        if let Some(reason) = parent.reason() {
            controller.abort(reason);
        }

        let timer_controller = controller.clone();
        let parent = parent.clone();
        let timeout_reason = format!("{} timed out after {}ms", context, timeout.as_millis());

        let timer = tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(timeout) => {
                    debug!(reason = %timeout_reason, "Operation timed out");
                    timer_controller.abort(timeout_reason);
                }
                reason = parent.aborted() => {
                    timer_controller.abort(reason);
                }
            }
        });

        TimeoutGuard { controller, timer }
    }

    /// Returns the signal to pass to the guarded operation.
    pub fn signal(&self) -> AbortSignal {
        self.controller.signal()
    }
}

impl Drop for TimeoutGuard {
    fn drop(&mut self) {
        self.timer.abort();
    }
}

// =============================================================================
// Abortable Futures
// =============================================================================

/// Races `future` against `signal`.
///
/// ## Returns
/// * `Ok(output)` - the future finished first
/// * `Err(PromiseAbortedError)` - the signal was already aborted, or aborted
///   while the future was pending
pub async fn make_abortable<F, T>(
    future: F,
    signal: &AbortSignal,
    context: &str,
) -> Result<T, AppError>
where
    F: Future<Output = T>,
{
    if signal.is_aborted() {
        return Err(AppError::promise_aborted(format!(
            "{} aborted before start",
            context
        )));
    }

    tokio::select! {
        biased;
        reason = signal.aborted() => {
            Err(AppError::promise_aborted(format!("{}: {}", context, reason)))
        }
        output = future => Ok(output),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
