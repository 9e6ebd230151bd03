//! # Boundary State
//!
//! The reporting channel between a form and the error boundary above it.
//!
//! ## Thread Safety
//! The boundary and its child each hold a clone. The state sits behind
//! `Arc<Mutex<T>>`; the lock is never held across an `.await`.
//!
//! ## Reporting Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  child form state changes                                              │
//! │       │ report(&state)                                                 │
//! │       ▼                                                                 │
//! │  setChildComponentState(serialized state)                              │
//! │       │ error boundary reducer (shallow merge)                         │
//! │       ▼                                                                 │
//! │  ErrorBoundaryState { childComponentState }                            │
//! │       │ snapshot_over(defaults)                                        │
//! │       ▼                                                                 │
//! │  state the child is re-mounted with after a reset                     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::{Arc, Mutex};

use serde::Serialize;
use serde_json::{Map, Value};

use formwork_core::forms::boundary;
use formwork_core::{Dispatch, ErrorBoundaryAction, ErrorBoundaryState};

use crate::error::{ConsoleError, ConsoleResult};

/// Shared handle on the boundary's recorded child state.
#[derive(Debug, Clone, Default)]
pub struct BoundaryState {
    inner: Arc<Mutex<ErrorBoundaryState>>,
}

impl BoundaryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Executes a function with read access to the state.
    pub fn with_state<F, R>(&self, f: F) -> ConsoleResult<R>
    where
        F: FnOnce(&ErrorBoundaryState) -> R,
    {
        let state = self
            .inner
            .lock()
            .map_err(|_| ConsoleError::StatePoisoned("error boundary"))?;
        Ok(f(&state))
    }

    /// Runs `dispatch` through the error boundary reducer.
    pub fn dispatch(&self, dispatch: &Dispatch) -> ConsoleResult<()> {
        let mut state = self
            .inner
            .lock()
            .map_err(|_| ConsoleError::StatePoisoned("error boundary"))?;
        let current = std::mem::take(&mut *state);
        *state = boundary::reduce(current, dispatch);
        Ok(())
    }

    /// Records the child's latest state.
    pub fn report<S: Serialize>(&self, child_state: &S) -> ConsoleResult<()> {
        let payload = serde_json::to_value(child_state)?;
        self.dispatch(&ErrorBoundaryAction::SetChildComponentState.with(payload))
    }

    /// The recorded child state merged over `defaults`.
    pub fn snapshot_over(&self, defaults: Map<String, Value>) -> ConsoleResult<Map<String, Value>> {
        self.with_state(|state| state.snapshot_over(defaults))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formwork_core::LoginState;
    use serde_json::json;

    #[test]
    fn test_report_records_child_state() {
        let reporter = BoundaryState::new();
        let child = LoginState {
            username: "alice".into(),
            ..LoginState::default()
        };

        reporter.report(&child).unwrap();

        let recorded = reporter
            .with_state(|s| s.child_component_state.get("username").cloned())
            .unwrap();
        assert_eq!(recorded, Some(json!("alice")));
    }

    #[test]
    fn test_clones_share_state() {
        let boundary_side = BoundaryState::new();
        let child_side = boundary_side.clone();

        child_side.report(&json!({"username": "bob"})).unwrap();

        let snapshot = boundary_side
            .snapshot_over(json!({"username": "", "password": ""}).as_object().cloned().unwrap())
            .unwrap();
        assert_eq!(snapshot["username"], json!("bob"));
        assert_eq!(snapshot["password"], json!(""));
    }

    #[test]
    fn test_non_record_report_is_dropped() {
        let reporter = BoundaryState::new();
        reporter.report(&json!({"username": "carol"})).unwrap();
        reporter.report(&json!("not a record")).unwrap();

        let snapshot = reporter.snapshot_over(Map::new()).unwrap();
        assert_eq!(snapshot["username"], json!("carol"));
    }
}
