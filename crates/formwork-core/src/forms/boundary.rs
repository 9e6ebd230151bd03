//! # Error Boundary State
//!
//! The record of child state an error boundary keeps across crashes.
//!
//! ```text
//! child field change ──► setChildComponentState({...fields}) ──► merged record
//!                                                                     │
//!            child throws ──► boundary snapshot = defaults ⊕ record ◄─┘
//! ```

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use ts_rs::TS;

use crate::dispatch::{parse_dispatch_and_set_state, Dispatch, Reducer};
use crate::error::AppError;

/// Action tags understood by the error boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorBoundaryAction {
    SetChildComponentState,
}

impl ErrorBoundaryAction {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorBoundaryAction::SetChildComponentState => "setChildComponentState",
        }
    }

    /// Builds a dispatch for this action.
    pub fn with(self, payload: impl Into<Value>) -> Dispatch {
        Dispatch::new(self.as_str(), payload)
    }
}

impl std::fmt::Display for ErrorBoundaryAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ErrorBoundaryAction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "setChildComponentState" => Ok(ErrorBoundaryAction::SetChildComponentState),
            other => Err(AppError::validation(format!(
                "Unknown error boundary action: '{}'",
                other
            ))),
        }
    }
}

/// Last reported child state, as a JSON record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default, rename_all = "camelCase")]
pub struct ErrorBoundaryState {
    #[ts(type = "Record<string, unknown>")]
    pub child_component_state: Map<String, Value>,
}

impl ErrorBoundaryState {
    /// Shallow-merges the recorded child state over `defaults`.
    pub fn snapshot_over(&self, mut defaults: Map<String, Value>) -> Map<String, Value> {
        for (key, value) in &self.child_component_state {
            defaults.insert(key.clone(), value.clone());
        }
        defaults
    }
}

// Records merge key by key; `{}` is valid and changes nothing.
fn set_child_component_state(state: ErrorBoundaryState, dispatch: &Dispatch) -> ErrorBoundaryState {
    parse_dispatch_and_set_state(
        state,
        dispatch,
        ErrorBoundaryAction::SetChildComponentState.as_str(),
        |mut s: ErrorBoundaryState, record: Map<String, Value>| {
            s.child_component_state.extend(record);
            s
        },
    )
}

/// Returns the error boundary reducer.
pub fn error_boundary_reducer() -> &'static Reducer<ErrorBoundaryState> {
    static REDUCER: OnceLock<Reducer<ErrorBoundaryState>> = OnceLock::new();
    REDUCER.get_or_init(|| {
        Reducer::new().on(
            ErrorBoundaryAction::SetChildComponentState.as_str(),
            set_child_component_state,
        )
    })
}

/// Produces the next error boundary state.
pub fn reduce(state: ErrorBoundaryState, dispatch: &Dispatch) -> ErrorBoundaryState {
    error_boundary_reducer().reduce(state, dispatch)
}
