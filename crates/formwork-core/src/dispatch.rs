//! # Dispatch & Reducers
//!
//! Parse-then-apply state transitions.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       reduce(state, dispatch)                           │
//! │                                                                         │
//! │  Dispatch { action: "setUsername", payload: "alice" }                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Reducer handler table ── no handler? ──► state returned untouched     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  parse_dispatch::<String>() ── invalid? ──► state returned untouched   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  setter(state, "alice") ──► next state (one field replaced)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Payloads arrive as untyped JSON and are validated by deserializing into the
//! field's Rust type, so a boolean field only accepts a JSON boolean and a
//! record field only accepts a JSON object.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::AppError;

// =============================================================================
// Dispatch
// =============================================================================

/// A requested state transition: an action tag and an untrusted payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dispatch {
    pub action: String,
    pub payload: Value,
}

impl Dispatch {
    /// Creates a dispatch.
    pub fn new(action: impl Into<String>, payload: impl Into<Value>) -> Self {
        Dispatch {
            action: action.into(),
            payload: payload.into(),
        }
    }
}

/// Validates `dispatch` against `action` and the payload type `T`.
///
/// Pure: returns the typed payload or a `ValidationError`-tagged [`AppError`].
pub fn parse_dispatch<T>(dispatch: &Dispatch, action: &str) -> Result<T, AppError>
where
    T: DeserializeOwned,
{
    if dispatch.action != action {
        return Err(AppError::validation(format!(
            "Expected action '{}', got '{}'",
            action, dispatch.action
        )));
    }

    serde_json::from_value(dispatch.payload.clone()).map_err(|e| {
        AppError::validation(format!("Invalid payload for '{}'", action)).with_source(&e)
    })
}

/// Applies `set` to `state` when `dispatch` validates, otherwise returns
/// `state` unchanged.
pub fn parse_dispatch_and_set_state<S, T, F>(
    state: S,
    dispatch: &Dispatch,
    action: &str,
    set: F,
) -> S
where
    T: DeserializeOwned,
    F: FnOnce(S, T) -> S,
{
    match parse_dispatch::<T>(dispatch, action) {
        Ok(payload) => set(state, payload),
        Err(err) => {
            debug!(action = %action, error = %err, "Dropping invalid dispatch");
            state
        }
    }
}

// =============================================================================
// Reducer
// =============================================================================

/// Handler for one action.
pub type Handler<S> = fn(S, &Dispatch) -> S;

/// Table of handlers keyed by action tag.
///
/// ## Example
/// ```rust
/// use formwork_core::dispatch::{parse_dispatch_and_set_state, Dispatch, Reducer};
///
/// #[derive(Debug, Default, PartialEq)]
/// struct Counter { step: i64 }
///
/// fn set_step(state: Counter, d: &Dispatch) -> Counter {
///     parse_dispatch_and_set_state(state, d, "setStep", |_, step| Counter { step })
/// }
///
/// let reducer = Reducer::new().on("setStep", set_step);
/// let next = reducer.reduce(Counter::default(), &Dispatch::new("setStep", 3));
/// assert_eq!(next, Counter { step: 3 });
///
/// let same = reducer.reduce(next, &Dispatch::new("unknown", 9));
/// assert_eq!(same, Counter { step: 3 });
/// ```
pub struct Reducer<S> {
    handlers: HashMap<&'static str, Handler<S>>,
}

impl<S> Reducer<S> {
    /// Creates an empty reducer.
    pub fn new() -> Self {
        Reducer {
            handlers: HashMap::new(),
        }
    }

    /// Registers `handler` for `action`.
    pub fn on(mut self, action: &'static str, handler: Handler<S>) -> Self {
        self.handlers.insert(action, handler);
        self
    }

    /// Returns true if `action` has a handler.
    pub fn handles(&self, action: &str) -> bool {
        self.handlers.contains_key(action)
    }

    /// Produces the next state. Unknown actions return `state` unchanged.
    pub fn reduce(&self, state: S, dispatch: &Dispatch) -> S {
        match self.handlers.get(dispatch.action.as_str()) {
            Some(handler) => handler(state, dispatch),
            None => {
                trace!(action = %dispatch.action, "No handler registered");
                state
            }
        }
    }
}

impl<S> Default for Reducer<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> std::fmt::Debug for Reducer<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut actions: Vec<&&str> = self.handlers.keys().collect();
        actions.sort();
        f.debug_struct("Reducer").field("actions", &actions).finish()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_parse_dispatch_checks_action_tag() {
        let d = Dispatch::new("setIsLoading", true);
        assert!(parse_dispatch::<bool>(&d, "setIsLoading").unwrap());

        let err = parse_dispatch::<bool>(&d, "setUsername").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[test]
    fn test_parse_dispatch_is_strict_about_types() {
        assert!(parse_dispatch::<bool>(&Dispatch::new("a", "true"), "a").is_err());
        assert!(parse_dispatch::<bool>(&Dispatch::new("a", 1), "a").is_err());
        assert!(parse_dispatch::<bool>(&Dispatch::new("a", json!(null)), "a").is_err());
        assert!(parse_dispatch::<String>(&Dispatch::new("a", false), "a").is_err());
        assert!(parse_dispatch::<String>(&Dispatch::new("a", json!({})), "a").is_err());
    }

    #[test]
    fn test_invalid_dispatch_leaves_state() {
        let state = parse_dispatch_and_set_state(7_i64, &Dispatch::new("n", "x"), "n", |_, v| v);
        assert_eq!(state, 7);

        let state = parse_dispatch_and_set_state(7_i64, &Dispatch::new("n", 9), "n", |_, v| v);
        assert_eq!(state, 9);
    }

    #[test]
    fn test_reducer_debug_lists_actions() {
        fn keep(s: u8, _: &Dispatch) -> u8 {
            s
        }
        let reducer: Reducer<u8> = Reducer::new().on("b", keep).on("a", keep);
        assert_eq!(format!("{:?}", reducer), r#"Reducer { actions: ["a", "b"] }"#);
        assert!(reducer.handles("a"));
        assert!(!reducer.handles("c"));
    }
}
