//! # Error Boundary
//!
//! Catches a failing child form, shows a fallback, and re-mounts the child
//! from its last reported state on request.
//!
//! ## Phases
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │             render() ok                                                │
//! │            ┌────────┐                                                  │
//! │            ▼        │                                                  │
//! │      ┌───────────┐──┘   render() Err / panic   ┌──────────┐           │
//! │ ───► │ Rendering │ ───────────────────────────►│ Errored  │           │
//! │      └───────────┘                              └────┬─────┘           │
//! │            ▲                                         │ reset()         │
//! │            │            ┌───────────┐                │                 │
//! │            └────────────│ Resetting │◄───────────────┘                 │
//! │         child remounted └───────────┘  unmount crashed child           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The boundary stays `Errored` until [`ErrorBoundary::reset`] is called.
//!
//! ## Snapshot
//! The child is re-mounted from its initial state with the last reported
//! child state shallow-merged over it. `safeErrorMaybe` and `isLoading` are
//! cleared so the restored form is usable again.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{error, info, warn};

use formwork_core::AppError;

use crate::components::workers::FormServices;
use crate::error::{ConsoleError, ConsoleResult};
use crate::state::BoundaryState;

/// Fields cleared when a crashed child is restored.
const TRANSIENT_FIELDS: [(&str, Value); 2] = [
    ("safeErrorMaybe", Value::Null),
    ("isLoading", Value::Bool(false)),
];

/// A component the boundary can mount, render and tear down.
pub trait BoundaryChild: Sized {
    type State: Serialize + DeserializeOwned + Default;

    fn mount(initial: Self::State, services: Arc<FormServices>, reporter: BoundaryState) -> Self;

    /// The state to display, or the error that should trip the boundary.
    fn render(&self) -> Result<Self::State, AppError>;

    fn unmount(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryPhase {
    Rendering,
    Errored,
    Resetting,
}

/// What the boundary shows.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundaryView<S> {
    Child(S),
    Fallback(AppError),
}

pub struct ErrorBoundary<C: BoundaryChild> {
    phase: BoundaryPhase,
    child: Option<C>,
    defaults: Map<String, Value>,
    services: Arc<FormServices>,
    reporter: BoundaryState,
    error: Option<AppError>,
    snapshot: Option<Map<String, Value>>,
}

impl<C: BoundaryChild> ErrorBoundary<C> {
    /// Mounts `C` with `initial` under a new boundary.
    ///
    /// ## Errors
    /// `initial` does not serialize to a JSON record.
    pub fn mount(initial: C::State, services: Arc<FormServices>) -> ConsoleResult<Self> {
        let defaults = match serde_json::to_value(&initial)? {
            Value::Object(map) => map,
            _ => {
                return Err(ConsoleError::App(AppError::invariant(
                    "Child state must serialize to a record",
                )))
            }
        };

        let reporter = BoundaryState::new();
        let child = C::mount(initial, services.clone(), reporter.clone());

        Ok(ErrorBoundary {
            phase: BoundaryPhase::Rendering,
            child: Some(child),
            defaults,
            services,
            reporter,
            error: None,
            snapshot: None,
        })
    }

    pub fn phase(&self) -> BoundaryPhase {
        self.phase
    }

    pub fn child(&self) -> Option<&C> {
        self.child.as_ref()
    }

    pub fn child_mut(&mut self) -> Option<&mut C> {
        self.child.as_mut()
    }

    /// The error that tripped the boundary, while errored.
    pub fn error(&self) -> Option<&AppError> {
        self.error.as_ref()
    }

    /// The state the child will be restored from, while errored.
    pub fn snapshot(&self) -> Option<&Map<String, Value>> {
        self.snapshot.as_ref()
    }

    pub fn reporter(&self) -> &BoundaryState {
        &self.reporter
    }

    /// Renders the child, tripping the boundary on an error or a panic.
    pub fn render(&mut self) -> BoundaryView<C::State> {
        if let (BoundaryPhase::Errored, Some(err)) = (self.phase, &self.error) {
            return BoundaryView::Fallback(err.clone());
        }

        let outcome = match &self.child {
            Some(child) => catch_unwind(AssertUnwindSafe(|| child.render())),
            None => Ok(Err(AppError::invariant("Error boundary has no mounted child"))),
        };

        match outcome {
            Ok(Ok(state)) => BoundaryView::Child(state),
            Ok(Err(err)) => self.trip(err),
            Err(panic) => {
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic payload".to_string());
                self.trip(AppError::unknown(format!("Child component panicked: {}", detail)))
            }
        }
    }

    /// Re-mounts the crashed child from the snapshot. A no-op unless errored.
    pub fn reset(&mut self) {
        if self.phase != BoundaryPhase::Errored {
            return;
        }

        self.phase = BoundaryPhase::Resetting;

        if let Some(mut crashed) = self.child.take() {
            crashed.unmount();
        }

        let mut snapshot = self.snapshot.take().unwrap_or_else(|| self.defaults.clone());
        for (field, cleared) in TRANSIENT_FIELDS {
            snapshot.insert(field.to_string(), cleared);
        }

        let restored = match serde_json::from_value::<C::State>(Value::Object(snapshot)) {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, "Snapshot did not restore, falling back to initial state");
                serde_json::from_value(Value::Object(self.defaults.clone())).unwrap_or_default()
            }
        };

        self.child = Some(C::mount(restored, self.services.clone(), self.reporter.clone()));
        self.error = None;
        self.phase = BoundaryPhase::Rendering;
        info!("Error boundary reset, child re-mounted");
    }

    /// Unmounts the child for good.
    pub fn unmount(&mut self) {
        if let Some(mut child) = self.child.take() {
            child.unmount();
        }
    }

    fn trip(&mut self, err: AppError) -> BoundaryView<C::State> {
        error!(kind = %err.kind, error = %err.message, "Error boundary caught a failure");

        let snapshot = self
            .reporter
            .snapshot_over(self.defaults.clone())
            .unwrap_or_else(|e| {
                warn!(error = %e, "Could not read reported child state");
                self.defaults.clone()
            });

        self.snapshot = Some(snapshot);
        self.error = Some(err.clone());
        self.phase = BoundaryPhase::Errored;
        BoundaryView::Fallback(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::login::LoginForm;
    use crate::components::testing::test_services;
    use formwork_core::{ErrorKind, LoginState};
    use serde_json::json;

    /// Panics on render when its username is "boom".
    struct Fragile {
        state: LoginState,
        unmounted: bool,
    }

    impl BoundaryChild for Fragile {
        type State = LoginState;

        fn mount(
            initial: LoginState,
            _services: Arc<FormServices>,
            reporter: BoundaryState,
        ) -> Self {
            reporter.report(&initial).unwrap();
            Fragile {
                state: initial,
                unmounted: false,
            }
        }

        fn render(&self) -> Result<LoginState, AppError> {
            if self.state.username == "boom" {
                panic!("render exploded");
            }
            Ok(self.state.clone())
        }

        fn unmount(&mut self) {
            self.unmounted = true;
        }
    }

    #[tokio::test]
    async fn test_renders_child_while_healthy() {
        let services = test_services(vec![]);
        let mut boundary =
            ErrorBoundary::<LoginForm>::mount(LoginState::default(), services).unwrap();

        boundary.child_mut().unwrap().set_username("alice");

        match boundary.render() {
            BoundaryView::Child(state) => assert_eq!(state.username, "alice"),
            BoundaryView::Fallback(err) => panic!("unexpected fallback: {}", err),
        }
        assert_eq!(boundary.phase(), BoundaryPhase::Rendering);

        boundary.unmount();
    }

    #[tokio::test]
    async fn test_failure_trips_and_reset_restores_input() {
        let services = test_services(vec![]);
        let mut boundary =
            ErrorBoundary::<LoginForm>::mount(LoginState::default(), services).unwrap();

        {
            let form = boundary.child_mut().unwrap();
            form.set_username("alice");
            form.set_password("hunter2");
            form.submit().unwrap();
            form.settle().await.unwrap();
        }

        let err = match boundary.render() {
            BoundaryView::Fallback(err) => err,
            BoundaryView::Child(_) => panic!("expected fallback"),
        };
        assert_eq!(err.kind, ErrorKind::Network);
        assert_eq!(boundary.phase(), BoundaryPhase::Errored);
        assert_eq!(boundary.snapshot().unwrap()["username"], json!("alice"));

        // Stays errored until reset.
        assert!(matches!(boundary.render(), BoundaryView::Fallback(_)));

        boundary.reset();
        assert_eq!(boundary.phase(), BoundaryPhase::Rendering);
        assert!(boundary.error().is_none());

        match boundary.render() {
            BoundaryView::Child(state) => {
                assert_eq!(state.username, "alice");
                assert_eq!(state.password, "hunter2");
                assert_eq!(state.safe_error, None);
                assert!(!state.is_loading);
            }
            BoundaryView::Fallback(err) => panic!("unexpected fallback: {}", err),
        }

        boundary.unmount();
    }

    #[test]
    fn test_panic_is_caught_and_child_remounted() {
        let initial = LoginState {
            username: "boom".into(),
            ..LoginState::default()
        };
        let mut boundary = ErrorBoundary::<Fragile>::mount(initial, test_services(vec![])).unwrap();
        boundary.reporter().report(&json!({"username": "recovered"})).unwrap();

        let err = match boundary.render() {
            BoundaryView::Fallback(err) => err,
            BoundaryView::Child(_) => panic!("expected fallback"),
        };
        assert_eq!(err.kind, ErrorKind::Unknown);
        assert!(err.message.contains("render exploded"));
        assert_eq!(boundary.snapshot().unwrap()["username"], json!("recovered"));

        boundary.reset();

        match boundary.render() {
            BoundaryView::Child(state) => assert_eq!(state.username, "recovered"),
            BoundaryView::Fallback(err) => panic!("unexpected fallback: {}", err),
        }
    }

    #[test]
    fn test_reset_is_noop_while_rendering() {
        let mut boundary =
            ErrorBoundary::<Fragile>::mount(LoginState::default(), test_services(vec![])).unwrap();

        boundary.reset();

        assert_eq!(boundary.phase(), BoundaryPhase::Rendering);
        assert!(!boundary.child().unwrap().unmounted);
    }
}
