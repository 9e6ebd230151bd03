//! # Form Component
//!
//! One credential form: its state, its three workers, and its link to the
//! error boundary above it. [`LoginForm`](super::login::LoginForm) and
//! [`RegisterForm`](super::register::RegisterForm) are this component over
//! their own state types.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  mount ──► spawn cache/storage/fetch workers, report initial state     │
//! │    │                                                                    │
//! │    ├── set_username / set_password ──► reducer ──► report              │
//! │    │                                                                    │
//! │    ├── submit ──► isLoading = true                                     │
//! │    │             cache.set("username"), storage.set("username")        │
//! │    │             fetch POST credentials                                │
//! │    │                                                                    │
//! │    ├── process_replies / next_reply                                    │
//! │    │     failure       ──► safeErrorMaybe, isLoading = false           │
//! │    │     fetch success ──► responseDataMaybe, isLoading = false        │
//! │    │                                                                    │
//! │    ├── render ──► Ok(state) or Err(safe error) for the boundary        │
//! │    │                                                                    │
//! │  unmount ──► terminate workers; later replies are ignored              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use formwork_core::validation::ValidationResult;
use formwork_core::{AppError, Credentials, Dispatch, FormAction};
use formwork_workers::{Envelope, FetchRequest, RequestInit, WorkerKind, WorkerReply};

use crate::components::boundary::BoundaryChild;
use crate::components::workers::{send_message_to_worker, FormServices, FormWorkers};
use crate::config::EndpointSettings;
use crate::state::BoundaryState;

/// Key the submitted username is cached and stored under.
pub const USERNAME_KEY: &str = "username";

/// A form state a [`FormComponent`] can drive.
pub trait FormModel: Clone + Default + Serialize + DeserializeOwned + Send + 'static {
    /// Name used in logs.
    const NAME: &'static str;

    /// Applies one dispatch through the form's reducer.
    fn reduce(self, dispatch: &Dispatch) -> Self;

    /// Where this form submits.
    fn endpoint(endpoints: &EndpointSettings) -> &str;

    /// Credentials to submit, or the first rule they break.
    fn credentials(&self) -> ValidationResult<Credentials>;

    fn safe_error(&self) -> Option<&AppError>;

    fn is_loading(&self) -> bool;
}

/// A mounted credential form.
#[derive(Debug)]
pub struct FormComponent<S: FormModel> {
    state: S,
    workers: FormWorkers,
    services: Arc<FormServices>,
    reporter: BoundaryState,
    mounted: bool,
}

impl<S: FormModel> FormComponent<S> {
    /// Mounts the form and spawns its workers. Requires a tokio runtime.
    pub fn mount(initial: S, services: Arc<FormServices>, reporter: BoundaryState) -> Self {
        let workers = FormWorkers::spawn(&services);
        Self::with_workers(initial, services, reporter, workers)
    }

    /// Mounts the form over already-spawned workers.
    pub fn with_workers(
        initial: S,
        services: Arc<FormServices>,
        reporter: BoundaryState,
        workers: FormWorkers,
    ) -> Self {
        let component = FormComponent {
            state: initial,
            workers,
            services,
            reporter,
            mounted: true,
        };
        component.report();
        info!(form = S::NAME, "Form mounted");
        component
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Runs `dispatch` through the reducer and reports the result.
    pub fn dispatch(&mut self, dispatch: Dispatch) {
        let current = std::mem::take(&mut self.state);
        self.state = current.reduce(&dispatch);
        self.report();
    }

    pub fn set_username(&mut self, username: impl Into<String>) {
        self.dispatch(FormAction::SetUsername.with(username.into()));
    }

    pub fn set_password(&mut self, password: impl Into<String>) {
        self.dispatch(FormAction::SetPassword.with(password.into()));
    }

    /// Submits the current credentials.
    ///
    /// Caches and stores the username, then posts the credentials to the
    /// form's endpoint. Delivery failures are recorded as the safe error.
    ///
    /// ## Errors
    /// The first credential rule broken. Nothing is sent in that case.
    pub fn submit(&mut self) -> ValidationResult<()> {
        let credentials = self.state.credentials()?;
        info!(form = S::NAME, username = %credentials.username, "Submitting credentials");

        self.dispatch(FormAction::SetIsLoading.with(true));

        let url = S::endpoint(&self.services.endpoints).to_string();
        let username = credentials.username.clone();

        let sent = [
            send_message_to_worker(
                self.workers.cache.as_ref(),
                Envelope::set(USERNAME_KEY, username.clone()),
            ),
            send_message_to_worker(
                self.workers.storage.as_ref(),
                Envelope::set(USERNAME_KEY, username),
            ),
            RequestInit::post_json(&credentials).and_then(|init| {
                send_message_to_worker(self.workers.fetch.as_ref(), FetchRequest::new(url, init))
            }),
        ];

        for failure in sent.into_iter().filter_map(Result::err) {
            self.record_failure(failure);
        }

        Ok(())
    }

    /// Applies every reply already waiting. Returns how many were applied.
    pub fn process_replies(&mut self) -> usize {
        let mut applied = 0;
        while let Some(reply) = self.workers.try_next_reply() {
            self.apply_reply(reply);
            applied += 1;
        }
        applied
    }

    /// Waits for one reply and applies it.
    ///
    /// Returns which worker answered, or `None` once all workers are gone.
    pub async fn next_reply(&mut self) -> Option<WorkerKind> {
        let reply = self.workers.next_reply().await?;
        let worker = reply.worker;
        self.apply_reply(reply);
        Some(worker)
    }

    /// Waits until the fetch worker has answered.
    pub async fn settle(&mut self) -> Option<()> {
        loop {
            if self.next_reply().await? == WorkerKind::Fetch {
                return Some(());
            }
        }
    }

    /// The state, or the safe error if one is set.
    pub fn render(&self) -> Result<&S, AppError> {
        match self.state.safe_error() {
            Some(err) => Err(err.clone()),
            None => Ok(&self.state),
        }
    }

    /// Terminates the workers. Replies still in flight are ignored.
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.workers.terminate_all();
        self.mounted = false;
        info!(form = S::NAME, "Form unmounted");
    }

    fn apply_reply(&mut self, reply: WorkerReply) {
        if !self.mounted {
            debug!(form = S::NAME, worker = %reply.worker, "Ignoring reply after unmount");
            return;
        }

        match (reply.worker, reply.result) {
            (_, Err(err)) => self.record_failure(err),
            (WorkerKind::Fetch, Ok(body)) => {
                let records = match body {
                    Some(Value::Array(items)) => Value::Array(items),
                    Some(record) => Value::Array(vec![record]),
                    None => Value::Null,
                };
                self.dispatch(FormAction::SetResponseDataMaybe.with(records));
                self.dispatch(FormAction::SetIsLoading.with(false));
                info!(form = S::NAME, "Submission completed");
            }
            (worker, Ok(_)) => {
                debug!(form = S::NAME, worker = %worker, "Worker acknowledged");
            }
        }
    }

    fn record_failure(&mut self, err: AppError) {
        error!(form = S::NAME, kind = %err.kind, error = %err.message, "Form operation failed");

        match serde_json::to_value(&err) {
            Ok(payload) => self.dispatch(FormAction::SetSafeErrorMaybe.with(payload)),
            Err(e) => warn!(error = %e, "Failed to encode safe error"),
        }
        self.dispatch(FormAction::SetIsLoading.with(false));
    }

    fn report(&self) {
        if let Err(e) = self.reporter.report(&self.state) {
            warn!(form = S::NAME, error = %e, "Failed to report state to boundary");
        }
    }
}

impl<S: FormModel> BoundaryChild for FormComponent<S> {
    type State = S;

    fn mount(initial: S, services: Arc<FormServices>, reporter: BoundaryState) -> Self {
        FormComponent::mount(initial, services, reporter)
    }

    fn render(&self) -> Result<S, AppError> {
        FormComponent::render(self).cloned()
    }

    fn unmount(&mut self) {
        FormComponent::unmount(self)
    }
}
