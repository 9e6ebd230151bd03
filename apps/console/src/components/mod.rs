//! Form components and the error boundary that hosts them.

pub mod boundary;
pub mod form;
pub mod login;
pub mod register;
pub mod workers;

#[cfg(test)]
pub(crate) mod testing;

pub use boundary::{BoundaryChild, BoundaryPhase, BoundaryView, ErrorBoundary};
pub use form::{FormComponent, FormModel, USERNAME_KEY};
pub use login::LoginForm;
pub use register::RegisterForm;
pub use workers::{send_message_to_worker, FormServices, FormWorkers};
