//! # formwork-core: Pure Form Logic
//!
//! Reducers, dispatch validation, the error taxonomy and credential rules
//! behind the login and registration forms, as pure functions with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Formwork Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 apps/console (form components)                  │   │
//! │  │    LoginForm ──► RegisterForm ──► ErrorBoundary                │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ reduce(state, dispatch)                │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ formwork-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   error   │  │ dispatch  │  │   forms   │  │ validation│  │   │
//! │  │   │ AppError  │  │  Reducer  │  │ LoginState│  │  username │  │   │
//! │  │   │ ErrorKind │  │  parse    │  │ Register  │  │  password │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO WORKERS • NO NETWORK • PURE FUNCTIONS            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │         formwork-workers / formwork-store (I/O layers)          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`error`] - `AppError` and its closed set of kinds
//! - [`result`] - Present/absent and success/failure helpers
//! - [`dispatch`] - Parse-then-apply dispatch validation and reducers
//! - [`forms`] - Login, register and error-boundary states
//! - [`validation`] - Username and password rules
//! - [`types`] - Wire types shared with the endpoints
//!
//! ## Example Usage
//!
//! ```rust
//! use formwork_core::dispatch::Dispatch;
//! use formwork_core::forms::login::{reduce, LoginState};
//!
//! let state = reduce(LoginState::default(), &Dispatch::new("setUsername", "alice"));
//! assert_eq!(state.username, "alice");
//!
//! // Invalid payloads are dropped.
//! let state = reduce(state, &Dispatch::new("setIsLoading", "yes"));
//! assert!(!state.is_loading);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod dispatch;
pub mod error;
pub mod forms;
pub mod result;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use dispatch::{parse_dispatch, parse_dispatch_and_set_state, Dispatch, Reducer};
pub use error::{AppError, ErrorKind, ValidationError};
pub use forms::boundary::{ErrorBoundaryAction, ErrorBoundaryState};
pub use forms::login::LoginState;
pub use forms::register::RegisterState;
pub use forms::{CredentialForm, FormAction};
pub use result::{absent, failure, success, success_json, AppResult, AppResultExt};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Minimum username length accepted by the register form.
pub const MIN_USERNAME_LENGTH: usize = 3;

/// Minimum password length accepted by the register form.
pub const MIN_PASSWORD_LENGTH: usize = 8;
