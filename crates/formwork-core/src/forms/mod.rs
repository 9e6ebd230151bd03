//! # Form States
//!
//! Per-feature states and their reducers.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Feature          State                Actions                          │
//! │  ───────────────  ───────────────────  ───────────────────────────────  │
//! │  login            LoginState           setUsername, setPassword,        │
//! │                                        setIsLoading, setSafeErrorMaybe, │
//! │                                        setResponseDataMaybe             │
//! │  register         RegisterState        (login actions) +                │
//! │                                        setLastActiveInput               │
//! │  error boundary   ErrorBoundaryState   setChildComponentState           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Worker handles are not part of any state here: the component that spawns
//! the workers owns them, so states stay plain serializable values that the
//! error boundary can snapshot and restore.

pub mod boundary;
pub mod login;
pub mod register;

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::dispatch::{parse_dispatch_and_set_state, Dispatch, Reducer};
use crate::error::AppError;
use crate::types::ResponseData;

// =============================================================================
// Form Actions
// =============================================================================

/// Action tags understood by the credential forms.
///
/// `SetLastActiveInput` is only registered by the register reducer; sent to
/// the login reducer it is an unknown action and leaves state unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormAction {
    SetUsername,
    SetPassword,
    SetIsLoading,
    SetSafeErrorMaybe,
    SetResponseDataMaybe,
    SetLastActiveInput,
}

impl FormAction {
    pub const fn as_str(&self) -> &'static str {
        match self {
            FormAction::SetUsername => "setUsername",
            FormAction::SetPassword => "setPassword",
            FormAction::SetIsLoading => "setIsLoading",
            FormAction::SetSafeErrorMaybe => "setSafeErrorMaybe",
            FormAction::SetResponseDataMaybe => "setResponseDataMaybe",
            FormAction::SetLastActiveInput => "setLastActiveInput",
        }
    }

    /// Builds a dispatch for this action.
    pub fn with(self, payload: impl Into<Value>) -> Dispatch {
        Dispatch::new(self.as_str(), payload)
    }
}

impl fmt::Display for FormAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormAction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "setUsername" => Ok(FormAction::SetUsername),
            "setPassword" => Ok(FormAction::SetPassword),
            "setIsLoading" => Ok(FormAction::SetIsLoading),
            "setSafeErrorMaybe" => Ok(FormAction::SetSafeErrorMaybe),
            "setResponseDataMaybe" => Ok(FormAction::SetResponseDataMaybe),
            "setLastActiveInput" => Ok(FormAction::SetLastActiveInput),
            other => Err(AppError::validation(format!("Unknown form action: '{}'", other))),
        }
    }
}

// =============================================================================
// Credential Form
// =============================================================================

/// Field access shared by the login and register states.
pub trait CredentialForm: Sized + 'static {
    fn username_mut(&mut self) -> &mut String;
    fn password_mut(&mut self) -> &mut String;
    fn is_loading_mut(&mut self) -> &mut bool;
    fn safe_error_mut(&mut self) -> &mut Option<AppError>;
    fn response_data_mut(&mut self) -> &mut Option<Vec<ResponseData>>;
}

/// Registers the handlers common to every credential form.
pub(crate) fn credential_reducer<S: CredentialForm>() -> Reducer<S> {
    Reducer::new()
        .on(FormAction::SetUsername.as_str(), set_username::<S>)
        .on(FormAction::SetPassword.as_str(), set_password::<S>)
        .on(FormAction::SetIsLoading.as_str(), set_is_loading::<S>)
        .on(FormAction::SetSafeErrorMaybe.as_str(), set_safe_error::<S>)
        .on(FormAction::SetResponseDataMaybe.as_str(), set_response_data::<S>)
}

fn set_username<S: CredentialForm>(state: S, dispatch: &Dispatch) -> S {
    parse_dispatch_and_set_state(
        state,
        dispatch,
        FormAction::SetUsername.as_str(),
        |mut s: S, v: String| {
            *s.username_mut() = v;
            s
        },
    )
}

fn set_password<S: CredentialForm>(state: S, dispatch: &Dispatch) -> S {
    parse_dispatch_and_set_state(
        state,
        dispatch,
        FormAction::SetPassword.as_str(),
        |mut s: S, v: String| {
            *s.password_mut() = v;
            s
        },
    )
}

fn set_is_loading<S: CredentialForm>(state: S, dispatch: &Dispatch) -> S {
    parse_dispatch_and_set_state(
        state,
        dispatch,
        FormAction::SetIsLoading.as_str(),
        |mut s: S, v: bool| {
            *s.is_loading_mut() = v;
            s
        },
    )
}

// `null` is a valid payload here: it clears the error.
fn set_safe_error<S: CredentialForm>(state: S, dispatch: &Dispatch) -> S {
    parse_dispatch_and_set_state(
        state,
        dispatch,
        FormAction::SetSafeErrorMaybe.as_str(),
        |mut s: S, v: Option<AppError>| {
            *s.safe_error_mut() = v;
            s
        },
    )
}

fn set_response_data<S: CredentialForm>(state: S, dispatch: &Dispatch) -> S {
    parse_dispatch_and_set_state(
        state,
        dispatch,
        FormAction::SetResponseDataMaybe.as_str(),
        |mut s: S, v: Option<Vec<ResponseData>>| {
            *s.response_data_mut() = v;
            s
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_tags_round_trip() {
        for action in [
            FormAction::SetUsername,
            FormAction::SetPassword,
            FormAction::SetIsLoading,
            FormAction::SetSafeErrorMaybe,
            FormAction::SetResponseDataMaybe,
            FormAction::SetLastActiveInput,
        ] {
            assert_eq!(action.as_str().parse::<FormAction>().unwrap(), action);
        }
        assert!("setEmail".parse::<FormAction>().is_err());
    }
}
