//! # Register State
//!
//! The register form carries everything the login form does, plus which
//! input the user touched last so focus survives an error-boundary reset.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::{credential_reducer, CredentialForm, FormAction};
use crate::dispatch::{parse_dispatch_and_set_state, Dispatch, Reducer};
use crate::error::AppError;
use crate::types::{ActiveInput, Credentials, ResponseData};
use crate::validation::{validate_password, validate_username, ValidationResult};

/// Register form state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default, rename_all = "camelCase")]
pub struct RegisterState {
    pub username: String,
    pub password: String,
    pub is_loading: bool,
    pub last_active_input: ActiveInput,
    #[serde(rename = "safeErrorMaybe")]
    pub safe_error: Option<AppError>,
    #[serde(rename = "responseDataMaybe")]
    pub response_data: Option<Vec<ResponseData>>,
}

impl RegisterState {
    /// Checks the credentials against the username and password rules.
    ///
    /// Returns the credentials to submit, or the first rule broken.
    pub fn validated_credentials(&self) -> ValidationResult<Credentials> {
        validate_username(&self.username)?;
        validate_password(&self.password)?;

        Ok(Credentials {
            username: self.username.clone(),
            password: self.password.clone(),
        })
    }
}

impl CredentialForm for RegisterState {
    fn username_mut(&mut self) -> &mut String {
        &mut self.username
    }

    fn password_mut(&mut self) -> &mut String {
        &mut self.password
    }

    fn is_loading_mut(&mut self) -> &mut bool {
        &mut self.is_loading
    }

    fn safe_error_mut(&mut self) -> &mut Option<AppError> {
        &mut self.safe_error
    }

    fn response_data_mut(&mut self) -> &mut Option<Vec<ResponseData>> {
        &mut self.response_data
    }
}

fn set_last_active_input(state: RegisterState, dispatch: &Dispatch) -> RegisterState {
    parse_dispatch_and_set_state(
        state,
        dispatch,
        FormAction::SetLastActiveInput.as_str(),
        |s: RegisterState, last_active_input: ActiveInput| RegisterState {
            last_active_input,
            ..s
        },
    )
}

/// Returns the register reducer.
pub fn register_reducer() -> &'static Reducer<RegisterState> {
    static REDUCER: OnceLock<Reducer<RegisterState>> = OnceLock::new();
    REDUCER.get_or_init(|| {
        credential_reducer::<RegisterState>()
            .on(FormAction::SetLastActiveInput.as_str(), set_last_active_input)
    })
}

/// Produces the next register state.
pub fn reduce(state: RegisterState, dispatch: &Dispatch) -> RegisterState {
    register_reducer().reduce(state, dispatch)
}
