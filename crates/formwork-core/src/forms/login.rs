//! # Login State
//!
//! State and reducer behind the login form.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::{credential_reducer, CredentialForm};
use crate::dispatch::{Dispatch, Reducer};
use crate::error::AppError;
use crate::types::ResponseData;

/// Login form state.
///
/// Serialized with the field names the UI layer reports to the error
/// boundary (`username`, `isLoading`, `safeErrorMaybe`, ...). Missing fields
/// take their defaults so a partial snapshot still restores.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default, rename_all = "camelCase")]
pub struct LoginState {
    pub username: String,
    pub password: String,
    pub is_loading: bool,
    #[serde(rename = "safeErrorMaybe")]
    pub safe_error: Option<AppError>,
    #[serde(rename = "responseDataMaybe")]
    pub response_data: Option<Vec<ResponseData>>,
}

impl CredentialForm for LoginState {
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

/// Returns the login reducer.
pub fn login_reducer() -> &'static Reducer<LoginState> {
    static REDUCER: OnceLock<Reducer<LoginState>> = OnceLock::new();
    REDUCER.get_or_init(credential_reducer::<LoginState>)
}

/// Produces the next login state.
pub fn reduce(state: LoginState, dispatch: &Dispatch) -> LoginState {
    login_reducer().reduce(state, dispatch)
}

// =============================================================================
// Unit Tests
// =============================================================================
