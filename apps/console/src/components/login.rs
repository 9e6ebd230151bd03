//! # Login Form
//!
//! Submits credentials as entered; the server decides whether they are good.

use formwork_core::forms::login;
use formwork_core::validation::ValidationResult;
use formwork_core::{AppError, Credentials, Dispatch, LoginState};

use crate::components::form::{FormComponent, FormModel};
use crate::config::EndpointSettings;

pub type LoginForm = FormComponent<LoginState>;

impl FormModel for LoginState {
    const NAME: &'static str = "login";

    fn reduce(self, dispatch: &Dispatch) -> Self {
        login::reduce(self, dispatch)
    }

    fn endpoint(endpoints: &EndpointSettings) -> &str {
        &endpoints.login_url
    }

    fn credentials(&self) -> ValidationResult<Credentials> {
        Ok(Credentials {
            username: self.username.clone(),
            password: self.password.clone(),
        })
    }

    fn safe_error(&self) -> Option<&AppError> {
        self.safe_error.as_ref()
    }

    fn is_loading(&self) -> bool {
        self.is_loading
    }
}
