//! # Register Form
//!
//! Like the login form, but credentials must pass the username and password
//! rules before anything is sent, and the form tracks which input was last
//! active.

use formwork_core::forms::register;
use formwork_core::validation::ValidationResult;
use formwork_core::{ActiveInput, AppError, Credentials, Dispatch, FormAction, RegisterState};

use crate::components::form::{FormComponent, FormModel};
use crate::config::EndpointSettings;

pub type RegisterForm = FormComponent<RegisterState>;

impl FormModel for RegisterState {
    const NAME: &'static str = "register";

    fn reduce(self, dispatch: &Dispatch) -> Self {
        register::reduce(self, dispatch)
    }

    fn endpoint(endpoints: &EndpointSettings) -> &str {
        &endpoints.register_url
    }

    fn credentials(&self) -> ValidationResult<Credentials> {
        self.validated_credentials()
    }

    fn safe_error(&self) -> Option<&AppError> {
        self.safe_error.as_ref()
    }

    fn is_loading(&self) -> bool {
        self.is_loading
    }
}

impl RegisterForm {
    pub fn set_last_active_input(&mut self, input: ActiveInput) {
        self.dispatch(FormAction::SetLastActiveInput.with(input.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::testing::{ok_json, test_services_with_client, REGISTER_URL};
    use crate::state::BoundaryState;
    use formwork_core::ValidationError;
    use serde_json::json;

    #[tokio::test]
    async fn test_invalid_credentials_send_nothing() {
        let (services, client) = test_services_with_client(vec![]);
        let mut form =
            RegisterForm::mount(RegisterState::default(), services, BoundaryState::new());

        form.set_username("al");
        form.set_password("Sup3r$ecret");

        let err = form.submit().unwrap_err();
        assert_eq!(
            err,
            ValidationError::TooShort {
                field: "username".into(),
                min: 3
            }
        );

        assert!(!form.state().is_loading);
        assert_eq!(form.process_replies(), 0);
        assert!(client.requests().is_empty());

        form.unmount();
    }

    #[tokio::test]
    async fn test_weak_password_is_rejected() {
        let (services, _client) = test_services_with_client(vec![]);
        let mut form =
            RegisterForm::mount(RegisterState::default(), services, BoundaryState::new());

        form.set_username("alice");
        form.set_password("password");

        assert!(form.submit().is_err());
        form.unmount();
    }

    #[tokio::test]
    async fn test_valid_credentials_post_to_register_endpoint() {
        let record = json!({"userId": 2, "id": 3, "title": "t", "body": "b"});
        let (services, client) = test_services_with_client(vec![ok_json(json!([record]))]);
        let mut form =
            RegisterForm::mount(RegisterState::default(), services, BoundaryState::new());

        form.set_username("alice");
        form.set_password("Sup3r$ecret");
        form.submit().unwrap();
        form.settle().await.unwrap();

        assert_eq!(client.requests()[0].0, REGISTER_URL);
        assert_eq!(form.state().response_data.as_ref().map(Vec::len), Some(1));
        assert!(form.render().is_ok());

        form.unmount();
    }

    #[tokio::test]
    async fn test_last_active_input_is_tracked() {
        let (services, _client) = test_services_with_client(vec![]);
        let mut form =
            RegisterForm::mount(RegisterState::default(), services, BoundaryState::new());

        assert_eq!(form.state().last_active_input, ActiveInput::Username);
        form.set_last_active_input(ActiveInput::Password);
        assert_eq!(form.state().last_active_input, ActiveInput::Password);

        form.unmount();
    }
}
