//! # Shared Types
//!
//! Wire types exchanged with the authentication endpoints.
//!
//! ```text
//! ┌─────────────────────────┐          ┌───────────────────────────────┐
//! │      Credentials        │  POST    │         ResponseData          │
//! │  ─────────────────────  │ ───────► │  ───────────────────────────  │
//! │  username               │          │  userId, id, title, body      │
//! │  password               │          │  (decoded element-wise)       │
//! └─────────────────────────┘          └───────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Body sent by the login and register forms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// One record returned by the authentication endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ResponseData {
    pub user_id: i64,
    pub id: i64,
    pub title: String,
    pub body: String,
}

/// Which credential input the user last touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum ActiveInput {
    #[default]
    Username,
    Password,
}

impl std::fmt::Display for ActiveInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActiveInput::Username => write!(f, "username"),
            ActiveInput::Password => write!(f, "password"),
        }
    }
}
