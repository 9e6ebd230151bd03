//! # Envelope
//!
//! Request format for the cache and storage workers.
//!
//! ```text
//! { "kind": "get",     "payload": [key] }
//! { "kind": "set",     "payload": [key, value] }
//! { "kind": "remove",  "payload": [key] }
//! { "kind": "sendAll", "payload": [] }          (cache worker only)
//! ```
//!
//! An envelope is untrusted until [`Envelope::decode`] turns it into a
//! [`Request`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use formwork_core::AppError;

use crate::runtime::WorkerKind;

/// Untyped worker request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub kind: String,
    #[serde(default)]
    pub payload: Vec<Value>,
}

impl Envelope {
    pub fn new(kind: impl Into<String>, payload: Vec<Value>) -> Self {
        Envelope {
            kind: kind.into(),
            payload,
        }
    }

    pub fn get(key: impl Into<String>) -> Self {
        Self::new("get", vec![Value::String(key.into())])
    }

    pub fn set(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new("set", vec![Value::String(key.into()), value.into()])
    }

    pub fn remove(key: impl Into<String>) -> Self {
        Self::new("remove", vec![Value::String(key.into())])
    }

    pub fn send_all() -> Self {
        Self::new("sendAll", Vec::new())
    }

    /// Checks kind and arity.
    ///
    /// ## Errors
    /// `WorkerMessageError` naming `worker` for an unknown kind or a payload
    /// of the wrong length.
    pub fn decode(self, worker: WorkerKind) -> Result<Request, AppError> {
        let expected = match self.kind.as_str() {
            "get" | "remove" => 1,
            "set" => 2,
            "sendAll" => 0,
            other => {
                return Err(AppError::worker_message(format!(
                    "Unknown message kind in {} worker: '{}'",
                    worker, other
                )))
            }
        };

        if self.payload.len() != expected {
            return Err(AppError::worker_message(format!(
                "Invalid payload for '{}' in {} worker: expected {} item(s), got {}",
                self.kind,
                worker,
                expected,
                self.payload.len()
            )));
        }

        let mut items = self.payload.into_iter();
        let mut next = || items.next().unwrap_or(Value::Null);

        let request = match self.kind.as_str() {
            "get" => Request::Get(key_string(next())),
            "remove" => Request::Remove(key_string(next())),
            "set" => {
                let key = key_string(next());
                Request::Set(key, next())
            }
            _ => Request::SendAll,
        };

        Ok(request)
    }
}

/// A decoded envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Get(String),
    Set(String, Value),
    Remove(String),
    SendAll,
}

impl Request {
    pub fn kind(&self) -> &'static str {
        match self {
            Request::Get(_) => "get",
            Request::Set(..) => "set",
            Request::Remove(_) => "remove",
            Request::SendAll => "sendAll",
        }
    }
}

// Strings are used as-is; anything else by its JSON text.
fn key_string(key: Value) -> String {
    match key {
        Value::String(key) => key,
        other => other.to_string(),
    }
}
