//! # Error Types
//!
//! The tagged error taxonomy shared by reducers, workers and components.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  formwork-core errors (this file)                                      │
//! │  ├── AppError         - Tagged error carried across every boundary     │
//! │  │   └── ErrorKind    - Closed set of tags (AuthError ... UnknownError)│
//! │  └── ValidationError  - Credential rule failures                       │
//! │                                                                         │
//! │  formwork-store errors (separate crate)                                │
//! │  └── StoreError       - SQLite key-value failures                      │
//! │                                                                         │
//! │  console errors (in app)                                               │
//! │  └── ConsoleError     - Startup / configuration failures               │
//! │                                                                         │
//! │  Flow: ValidationError → AppError → Failure reply → safeErrorMaybe     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Shape
//! Every `AppError` carries a kind tag, a human message, the kind of the
//! underlying error (`"UnknownError"` when there is none), stack text, an
//! optional HTTP-like status, and a UTC timestamp. Errors are values: they
//! serialize into reducer state and across worker channels.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

/// Stack text used when no backtrace could be captured.
pub const STACK_UNAVAILABLE: &str = "Stack trace not available";

/// Kind recorded when an error has no underlying cause.
pub const UNKNOWN_ORIGINAL: &str = "UnknownError";

// =============================================================================
// Error Kind
// =============================================================================

/// Closed set of error tags.
///
/// Serialized as the tag string (`"NetworkError"`, `"WorkerMessageError"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ErrorKind {
    #[serde(rename = "AuthError")]
    Auth,
    #[serde(rename = "ValidationError")]
    Validation,
    #[serde(rename = "DatabaseError")]
    Database,
    #[serde(rename = "NotFoundError")]
    NotFound,
    #[serde(rename = "NetworkError")]
    Network,
    #[serde(rename = "TokenCreationError")]
    TokenCreation,
    #[serde(rename = "TokenDecodeError")]
    TokenDecode,
    #[serde(rename = "TokenVerificationError")]
    TokenVerification,
    #[serde(rename = "TokenSignatureError")]
    TokenSignature,
    #[serde(rename = "TimeoutError")]
    Timeout,
    #[serde(rename = "PromiseRejectionError")]
    PromiseRejection,
    #[serde(rename = "PromiseAbortedError")]
    PromiseAborted,
    #[serde(rename = "RetryLimitExceededError")]
    RetryLimitExceeded,
    #[serde(rename = "HashComparisonError")]
    HashComparison,
    #[serde(rename = "HashGenerationError")]
    HashGeneration,
    #[serde(rename = "AbortError")]
    Abort,
    #[serde(rename = "CacheError")]
    Cache,
    #[serde(rename = "JSONError")]
    Json,
    #[serde(rename = "ParseError")]
    Parse,
    #[serde(rename = "InvariantError")]
    Invariant,
    #[serde(rename = "HTTPError")]
    Http,
    #[serde(rename = "WorkerError")]
    Worker,
    #[serde(rename = "WorkerMessageError")]
    WorkerMessage,
    #[serde(rename = "WorkerMessageHandlerError")]
    WorkerMessageHandler,
    #[serde(rename = "UnknownError")]
    Unknown,
}

impl ErrorKind {
    /// Every kind, in declaration order.
    pub const ALL: [ErrorKind; 25] = [
        ErrorKind::Auth,
        ErrorKind::Validation,
        ErrorKind::Database,
        ErrorKind::NotFound,
        ErrorKind::Network,
        ErrorKind::TokenCreation,
        ErrorKind::TokenDecode,
        ErrorKind::TokenVerification,
        ErrorKind::TokenSignature,
        ErrorKind::Timeout,
        ErrorKind::PromiseRejection,
        ErrorKind::PromiseAborted,
        ErrorKind::RetryLimitExceeded,
        ErrorKind::HashComparison,
        ErrorKind::HashGeneration,
        ErrorKind::Abort,
        ErrorKind::Cache,
        ErrorKind::Json,
        ErrorKind::Parse,
        ErrorKind::Invariant,
        ErrorKind::Http,
        ErrorKind::Worker,
        ErrorKind::WorkerMessage,
        ErrorKind::WorkerMessageHandler,
        ErrorKind::Unknown,
    ];

    /// Returns the tag string.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Auth => "AuthError",
            ErrorKind::Validation => "ValidationError",
            ErrorKind::Database => "DatabaseError",
            ErrorKind::NotFound => "NotFoundError",
            ErrorKind::Network => "NetworkError",
            ErrorKind::TokenCreation => "TokenCreationError",
            ErrorKind::TokenDecode => "TokenDecodeError",
            ErrorKind::TokenVerification => "TokenVerificationError",
            ErrorKind::TokenSignature => "TokenSignatureError",
            ErrorKind::Timeout => "TimeoutError",
            ErrorKind::PromiseRejection => "PromiseRejectionError",
            ErrorKind::PromiseAborted => "PromiseAbortedError",
            ErrorKind::RetryLimitExceeded => "RetryLimitExceededError",
            ErrorKind::HashComparison => "HashComparisonError",
            ErrorKind::HashGeneration => "HashGenerationError",
            ErrorKind::Abort => "AbortError",
            ErrorKind::Cache => "CacheError",
            ErrorKind::Json => "JSONError",
            ErrorKind::Parse => "ParseError",
            ErrorKind::Invariant => "InvariantError",
            ErrorKind::Http => "HTTPError",
            ErrorKind::Worker => "WorkerError",
            ErrorKind::WorkerMessage => "WorkerMessageError",
            ErrorKind::WorkerMessageHandler => "WorkerMessageHandlerError",
            ErrorKind::Unknown => "UnknownError",
        }
    }

    /// Message used when a caller does not supply one.
    pub const fn default_message(&self) -> &'static str {
        match self {
            ErrorKind::Auth => "Authentication error occurred",
            ErrorKind::Validation => "Validation error occurred",
            ErrorKind::Database => "Database error occurred",
            ErrorKind::NotFound => "Resource not found",
            ErrorKind::Network => "Network error occurred",
            ErrorKind::TokenCreation => "Token creation error occurred",
            ErrorKind::TokenDecode => "Token decoding error occurred",
            ErrorKind::TokenVerification => "Token verification error occurred",
            ErrorKind::TokenSignature => "Token signature error occurred",
            ErrorKind::Timeout => "Operation timed out",
            ErrorKind::PromiseRejection => "Unhandled promise rejection",
            ErrorKind::PromiseAborted => "Operation was aborted before completion",
            ErrorKind::RetryLimitExceeded => "Retry limit exceeded",
            ErrorKind::HashComparison => "Hash comparison error occurred",
            ErrorKind::HashGeneration => "Hash generation error occurred",
            ErrorKind::Abort => "Operation was aborted",
            ErrorKind::Cache => "Cache error occurred",
            ErrorKind::Json => "JSON error occurred",
            ErrorKind::Parse => "Parse error occurred",
            ErrorKind::Invariant => "Invariant error occurred",
            ErrorKind::Http => "HTTP error occurred",
            ErrorKind::Worker => "Worker error occurred",
            ErrorKind::WorkerMessage => "Worker message error occurred",
            ErrorKind::WorkerMessageHandler => "Worker message handler error occurred",
            ErrorKind::Unknown => "An unknown error occurred",
        }
    }

    /// Status attached when a caller does not supply one.
    ///
    /// Only storage and transport failures carry a status by default.
    pub const fn default_status(&self) -> Option<u16> {
        match self {
            ErrorKind::Database => Some(500),
            ErrorKind::Network => Some(503),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ErrorKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| AppError::invariant(format!("Unknown error kind: '{}'", s)))
    }
}

// =============================================================================
// App Error
// =============================================================================

/// A tagged, serializable error value.
///
/// ## Construction
/// ```rust
/// use formwork_core::error::{AppError, ErrorKind};
///
/// let err = AppError::network("Max retries reached");
/// assert_eq!(err.kind, ErrorKind::Network);
/// assert_eq!(err.status, Some(503));
///
/// let err = AppError::from_kind(ErrorKind::Cache);
/// assert_eq!(err.message, "Cache error occurred");
/// ```
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
#[error("{kind}: {message}")]
pub struct AppError {
    /// Tag of this error.
    pub kind: ErrorKind,

    /// Human-readable message.
    pub message: String,

    /// Kind of the underlying error, `"UnknownError"` when none was given.
    #[serde(rename = "errorKind")]
    pub original: String,

    /// Captured stack text.
    pub stack: String,

    /// HTTP-like status, present for transport and storage failures.
    pub status: Option<u16>,

    /// When the error was constructed.
    #[ts(as = "String")]
    pub timestamp: DateTime<Utc>,
}

macro_rules! kind_constructors {
    ($($(#[$doc:meta])* $name:ident => $kind:ident),* $(,)?) => {
        $(
            $(#[$doc])*
            pub fn $name(message: impl Into<String>) -> Self {
                AppError::new(ErrorKind::$kind, message)
            }
        )*
    };
}

impl AppError {
    /// Creates an error of `kind` with the kind's default status.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        AppError {
            kind,
            message: message.into(),
            original: UNKNOWN_ORIGINAL.to_string(),
            stack: capture_stack(),
            status: kind.default_status(),
            timestamp: Utc::now(),
        }
    }

    /// Creates an error of `kind` with its default message.
    pub fn from_kind(kind: ErrorKind) -> Self {
        AppError::new(kind, kind.default_message())
    }

    kind_constructors! {
        auth => Auth,
        validation => Validation,
        database => Database,
        not_found => NotFound,
        /// Network failure; carries status 503 unless overridden.
        network => Network,
        token_creation => TokenCreation,
        token_decode => TokenDecode,
        token_verification => TokenVerification,
        token_signature => TokenSignature,
        timeout => Timeout,
        promise_rejection => PromiseRejection,
        /// An abortable operation was cancelled by its signal.
        promise_aborted => PromiseAborted,
        retry_limit_exceeded => RetryLimitExceeded,
        hash_comparison => HashComparison,
        hash_generation => HashGeneration,
        abort => Abort,
        cache => Cache,
        json => Json,
        parse => Parse,
        invariant => Invariant,
        http => Http,
        worker => Worker,
        /// A message could not be delivered to, or was rejected by, a worker.
        worker_message => WorkerMessage,
        worker_message_handler => WorkerMessageHandler,
        unknown => Unknown,
    }

    /// Records `source` as the underlying error.
    ///
    /// The source's type name becomes `original` and its text is appended to
    /// the message.
    pub fn with_source<E>(mut self, source: &E) -> Self
    where
        E: std::error::Error + ?Sized,
    {
        self.original = short_type_name::<E>().to_string();
        self.message = format!("{}: {}", self.message, source);
        self
    }

    /// Records an underlying error that is itself an `AppError`.
    pub fn caused_by(mut self, cause: &AppError) -> Self {
        self.original = cause.kind.as_str().to_string();
        self.message = format!("{}: {}", self.message, cause.message);
        self
    }

    /// Overrides the status.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Returns true if the error carries `kind`.
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::validation(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::from_kind(ErrorKind::Json).with_source(&err)
    }
}

fn capture_stack() -> String {
    let backtrace = Backtrace::capture();
    match backtrace.status() {
        BacktraceStatus::Captured => backtrace.to_string(),
        _ => STACK_UNAVAILABLE.to_string(),
    }
}

fn short_type_name<E: ?Sized>() -> &'static str {
    let full = std::any::type_name::<E>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

// =============================================================================
// Validation Error
// =============================================================================

/// Credential validation errors.
///
/// Produced by [`crate::validation`] before a form submits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Invalid format (character set, placement).
    #[error("{field} {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A required character class is absent.
    #[error("{field} must contain at least one {requirement}")]
    MissingCharacter { field: String, requirement: String },
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_has_tag_and_message() {
        for kind in ErrorKind::ALL {
            let err = AppError::from_kind(kind);
            assert!(!err.kind.as_str().is_empty());
            assert!(!err.message.is_empty());
            assert_eq!(err.original, UNKNOWN_ORIGINAL);
        }
    }

    #[test]
    fn test_status_only_for_http_like_kinds() {
        assert_eq!(AppError::network("down").status, Some(503));
        assert_eq!(AppError::database("locked").status, Some(500));
        assert_eq!(AppError::cache("miss").status, None);
        assert_eq!(AppError::http("teapot").with_status(418).status, Some(418));
    }

    #[test]
    fn test_kind_round_trips_through_str() {
        for kind in ErrorKind::ALL {
            assert_eq!(kind.as_str().parse::<ErrorKind>().unwrap(), kind);
        }
        assert!("NotAKind".parse::<ErrorKind>().is_err());
    }

    #[test]
    fn test_serialized_shape() {
        let err = AppError::worker_message("No data received in cache worker message");
        let json = serde_json::to_value(&err).unwrap();

        assert_eq!(json["kind"], "WorkerMessageError");
        assert_eq!(json["errorKind"], "UnknownError");
        assert!(json["status"].is_null());
        assert!(json["timestamp"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn test_with_source_records_original_kind() {
        let parse_err = serde_json::from_str::<bool>("nope").unwrap_err();
        let err = AppError::parse("Could not decode body").with_source(&parse_err);

        assert_eq!(err.original, "Error");
        assert!(err.message.starts_with("Could not decode body: "));
    }

    #[test]
    fn test_display_includes_tag() {
        let err = AppError::timeout("storage get timed out");
        assert_eq!(err.to_string(), "TimeoutError: storage get timed out");
    }

    #[test]
    fn test_validation_converts_to_app_error() {
        let err: AppError = ValidationError::TooShort {
            field: "password".to_string(),
            min: 8,
        }
        .into();

        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(err.message, "password must be at least 8 characters");
    }
}
