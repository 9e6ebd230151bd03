//! # Console Error Type
//!
//! Errors raised by the application layer itself: configuration, startup,
//! shared state. Form and worker failures stay [`AppError`]s and travel
//! through form state instead.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  formwork.toml ──► ConsoleConfig::load ──► ConsoleError::Config        │
//! │                                                                         │
//! │  Database::new ──► StoreError ──────────► ConsoleError::Store          │
//! │                                                                         │
//! │  worker reply ──► AppError ──► setSafeErrorMaybe ──► ErrorBoundary     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use formwork_core::AppError;
use formwork_store::StoreError;

/// Application-layer error.
#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Failed to write config file: {0}")]
    ConfigWrite(String),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    App(#[from] AppError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Shared state lock poisoned: {0}")]
    StatePoisoned(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ConsoleResult<T> = Result<T, ConsoleError>;

/// Machine-readable category for [`ConsoleError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ConfigError,
    StorageError,
    FormError,
    Internal,
}

impl ConsoleError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ConsoleError::Config(_)
            | ConsoleError::ConfigRead { .. }
            | ConsoleError::ConfigParse(_)
            | ConsoleError::ConfigWrite(_) => ErrorCode::ConfigError,
            ConsoleError::Store(_) => ErrorCode::StorageError,
            ConsoleError::App(_) => ErrorCode::FormError,
            ConsoleError::Serialization(_)
            | ConsoleError::StatePoisoned(_)
            | ConsoleError::Io(_) => ErrorCode::Internal,
        }
    }

    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self.code() {
            ErrorCode::ConfigError => 78,
            ErrorCode::StorageError => 74,
            ErrorCode::FormError => 1,
            ErrorCode::Internal => 70,
        }
    }
}

impl From<toml::ser::Error> for ConsoleError {
    fn from(err: toml::ser::Error) -> Self {
        ConsoleError::ConfigWrite(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(ConsoleError::Config("x".into()).code(), ErrorCode::ConfigError);
        assert_eq!(
            ConsoleError::Store(StoreError::PoolExhausted).code(),
            ErrorCode::StorageError
        );
        assert_eq!(
            ConsoleError::App(AppError::network("down")).code(),
            ErrorCode::FormError
        );
        assert_eq!(ConsoleError::StatePoisoned("boundary").exit_code(), 70);
    }

    #[test]
    fn test_app_error_is_transparent() {
        let err = ConsoleError::from(AppError::network("down"));
        assert_eq!(err.to_string(), "NetworkError: down");
    }

    #[test]
    fn test_code_serialization() {
        let json = serde_json::to_string(&ErrorCode::ConfigError).unwrap();
        assert_eq!(json, "\"CONFIG_ERROR\"");
    }
}
