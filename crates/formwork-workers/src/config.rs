//! # Worker Settings
//!
//! The `[workers]` section of the console configuration.
//!
//! ```toml
//! [workers]
//! fetch_timeout_ms = 15000
//! storage_timeout_ms = 10000
//!
//! [workers.retry]
//! backoff_factor = 2.0
//! retries = 3
//! delay_ms = 1000
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use formwork_core::AppError;

use crate::fetch::DEFAULT_FETCH_TIMEOUT;
use crate::retry::RetryOptions;
use crate::storage::DEFAULT_STORAGE_TIMEOUT;

/// Timeouts and retry policy for the background workers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerSettings {
    /// Budget for one fetch, retries included.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_ms: u64,

    /// Budget for one storage operation.
    #[serde(default = "default_storage_timeout")]
    pub storage_timeout_ms: u64,

    #[serde(default)]
    pub retry: RetryOptions,
}

fn default_fetch_timeout() -> u64 {
    DEFAULT_FETCH_TIMEOUT.as_millis() as u64
}

fn default_storage_timeout() -> u64 {
    DEFAULT_STORAGE_TIMEOUT.as_millis() as u64
}

impl Default for WorkerSettings {
    fn default() -> Self {
        WorkerSettings {
            fetch_timeout_ms: default_fetch_timeout(),
            storage_timeout_ms: default_storage_timeout(),
            retry: RetryOptions::default(),
        }
    }
}

impl WorkerSettings {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn storage_timeout(&self) -> Duration {
        Duration::from_millis(self.storage_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.fetch_timeout_ms == 0 {
            return Err(AppError::invariant("fetch_timeout_ms must be greater than 0"));
        }
        if self.storage_timeout_ms == 0 {
            return Err(AppError::invariant("storage_timeout_ms must be greater than 0"));
        }
        self.retry.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = WorkerSettings::default();
        assert_eq!(settings.fetch_timeout(), Duration::from_secs(15));
        assert_eq!(settings.storage_timeout(), Duration::from_secs(10));
        assert_eq!(settings.retry, RetryOptions::default());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_section_fills_defaults() {
        let settings: WorkerSettings =
            serde_json::from_str(r#"{"retry": {"retries": 5}}"#).unwrap();
        assert_eq!(settings.retry.retries, 5);
        assert_eq!(settings.retry.delay_ms, 1000);
        assert_eq!(settings.fetch_timeout_ms, 15000);
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let settings = WorkerSettings {
            storage_timeout_ms: 0,
            ..WorkerSettings::default()
        };
        assert!(settings.validate().is_err());
    }
}
