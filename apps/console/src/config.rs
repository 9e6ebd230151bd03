//! # Console Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     FORMWORK_LOGIN_URL=https://auth.example.com/login                  │
//! │     FORMWORK_FETCH_TIMEOUT_MS=5000                                     │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/formwork/formwork.toml (Linux)                           │
//! │     ~/Library/Application Support/dev.formwork.formwork/ (macOS)       │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [workers]
//! fetch_timeout_ms = 15000
//! storage_timeout_ms = 10000
//!
//! [workers.retry]
//! backoff_factor = 2.0
//! retries = 3
//! delay_ms = 1000
//!
//! [storage]
//! database_path = "/var/lib/formwork/formwork.db"   # optional
//! in_memory = false
//!
//! [endpoints]
//! login_url = "https://jsonplaceholder.typicode.com/posts"
//! register_url = "https://jsonplaceholder.typicode.com/posts"
//! ```

use std::path::PathBuf;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use formwork_workers::WorkerSettings;

use crate::error::{ConsoleError, ConsoleResult};

const CONFIG_FILE: &str = "formwork.toml";
const DATABASE_FILE: &str = "formwork.db";

// =============================================================================
// Sections
// =============================================================================

/// `[storage]`: where the storage worker persists values.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Database file. Defaults to the platform data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,

    /// Keep everything in memory; nothing survives the process.
    #[serde(default)]
    pub in_memory: bool,
}

/// `[endpoints]`: where each form submits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointSettings {
    #[serde(default = "default_endpoint")]
    pub login_url: String,

    #[serde(default = "default_endpoint")]
    pub register_url: String,
}

fn default_endpoint() -> String {
    "https://jsonplaceholder.typicode.com/posts".to_string()
}

impl Default for EndpointSettings {
    fn default() -> Self {
        EndpointSettings {
            login_url: default_endpoint(),
            register_url: default_endpoint(),
        }
    }
}

// =============================================================================
// Console Configuration
// =============================================================================

/// Complete console configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConsoleConfig {
    #[serde(default)]
    pub workers: WorkerSettings,

    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub endpoints: EndpointSettings,
}

impl ConsoleConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (formwork.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConsoleResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path).map_err(|source| {
                    ConsoleError::ConfigRead {
                        path: path.clone(),
                        source,
                    }
                })?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns the default if loading fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConsoleResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ConsoleError::ConfigWrite("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConsoleResult<()> {
        self.workers
            .validate()
            .map_err(|e| ConsoleError::Config(e.message))?;

        for (name, value) in [
            ("login_url", &self.endpoints.login_url),
            ("register_url", &self.endpoints.register_url),
        ] {
            let parsed = Url::parse(value)
                .map_err(|e| ConsoleError::Config(format!("{} is not a valid URL: {}", name, e)))?;
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                return Err(ConsoleError::Config(format!(
                    "{} must use http or https, got: {}",
                    name, value
                )));
            }
        }

        Ok(())
    }

    /// Resolves the database file, creating its directory.
    ///
    /// Returns `None` when storage is in memory.
    pub fn database_path(&self) -> ConsoleResult<Option<PathBuf>> {
        if self.storage.in_memory {
            return Ok(None);
        }

        let path = match &self.storage.database_path {
            Some(path) => path.clone(),
            None => {
                let dirs = project_dirs().ok_or_else(|| {
                    ConsoleError::Config("Could not determine app data directory".into())
                })?;
                dirs.data_dir().join(DATABASE_FILE)
            }
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        Ok(Some(path))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("FORMWORK_LOGIN_URL") {
            debug!(url = %url, "Overriding login URL from environment");
            self.endpoints.login_url = url;
        }

        if let Ok(url) = std::env::var("FORMWORK_REGISTER_URL") {
            debug!(url = %url, "Overriding register URL from environment");
            self.endpoints.register_url = url;
        }

        if let Ok(path) = std::env::var("FORMWORK_DB_PATH") {
            self.storage.database_path = Some(PathBuf::from(path));
        }

        if let Ok(flag) = std::env::var("FORMWORK_IN_MEMORY") {
            match flag.to_lowercase().as_str() {
                "1" | "true" | "yes" => self.storage.in_memory = true,
                "0" | "false" | "no" => self.storage.in_memory = false,
                _ => warn!(value = %flag, "Unknown FORMWORK_IN_MEMORY value"),
            }
        }

        if let Some(ms) = env_u64("FORMWORK_FETCH_TIMEOUT_MS") {
            self.workers.fetch_timeout_ms = ms;
        }

        if let Some(ms) = env_u64("FORMWORK_STORAGE_TIMEOUT_MS") {
            self.workers.storage_timeout_ms = ms;
        }

        if let Some(retries) = env_u64("FORMWORK_RETRIES") {
            self.workers.retry.retries = retries.min(u32::MAX as u64) as u32;
        }

        if let Some(ms) = env_u64("FORMWORK_RETRY_DELAY_MS") {
            self.workers.retry.delay_ms = ms;
        }
    }

    fn default_config_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "formwork", "formwork")
}

fn env_u64(name: &str) -> Option<u64> {
    let raw = std::env::var(name).ok()?;
    match raw.parse::<u64>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(variable = name, value = %raw, "Ignoring non-numeric environment override");
            None
        }
    }
}
