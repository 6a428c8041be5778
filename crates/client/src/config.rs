//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `TANGELO_API_BASE_URL` - Base URL of the Tangelo REST backend
//!
//! ## Optional
//! - `TANGELO_DATA_DIR` - Directory for persisted local state (default: `.tangelo`)
//! - `TANGELO_API_TIMEOUT_SECS` - Request timeout in seconds (default: 10)

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Default request timeout for the REST client.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default directory for persisted local state.
const DEFAULT_DATA_DIR: &str = ".tangelo";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Commerce client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// REST backend configuration.
    pub api: ApiConfig,
    /// Directory for persisted local state (cart, wishlist, session slices).
    pub data_dir: PathBuf,
}

/// REST backend configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL of the backend (e.g., `https://api.tangelo.shop`).
    pub base_url: Url,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let base_url = parse_base_url(&get_required_env("TANGELO_API_BASE_URL")?)
            .map_err(|e| ConfigError::InvalidEnvVar("TANGELO_API_BASE_URL".to_string(), e))?;

        let timeout_secs = match get_optional_env("TANGELO_API_TIMEOUT_SECS") {
            Some(raw) => raw.parse::<u64>().map_err(|e| {
                ConfigError::InvalidEnvVar("TANGELO_API_TIMEOUT_SECS".to_string(), e.to_string())
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let data_dir = get_optional_env("TANGELO_DATA_DIR")
            .map_or_else(|| PathBuf::from(DEFAULT_DATA_DIR), PathBuf::from);

        Ok(Self {
            api: ApiConfig {
                base_url,
                timeout: Duration::from_secs(timeout_secs),
            },
            data_dir,
        })
    }
}

/// Parse and normalize the API base URL.
///
/// A trailing slash is required for `Url::join` to treat the last path
/// segment as a directory, so one is appended if missing.
fn parse_base_url(raw: &str) -> Result<Url, String> {
    let normalized = if raw.ends_with('/') {
        raw.to_owned()
    } else {
        format!("{raw}/")
    };
    let url = Url::parse(&normalized).map_err(|e| e.to_string())?;
    if url.cannot_be_a_base() {
        return Err("URL cannot be used as a base".to_string());
    }
    Ok(url)
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}
