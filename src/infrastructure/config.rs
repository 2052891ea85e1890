//! Configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! - `API_URL_GENOME`: Base URL of the upstream profile service (username is appended)
//! - `API_URL_SEARCH`: Full URL of the upstream search service
//! - `UPSTREAM_TIMEOUT_MS`: Per-request upstream timeout (default: 10000)
//! - `UPSTREAM_USER_AGENT`: User agent sent upstream (default: `profile-search/<version>`)
//! - `HOST`: Server host address (default: `0.0.0.0`)
//! - `PORT`: Server port (default: `3000`)
//! - `LOG_FORMAT`: `text` (default) | `json`
//! - `WORKER_THREADS`: Tokio worker threads (default: logical CPU count)
//!
//! Empty values are treated as "not set". Missing upstream URLs are not a
//! startup error: the affected endpoint answers 500 per request instead.

use std::env::VarError;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Default upstream timeout in milliseconds.
pub const DEFAULT_UPSTREAM_TIMEOUT_MS: u64 = 10_000;

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

// =============================================================================
// Errors
// =============================================================================

/// Error type for environment variable parsing.
#[derive(Debug, Error)]
pub enum EnvParseError {
    /// Invalid u64 value.
    #[error("Invalid u64 value for {name}: {message} (got '{value}')")]
    InvalidU64 {
        /// Variable name.
        name: String,
        /// Error message.
        message: String,
        /// Actual value.
        value: String,
    },

    /// Invalid count value.
    #[error("Invalid count for {name}: {message} (got '{value}')")]
    InvalidCount {
        /// Variable name.
        name: String,
        /// Error message.
        message: String,
        /// Actual value.
        value: String,
    },

    /// Invalid port value.
    #[error("Invalid port value for {name}: {message} (got '{value}')")]
    InvalidPort {
        /// Variable name.
        name: String,
        /// Error message.
        message: String,
        /// Actual value.
        value: String,
    },
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable error.
    #[error("Environment variable error for {name}: {source}")]
    EnvVarError {
        /// Variable name.
        name: String,
        /// Underlying error.
        source: VarError,
    },

    /// Environment parsing error.
    #[error("Environment parsing error: {0}")]
    EnvParseError(#[from] EnvParseError),

    /// Unknown log format.
    #[error("Invalid LOG_FORMAT: expected 'text' or 'json', got '{0}'")]
    InvalidLogFormat(String),

    /// Timeout of zero would fail every upstream call.
    #[error("UPSTREAM_TIMEOUT_MS must be greater than 0")]
    ZeroTimeout,

    /// A runtime needs at least one worker thread.
    #[error("WORKER_THREADS must be greater than 0")]
    ZeroWorkerThreads,
}

// =============================================================================
// Upstream Configuration
// =============================================================================

/// Where and how to reach the upstream services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamConfig {
    /// Base URL of the profile service; the encoded username is appended.
    pub profile_base_url: Option<String>,
    /// Full URL of the search service.
    pub search_url: Option<String>,
    /// Timeout applied to each upstream request.
    pub timeout: Duration,
    /// User agent sent with forwarded requests.
    pub user_agent: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            profile_base_url: None,
            search_url: None,
            timeout: Duration::from_millis(DEFAULT_UPSTREAM_TIMEOUT_MS),
            user_agent: default_user_agent(),
        }
    }
}

impl UpstreamConfig {
    /// Loads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but not valid unicode, or if
    /// `UPSTREAM_TIMEOUT_MS` is not a positive integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name))
    }

    /// Loads the configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// See [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<String, VarError>,
    {
        let timeout_ms = parse_u64(&lookup, "UPSTREAM_TIMEOUT_MS", DEFAULT_UPSTREAM_TIMEOUT_MS)?;
        if timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        Ok(Self {
            profile_base_url: optional(&lookup, "API_URL_GENOME")?,
            search_url: optional(&lookup, "API_URL_SEARCH")?,
            timeout: Duration::from_millis(timeout_ms),
            user_agent: optional(&lookup, "UPSTREAM_USER_AGENT")?
                .unwrap_or_else(default_user_agent),
        })
    }

    /// Sets the profile base URL.
    #[must_use]
    pub fn with_profile_base_url(mut self, url: impl Into<String>) -> Self {
        self.profile_base_url = Some(url.into());
        self
    }

    /// Sets the search URL.
    #[must_use]
    pub fn with_search_url(mut self, url: impl Into<String>) -> Self {
        self.search_url = Some(url.into());
        self
    }
}

fn default_user_agent() -> String {
    format!("profile-search/{}", env!("CARGO_PKG_VERSION"))
}

// =============================================================================
// Server Configuration
// =============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "text" | "pretty" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::InvalidLogFormat(value.to_string())),
        }
    }
}

/// Listener and logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Log output format.
    pub log_format: LogFormat,
    /// Requested Tokio worker threads; `None` keeps the runtime default.
    pub worker_threads: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            log_format: LogFormat::Text,
            worker_threads: None,
        }
    }
}

impl ServerConfig {
    /// Loads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if `PORT`, `LOG_FORMAT` or `WORKER_THREADS` hold
    /// invalid values.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name))
    }

    /// Loads the configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// See [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<String, VarError>,
    {
        let defaults = Self::default();

        let port = match optional(&lookup, "PORT")? {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|e: std::num::ParseIntError| EnvParseError::InvalidPort {
                    name: "PORT".to_string(),
                    message: e.to_string(),
                    value,
                })?,
            None => defaults.port,
        };

        let log_format = match optional(&lookup, "LOG_FORMAT")? {
            Some(value) => value.parse()?,
            None => defaults.log_format,
        };

        let worker_threads = match optional(&lookup, "WORKER_THREADS")? {
            Some(value) => match value.trim().parse::<usize>() {
                Ok(0) => return Err(ConfigError::ZeroWorkerThreads),
                Ok(threads) => Some(threads),
                Err(e) => {
                    return Err(EnvParseError::InvalidCount {
                        name: "WORKER_THREADS".to_string(),
                        message: e.to_string(),
                        value,
                    }
                    .into());
                }
            },
            None => defaults.worker_threads,
        };

        Ok(Self {
            host: optional(&lookup, "HOST")?.unwrap_or(defaults.host),
            port,
            log_format,
            worker_threads,
        })
    }

    /// Returns the `host:port` pair to bind.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// =============================================================================
// Environment Variable Parsing
// =============================================================================

/// Reads an optional variable, treating blank values as unset.
fn optional<F>(lookup: &F, name: &str) -> Result<Option<String>, ConfigError>
where
    F: Fn(&str) -> Result<String, VarError>,
{
    match lookup(name) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(VarError::NotPresent) => Ok(None),
        Err(source) => Err(ConfigError::EnvVarError {
            name: name.to_string(),
            source,
        }),
    }
}

/// Parses a u64 from a variable.
///
/// Returns the default value if the variable is not set.
/// Returns an error if the variable is set but contains an invalid value.
fn parse_u64<F>(lookup: &F, name: &str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Result<String, VarError>,
{
    match optional(lookup, name)? {
        Some(value) => value.trim().parse().map_err(|e: std::num::ParseIntError| {
            ConfigError::from(EnvParseError::InvalidU64 {
                name: name.to_string(),
                message: e.to_string(),
                value,
            })
        }),
        None => Ok(default),
    }
}
