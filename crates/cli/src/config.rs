//! Client configuration for `managerctl`.
//!
//! Values come from three layers, highest precedence first:
//!
//! 1. command-line flags (and their `MANAGER_*` environment variables, which
//!    clap folds into the flags);
//! 2. an optional JSON configuration file (`--config`);
//! 3. built-in defaults, which match the library defaults (unbounded deadline,
//!    no retry on failure, unbounded retry policy).
//!
//! The address and secret have no default; a missing one is a [`ConfigError`].

use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::ValueEnum;
use manager::{CallOptions, ManagerAddress, RetryPolicy, Secret, UNBOUNDED_DEADLINE};
use manager_http::HttpTransportConfig;
use serde::Deserialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Problems found while loading or resolving the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read config file {path}: {source}")]
    Read {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for [`FileConfig`].
    #[error("cannot parse config file {path}: {source}")]
    Parse {
        /// File that was being parsed.
        path: PathBuf,
        /// Underlying parse error.
        source: serde_json::Error,
    },

    /// A required value was given nowhere.
    #[error("missing {0}: set it in the config file, a flag, or the environment")]
    Missing(&'static str),

    /// A value is present but unusable.
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Name of the offending setting.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Contents of the JSON configuration file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub address: Option<String>,
    pub secret: Option<String>,
    pub deadline_secs: Option<u64>,
    pub retry_on_failure: Option<bool>,
    pub max_attempts: Option<u32>,
    pub backoff_ms: Option<u64>,
    pub accept_invalid_certs: Option<bool>,
    pub connect_timeout_secs: Option<u64>,
    pub log_format: Option<LogFormat>,
}

impl FileConfig {
    /// Reads and parses `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Values supplied on the command line or through the environment.
///
/// Boolean switches can only turn a setting on; use the config file to state
/// `false` explicitly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub address: Option<String>,
    pub secret: Option<String>,
    pub deadline_secs: Option<u64>,
    pub retry_on_failure: bool,
    pub max_attempts: Option<u32>,
    pub backoff_ms: Option<u64>,
    pub accept_invalid_certs: bool,
    pub log_format: Option<LogFormat>,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Fully resolved settings used to build the client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub address: ManagerAddress,
    pub secret: Secret,
    pub call_options: CallOptions,
    pub retry_policy: RetryPolicy,
    pub http: HttpTransportConfig,
    pub log_format: LogFormat,
}

impl ClientConfig {
    /// Merges `overrides` over `file` over the defaults.
    pub fn resolve(file: FileConfig, overrides: Overrides) -> Result<Self, ConfigError> {
        let address = overrides
            .address
            .or(file.address)
            .ok_or(ConfigError::Missing("manager address"))?;
        let address = ManagerAddress::new(address.trim()).ok_or_else(|| ConfigError::Invalid {
            field: "address",
            reason: "must not be empty".into(),
        })?;

        let secret = overrides
            .secret
            .or(file.secret)
            .ok_or(ConfigError::Missing("manager secret"))?;
        let secret = Secret::new(secret).ok_or_else(|| ConfigError::Invalid {
            field: "secret",
            reason: "must not be empty".into(),
        })?;

        let deadline = match overrides.deadline_secs.or(file.deadline_secs) {
            Some(0) => {
                return Err(ConfigError::Invalid {
                    field: "deadline_secs",
                    reason: "must be greater than zero".into(),
                })
            }
            Some(secs) => Duration::from_secs(secs),
            None => UNBOUNDED_DEADLINE,
        };
        let call_options = CallOptions {
            deadline,
            retry_on_failure: overrides.retry_on_failure || file.retry_on_failure.unwrap_or(false),
        };

        let max_attempts = match overrides.max_attempts.or(file.max_attempts) {
            Some(n) => Some(NonZeroU32::new(n).ok_or_else(|| ConfigError::Invalid {
                field: "max_attempts",
                reason: "must be at least 1".into(),
            })?),
            None => None,
        };
        let retry_policy = RetryPolicy {
            max_attempts,
            backoff: Duration::from_millis(overrides.backoff_ms.or(file.backoff_ms).unwrap_or(0)),
        };

        let http = HttpTransportConfig {
            accept_invalid_certs: overrides.accept_invalid_certs
                || file.accept_invalid_certs.unwrap_or(false),
            connect_timeout: file.connect_timeout_secs.map(Duration::from_secs),
            ..HttpTransportConfig::default()
        };

        Ok(Self {
            address,
            secret,
            call_options,
            retry_policy,
            http,
            log_format: overrides.log_format.or(file.log_format).unwrap_or_default(),
        })
    }
}
