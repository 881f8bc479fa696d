//! Controller connection settings.
//!
//! Built once at startup, from an optional JSON file and then environment
//! variables, and handed to [`ControllerClient`](crate::ControllerClient).
//!
//! | Variable                  | Default                 | Description                       |
//! |---------------------------|-------------------------|-----------------------------------|
//! | `CONTROLLER_HOST`         | `http://localhost:8013` | Base URL of the controller        |
//! | `CONTROLLER_OAUTH_TOKEN`  | unset                   | Bearer token (wins over basic)    |
//! | `CONTROLLER_USERNAME`     | unset                   | Basic auth user                   |
//! | `CONTROLLER_PASSWORD`     | unset                   | Basic auth password               |
//! | `CONTROLLER_TIMEOUT`      | `10`                    | Per-request timeout in seconds    |
//! | `CONTROLLER_VERIFY_SSL`   | `true`                  | Verify TLS certificates           |

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::SdkError;

const DEFAULT_HOST: &str = "http://localhost:8013";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// How requests authenticate against the controller.
#[derive(Clone, PartialEq, Eq)]
pub enum ControllerAuth {
    /// `Authorization: Bearer <token>`.
    Token(String),
    /// HTTP basic authentication.
    Basic {
        /// User name.
        username: String,
        /// Password.
        password: String,
    },
}

// Secrets stay out of logs.
impl fmt::Debug for ControllerAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token(_) => f.write_str("Token(***)"),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"***")
                .finish(),
        }
    }
}

/// Connection settings for a controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Base URL without trailing slash (e.g. `https://controller.example.com`).
    pub host: String,
    /// Credentials, if any.
    pub auth: Option<ControllerAuth>,
    /// Timeout applied to every round trip.
    pub timeout: Duration,
    /// Whether TLS certificates are verified.
    pub verify_ssl: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            auth: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            verify_ssl: true,
        }
    }
}

/// On-disk form of [`ControllerConfig`]; every field optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    host: Option<String>,
    oauth_token: Option<String>,
    username: Option<String>,
    password: Option<String>,
    timeout: Option<u64>,
    verify_ssl: Option<bool>,
}

impl ControllerConfig {
    /// Default location of the configuration file
    /// (`<config dir>/credsource/controller.json`).
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("credsource").join("controller.json"))
    }

    /// Build the configuration from environment variables only.
    pub fn from_env() -> Result<Self, SdkError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Read the default configuration file if it exists, then apply
    /// environment overrides.
    pub fn load() -> Result<Self, SdkError> {
        let file = match Self::default_path() {
            Some(path) if path.exists() => Some(path),
            _ => None,
        };
        Self::load_from(file.as_deref(), |key| std::env::var(key).ok())
    }

    /// Read `path` (when given), then apply overrides looked up through `var`.
    pub fn load_from(
        path: Option<&Path>,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, SdkError> {
        let mut config = Self::default();
        if let Some(path) = path {
            let text = std::fs::read_to_string(path)?;
            let file: ConfigFile = serde_json::from_str(&text).map_err(|e| {
                SdkError::Config(format!("invalid config file {}: {e}", path.display()))
            })?;
            config.merge(file);
        }
        config.merge(ConfigFile::from_vars(&var)?);
        Ok(config)
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, SdkError> {
        let mut config = Self::default();
        config.merge(ConfigFile::from_vars(&var)?);
        Ok(config)
    }

    /// Override the host, normalising the trailing slash.
    #[must_use]
    pub fn with_host(mut self, host: &str) -> Self {
        self.host = host.trim_end_matches('/').to_string();
        self
    }

    /// Override the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn merge(&mut self, file: ConfigFile) {
        if let Some(host) = file.host {
            self.host = host.trim_end_matches('/').to_string();
        }
        if let Some(token) = file.oauth_token {
            self.auth = Some(ControllerAuth::Token(token));
        } else if let (Some(username), Some(password)) = (file.username, file.password) {
            // A token from an earlier layer still wins over basic credentials.
            if !matches!(self.auth, Some(ControllerAuth::Token(_))) {
                self.auth = Some(ControllerAuth::Basic { username, password });
            }
        }
        if let Some(secs) = file.timeout {
            self.timeout = Duration::from_secs(secs);
        }
        if let Some(verify) = file.verify_ssl {
            self.verify_ssl = verify;
        }
    }
}

impl ConfigFile {
    fn from_vars(var: &impl Fn(&str) -> Option<String>) -> Result<Self, SdkError> {
        let timeout = var("CONTROLLER_TIMEOUT")
            .map(|v| {
                v.trim()
                    .parse::<u64>()
                    .map_err(|_| SdkError::Config(format!("CONTROLLER_TIMEOUT: not a number: {v}")))
            })
            .transpose()?;
        let verify_ssl = var("CONTROLLER_VERIFY_SSL")
            .map(|v| parse_bool(&v))
            .transpose()?;
        Ok(Self {
            host: var("CONTROLLER_HOST"),
            oauth_token: var("CONTROLLER_OAUTH_TOKEN"),
            username: var("CONTROLLER_USERNAME"),
            password: var("CONTROLLER_PASSWORD"),
            timeout,
            verify_ssl,
        })
    }
}

fn parse_bool(value: &str) -> Result<bool, SdkError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(SdkError::Config(format!(
            "CONTROLLER_VERIFY_SSL: not a boolean: {other}"
        ))),
    }
}
