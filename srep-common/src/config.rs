//! Configuration loading and connection-setting resolution
//!
//! Connection settings resolve field by field in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//!
//! Missing settings are not an error here. The session client reports them
//! when it tries to log in.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable holding the remote API endpoint URL
pub const ENV_API_URL: &str = "LIME_API_URL";
/// Environment variable holding the API username
pub const ENV_USERNAME: &str = "LIME_USERNAME";
/// Environment variable holding the API password
pub const ENV_PASSWORD: &str = "LIME_PASSWORD";

/// Logging section of the TOML config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Contents of `config.toml`
///
/// Every field is optional; an absent file is equivalent to an empty one.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TomlConfig {
    pub api_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Directory holding the reference tables (bundled tables if unset)
    pub metadata_dir: Option<PathBuf>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl fmt::Debug for TomlConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TomlConfig")
            .field("api_url", &self.api_url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("metadata_dir", &self.metadata_dir)
            .field("logging", &self.logging)
            .finish()
    }
}

/// Remote endpoint and credentials, any of which may still be missing
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub api_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("api_url", &self.api_url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Connection settings with every field present
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_url: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_url", &self.api_url)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

impl ConnectionSettings {
    /// Settings taken from the process environment only
    pub fn from_env() -> Self {
        Self {
            api_url: env_value(ENV_API_URL),
            username: env_value(ENV_USERNAME),
            password: env_value(ENV_PASSWORD),
        }
    }

    /// Resolve each field: command line, then environment, then TOML
    pub fn resolve(cli: &ConnectionSettings, toml_config: &TomlConfig) -> Self {
        let env = Self::from_env();

        Self {
            api_url: pick(&cli.api_url, &env.api_url, &toml_config.api_url),
            username: pick(&cli.username, &env.username, &toml_config.username),
            password: pick(&cli.password, &env.password, &toml_config.password),
        }
    }

    /// Names of the settings that are missing or blank
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !is_present(&self.api_url) {
            missing.push(ENV_API_URL);
        }
        if !is_present(&self.username) {
            missing.push(ENV_USERNAME);
        }
        if !is_present(&self.password) {
            missing.push(ENV_PASSWORD);
        }
        missing
    }

    /// Require every field, reporting all missing ones at once
    pub fn require(&self) -> Result<Credentials> {
        match (&self.api_url, &self.username, &self.password) {
            (Some(api_url), Some(username), Some(password)) if self.missing().is_empty() => {
                Ok(Credentials {
                    api_url: api_url.clone(),
                    username: username.clone(),
                    password: password.clone(),
                })
            }
            _ => Err(Error::Config(format!(
                "Missing API connection settings: {}",
                self.missing().join(", ")
            ))),
        }
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn is_present(value: &Option<String>) -> bool {
    value.as_ref().map(|v| !v.trim().is_empty()).unwrap_or(false)
}

fn pick(cli: &Option<String>, env: &Option<String>, toml: &Option<String>) -> Option<String> {
    [cli, env, toml]
        .into_iter()
        .find(|v| is_present(v))
        .and_then(|v| v.clone())
}

/// Default config file location: `<config_dir>/srep/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("srep").join("config.toml"))
}

/// Load a TOML config file
///
/// A missing file yields defaults with a warning. A file that exists but
/// does not parse is an error.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!("Config file not found: {} (using defaults)", path.display());
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: TomlConfig = toml::from_str(&content)?;
    info!("Loaded config file: {}", path.display());
    Ok(config)
}
