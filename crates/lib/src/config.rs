//! Configuration types and loading.
//!
//! Config is loaded from an optional JSON file and then overridden by the
//! `PHOTOVIEW_FFMPEG_*` environment. Validation runs once at startup; any error is fatal.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::auth::Credentials;

pub const ENV_PORT: &str = "PHOTOVIEW_FFMPEG_PORT";
pub const ENV_USER: &str = "PHOTOVIEW_FFMPEG_USER";
pub const ENV_PASSWORD: &str = "PHOTOVIEW_FFMPEG_PASSWORD";
pub const ENV_BIND: &str = "PHOTOVIEW_FFMPEG_BIND";
pub const ENV_TIMEOUT_SECS: &str = "PHOTOVIEW_FFMPEG_TIMEOUT_SECS";
pub const ENV_CONFIG_PATH: &str = "FFGATE_CONFIG_PATH";

const DEFAULT_CONFIG_PATH: &str = "/etc/ffgate/config.json";

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Listener settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// The single recognized identity for `/execute`.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Tool invocation settings.
    #[serde(default)]
    pub tool: ToolConfig,
}

/// Gateway bind and port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port for HTTP. Required: there is no default.
    #[serde(default)]
    pub port: Option<u16>,

    /// Bind address (default "0.0.0.0").
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
}

/// Basic auth identity. Both fields must be non-empty after resolution.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Tool invocation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolConfig {
    /// Wall-clock deadline per invocation in seconds (default 3600). 0 disables the deadline.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_gateway_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_timeout_secs() -> u64 {
    3600
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: None,
            bind: default_gateway_bind(),
        }
    }
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Startup configuration errors. Every variant prevents the listener from binding.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("got non-numeric value {0:?} for PHOTOVIEW_FFMPEG_PORT; cannot convert it to a port number")]
    InvalidPort(String),
    #[error("no port configured; set PHOTOVIEW_FFMPEG_PORT")]
    MissingPort,
    #[error("got empty value for at least 1 of: PHOTOVIEW_FFMPEG_USER, PHOTOVIEW_FFMPEG_PASSWORD")]
    MissingCredentials,
    #[error("got invalid value {0:?} for PHOTOVIEW_FFMPEG_TIMEOUT_SECS; expected whole seconds")]
    InvalidTimeout(String),
}

impl Config {
    /// Apply environment overrides from the given lookup (normally `std::env::var`).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_PORT) {
            let port = raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(raw.clone()))?;
            self.gateway.port = Some(port);
        }
        if let Some(bind) = lookup(ENV_BIND).filter(|s| !s.trim().is_empty()) {
            self.gateway.bind = bind.trim().to_string();
        }
        if let Some(user) = lookup(ENV_USER) {
            self.auth.username = Some(user);
        }
        if let Some(password) = lookup(ENV_PASSWORD) {
            self.auth.password = Some(password);
        }
        self.apply_tool_env(lookup)
    }

    /// Apply only the tool settings from the environment; listener and credential variables are ignored.
    pub fn apply_tool_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            self.tool.timeout_secs = raw
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidTimeout(raw.clone()))?;
        }
        Ok(())
    }

    /// Check the resolved config. Returns the port and the credential pair.
    pub fn validate(&self) -> Result<(u16, Credentials), ConfigError> {
        let port = self.gateway.port.ok_or(ConfigError::MissingPort)?;
        let username = self.auth.username.as_deref().unwrap_or("");
        let password = self.auth.password.as_deref().unwrap_or("");
        if username.is_empty() || password.is_empty() {
            return Err(ConfigError::MissingCredentials);
        }
        Ok((port, Credentials::new(username, password)))
    }

    /// Deadline for a single tool invocation; None when disabled.
    pub fn tool_timeout(&self) -> Option<Duration> {
        match self.tool.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var(ENV_CONFIG_PATH)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Read the config file at `path`. Missing file => default config.
pub fn read_config_file(path: &Path) -> Result<Config> {
    if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        return Ok(Config::default());
    }
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("reading config from {}", path.display()))?;
    serde_json::from_str(&s).with_context(|| format!("parsing config from {}", path.display()))
}

/// Load config from the given path (or FFGATE_CONFIG_PATH / the default), then apply the process environment.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let mut config = read_config_file(&path)?;
    config.apply_env(|key| std::env::var(key).ok())?;
    Ok((config, path))
}

/// Resolve just the tool deadline (file, then PHOTOVIEW_FFMPEG_TIMEOUT_SECS).
/// Used by the standalone health check, which must not fail on listener or credential settings.
pub fn load_tool_timeout(path: Option<PathBuf>) -> Result<Option<Duration>> {
    let path = path.unwrap_or_else(default_config_path);
    let mut config = read_config_file(&path)?;
    config.apply_tool_env(|key| std::env::var(key).ok())?;
    Ok(config.tool_timeout())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn env_only_config_validates() {
        let mut config = Config::default();
        config
            .apply_env(env(&[
                (ENV_PORT, "8080"),
                (ENV_USER, "photoview"),
                (ENV_PASSWORD, "secret"),
            ]))
            .unwrap();
        let (port, creds) = config.validate().unwrap();
        assert_eq!(port, 8080);
        assert_eq!(creds.username(), "photoview");
        assert_eq!(config.gateway.bind, "0.0.0.0");
    }

    #[test]
    fn non_numeric_port_is_rejected() {
        let mut config = Config::default();
        let err = config.apply_env(env(&[(ENV_PORT, "eighty")])).unwrap_err();
        assert_eq!(err, ConfigError::InvalidPort("eighty".to_string()));
    }

    #[test]
    fn out_of_range_port_is_rejected() {
        let mut config = Config::default();
        let err = config.apply_env(env(&[(ENV_PORT, "70000")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPort(_)));
    }

    #[test]
    fn missing_port_is_fatal() {
        let mut config = Config::default();
        config
            .apply_env(env(&[(ENV_USER, "u"), (ENV_PASSWORD, "p")]))
            .unwrap();
        assert_eq!(config.validate().unwrap_err(), ConfigError::MissingPort);
    }

    #[test]
    fn empty_credentials_are_fatal() {
        let mut config = Config::default();
        config
            .apply_env(env(&[(ENV_PORT, "8080"), (ENV_USER, "u"), (ENV_PASSWORD, "")]))
            .unwrap();
        assert_eq!(
            config.validate().unwrap_err(),
            ConfigError::MissingCredentials
        );
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config: Config = serde_json::from_str(
            r#"{"gateway":{"port":9000,"bind":"127.0.0.1"},"auth":{"username":"file","password":"pw"}}"#,
        )
        .unwrap();
        config.apply_env(env(&[(ENV_PORT, "9100")])).unwrap();
        let (port, creds) = config.validate().unwrap();
        assert_eq!(port, 9100);
        assert_eq!(creds.username(), "file");
        assert_eq!(config.gateway.bind, "127.0.0.1");
    }

    #[test]
    fn timeout_zero_disables_deadline() {
        let mut config = Config::default();
        assert_eq!(config.tool_timeout(), Some(Duration::from_secs(3600)));
        config
            .apply_env(env(&[(ENV_TIMEOUT_SECS, "0")]))
            .unwrap();
        assert_eq!(config.tool_timeout(), None);
    }

    #[test]
    fn tool_env_ignores_bad_listener_and_credential_values() {
        let mut config = Config::default();
        config
            .apply_tool_env(env(&[
                (ENV_PORT, "not-a-port"),
                (ENV_USER, ""),
                (ENV_TIMEOUT_SECS, "45"),
            ]))
            .unwrap();
        assert_eq!(config.tool_timeout(), Some(Duration::from_secs(45)));
        assert_eq!(config.gateway.port, None);
    }

    #[test]
    fn tool_env_still_rejects_bad_timeout() {
        let mut config = Config::default();
        let err = config
            .apply_tool_env(env(&[(ENV_TIMEOUT_SECS, "soon")]))
            .unwrap_err();
        assert_eq!(err, ConfigError::InvalidTimeout("soon".to_string()));
    }

    #[test]
    fn debug_redacts_password() {
        let config = AuthConfig {
            username: Some("u".to_string()),
            password: Some("hunter2".to_string()),
        };
        let shown = format!("{:?}", config);
        assert!(!shown.contains("hunter2"));
    }
}
