//! Server configuration loading from file and environment variables.

use plubin_types::Role;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// API keys and the principal each one maps to.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Object storage that `skp_url` values point into.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,

    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Maximum number of pooled connections.
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "plubin_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

/// API keys accepted by the server.
///
/// Requests without a key are anonymous. A key that matches none of these
/// is rejected.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    /// Public key handed to browser clients; maps to `anon`.
    #[serde(default)]
    pub anon_key: Option<String>,

    /// Trusted backend key; maps to `service_role`.
    #[serde(default)]
    pub service_key: Option<String>,

    /// Signed-in user tokens; each maps to `authenticated`.
    #[serde(default)]
    pub user_tokens: Vec<String>,
}

impl AuthConfig {
    /// Resolves the principal for a presented key.
    ///
    /// Returns `None` when a key is presented but not recognised.
    pub fn role_for_key(&self, key: Option<&str>) -> Option<Role> {
        let Some(key) = key else {
            return Some(Role::Anonymous);
        };
        if self.service_key.as_deref() == Some(key) {
            Some(Role::Service)
        } else if self.user_tokens.iter().any(|token| token == key) {
            Some(Role::Authenticated)
        } else if self.anon_key.as_deref() == Some(key) {
            Some(Role::Anonymous)
        } else {
            None
        }
    }
}

/// External object storage holding model files.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Base URL of the storage service, without trailing slash.
    #[serde(default = "default_storage_url")]
    pub public_base_url: String,

    /// Bucket holding the model files.
    #[serde(default = "default_bucket")]
    pub bucket: String,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    8000
}

fn default_db_path() -> String {
    "plubin.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_pool_max_size() -> u32 {
    8
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_storage_url() -> String {
    "http://localhost:54321".to_string()
}

fn default_bucket() -> String {
    "assets".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            public_base_url: default_storage_url(),
            bucket: default_bucket(),
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `PLUBIN_HOST` overrides `server.host`
/// - `PLUBIN_PORT` overrides `server.port`
/// - `PLUBIN_DB_PATH` overrides `database.path`
/// - `PLUBIN_LOG_LEVEL` overrides `logging.level`
/// - `PLUBIN_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `PLUBIN_ANON_KEY` overrides `auth.anon_key`
/// - `PLUBIN_SERVICE_KEY` overrides `auth.service_key`
/// - `PLUBIN_STORAGE_URL` overrides `storage.public_base_url`
/// - `PLUBIN_STORAGE_BUCKET` overrides `storage.bucket`
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    load_config_with(path, |name| std::env::var(name).ok())
}

fn load_config_with(
    path: Option<&str>,
    var: impl Fn(&str) -> Option<String>,
) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_env_overrides(&mut config, var);
    Ok(config)
}

fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(host) = var("PLUBIN_HOST") {
        match host.parse() {
            Ok(parsed) => config.server.host = parsed,
            Err(_) => tracing::warn!(value = %host, "ignoring invalid PLUBIN_HOST"),
        }
    }
    if let Some(port) = var("PLUBIN_PORT") {
        match port.parse() {
            Ok(parsed) => config.server.port = parsed,
            Err(_) => tracing::warn!(value = %port, "ignoring invalid PLUBIN_PORT"),
        }
    }
    if let Some(db_path) = var("PLUBIN_DB_PATH") {
        config.database.path = db_path;
    }
    if let Some(level) = var("PLUBIN_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = var("PLUBIN_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Some(key) = var("PLUBIN_ANON_KEY").filter(|k| !k.trim().is_empty()) {
        config.auth.anon_key = Some(key);
    }
    if let Some(key) = var("PLUBIN_SERVICE_KEY").filter(|k| !k.trim().is_empty()) {
        config.auth.service_key = Some(key);
    }
    if let Some(url) = var("PLUBIN_STORAGE_URL") {
        config.storage.public_base_url = url.trim_end_matches('/').to_string();
    }
    if let Some(bucket) = var("PLUBIN_STORAGE_BUCKET") {
        config.storage.bucket = bucket;
    }
}
