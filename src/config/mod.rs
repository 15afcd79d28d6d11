//! Configuration management for asset-portal
//!
//! This module handles loading, parsing, and validating application configuration
//! from YAML files and environment variables.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Authentication configuration
    #[serde(default)]
    pub auth: AuthConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Object storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileRead(format!("Failed to read config file: {}", e)))?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        // First, expand environment variables in the YAML string
        let expanded = expand_env_vars(yaml);
        serde_yaml::from_str(&expanded)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse YAML: {}", e)))
    }

    /// Load configuration from environment variables with prefix ASSET_PORTAL_
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();

        // Server config from env
        if let Ok(host) = std::env::var("ASSET_PORTAL_SERVER_HOST") {
            config.server.host = host;
        }
        if let Ok(port) = std::env::var("ASSET_PORTAL_SERVER_PORT") {
            config.server.port = port
                .parse()
                .map_err(|_| ConfigError::Parse("Invalid port number".to_string()))?;
        }

        // Database config from env
        if let Ok(path) = std::env::var("ASSET_PORTAL_DATABASE_PATH") {
            config.database.path = path;
        }

        // Auth config from env
        if let Ok(enabled) = std::env::var("ASSET_PORTAL_AUTH_ENABLED") {
            config.auth.enabled = enabled.parse().unwrap_or(true);
        }
        if let Ok(url) = std::env::var("ASSET_PORTAL_AUTH_VERIFIER_URL") {
            config.auth.verifier_url = url;
        }
        if let Ok(lifetime) = std::env::var("ASSET_PORTAL_AUTH_TOKEN_LIFETIME_SECS") {
            config.auth.token_lifetime_secs = lifetime
                .parse()
                .map_err(|_| ConfigError::Parse("Invalid token lifetime".to_string()))?;
        }

        // Storage config from env
        if let Ok(bucket) = std::env::var("ASSET_PORTAL_STORAGE_BUCKET") {
            config.storage.bucket = bucket;
        }
        if let Ok(region) = std::env::var("ASSET_PORTAL_STORAGE_REGION") {
            config.storage.region = region;
        }
        if let Ok(key) = std::env::var("ASSET_PORTAL_STORAGE_ACCESS_KEY") {
            config.storage.access_key = key;
        }
        if let Ok(key) = std::env::var("ASSET_PORTAL_STORAGE_SECRET_KEY") {
            config.storage.secret_key = key;
        }

        // Logging config from env
        if let Ok(level) = std::env::var("ASSET_PORTAL_LOG_LEVEL") {
            config.logging.level = level;
        }

        Ok(config)
    }

    /// Validate settings that have no usable default
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.enabled && self.auth.verifier_url.is_empty() {
            return Err(ConfigError::MissingRequired(
                "auth.verifier_url must be set when authentication is enabled".to_string(),
            ));
        }
        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Per-client rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_request_timeout() -> u64 {
    20
}

/// Rate limiting configuration for incoming requests
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RateLimitConfig {
    /// Maximum number of requests per second per client address
    #[serde(default = "default_max_requests")]
    pub max_requests_per_second: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests_per_second: default_max_requests(),
        }
    }
}

fn default_max_requests() -> u32 {
    3
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthConfig {
    /// Whether authentication is enforced on mutating endpoints
    #[serde(default = "default_auth_enabled")]
    pub enabled: bool,

    /// Base URL of the external signature verification service
    #[serde(default)]
    pub verifier_url: String,

    /// Timeout for signature verification calls (in seconds)
    #[serde(default = "default_verify_timeout")]
    pub verify_timeout_secs: u64,

    /// Lifetime of issued nonce tokens (in seconds)
    #[serde(default = "default_token_lifetime")]
    pub token_lifetime_secs: u64,
}

impl AuthConfig {
    /// Token lifetime as a chrono duration, for expiry arithmetic
    pub fn token_lifetime(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.token_lifetime_secs as i64)
    }

    /// Verification timeout as a std duration, for the HTTP client
    pub fn verify_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.verify_timeout_secs)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: default_auth_enabled(),
            verifier_url: String::new(),
            verify_timeout_secs: default_verify_timeout(),
            token_lifetime_secs: default_token_lifetime(),
        }
    }
}

fn default_auth_enabled() -> bool {
    true
}

fn default_verify_timeout() -> u64 {
    20
}

fn default_token_lifetime() -> u64 {
    300
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    #[serde(default = "default_database_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    "/data/db/asset-portal.db".to_string()
}

/// Object storage (S3) configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    /// Bucket name for uploaded files
    #[serde(default)]
    pub bucket: String,

    /// AWS region the bucket lives in
    #[serde(default = "default_region")]
    pub region: String,

    /// Access key ID
    #[serde(default = "default_storage_key")]
    pub access_key: String,

    /// Secret access key
    #[serde(default = "default_storage_key")]
    pub secret_key: String,

    /// Override for the storage endpoint (e.g. a local S3-compatible server)
    pub endpoint: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            region: default_region(),
            access_key: default_storage_key(),
            secret_key: default_storage_key(),
            endpoint: None,
        }
    }
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_storage_key() -> String {
    "test".to_string()
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

/// Configuration error types
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum ConfigError {
    /// Error reading configuration file
    #[error("Failed to read configuration file: {0}")]
    FileRead(String),

    /// Error parsing configuration
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    /// Missing required configuration
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

/// Expand environment variables in a string
///
/// Supports `${VAR_NAME}` syntax
fn expand_env_vars(input: &str) -> String {
    let re = regex_lite::Regex::new(r"\$\{([^}]+)\}")
        .expect("Invalid regex pattern for environment variable expansion");

    re.replace_all(input, |caps: &regex_lite::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| caps[0].to_string())
    })
    .into_owned()
}
