//! # Application Configuration
//!
//! This module manages application configuration loaded from environment variables.
//! All configuration is validated on startup to fail fast if misconfigured.
//!
//! ## Global Config Access
//!
//! Use [`core_config()`] to access the global configuration instance:
//!
//! ```rust,no_run
//! use lib_core::config::core_config;
//!
//! let config = core_config();
//! let db_url = &config.database_url;
//! ```
//!
//! The config must be initialized once at application startup using [`init_config()`].

use lib_utils::{get_env_or, get_env_parse_or};
use std::sync::OnceLock;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: &[&str] = &["pretty", "json"];

/// Application configuration loaded from environment variables.
#[derive(Clone, Debug)]
pub struct Config {
    /// SQLite database connection URL
    pub database_url: String,

    /// Maximum number of pooled storage connections.
    ///
    /// Every live WebSocket holds one connection for its whole lifetime,
    /// so this also bounds concurrent chat sessions.
    pub db_pool_size: u32,

    /// Seconds to wait for a free connection before giving up
    pub db_pool_timeout_secs: u64,

    /// HTTP listen address (e.g., "127.0.0.1:8000")
    pub bind_address: String,

    /// Origins allowed to make cross-site requests
    pub allowed_origins: Vec<String>,

    /// Log level filter: trace, debug, info, warn or error
    pub log_level: String,

    /// Log output format: pretty or json
    pub log_format: String,

    /// Maximum accepted message content length in bytes
    pub max_message_length: usize,

    /// Upper bound on one response generation, in seconds
    pub generation_timeout_secs: u64,

    /// User created at startup when the user table is empty (`None` disables seeding)
    pub seed_user_name: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite:data/chatbot.db".to_string(),
            db_pool_size: 15,
            db_pool_timeout_secs: 30,
            bind_address: "127.0.0.1:8000".to_string(),
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            max_message_length: 10_000,
            generation_timeout_secs: 30,
            seed_user_name: Some("default".to_string()),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();

        let database_url = get_env_or("DATABASE_URL", &defaults.database_url);

        let db_pool_size = get_env_parse_or("DB_POOL_SIZE", defaults.db_pool_size)
            .map_err(|e| format!("DB_POOL_SIZE must be a valid number: {}", e))?;

        let db_pool_timeout_secs = get_env_parse_or("DB_POOL_TIMEOUT_SECS", defaults.db_pool_timeout_secs)
            .map_err(|e| format!("DB_POOL_TIMEOUT_SECS must be a valid number: {}", e))?;

        let bind_address = get_env_or("BIND_ADDRESS", &defaults.bind_address);

        let allowed_origins = std::env::var("CORS_ORIGINS")
            .map(|raw| parse_origins(&raw))
            .unwrap_or(defaults.allowed_origins);

        let log_level = get_env_or("LOG_LEVEL", &defaults.log_level).to_lowercase();
        let log_format = get_env_or("LOG_FORMAT", &defaults.log_format).to_lowercase();

        let max_message_length = get_env_parse_or("MAX_MESSAGE_LENGTH", defaults.max_message_length)
            .map_err(|e| format!("MAX_MESSAGE_LENGTH must be a valid number: {}", e))?;

        let generation_timeout_secs = get_env_parse_or("GENERATION_TIMEOUT_SECS", defaults.generation_timeout_secs)
            .map_err(|e| format!("GENERATION_TIMEOUT_SECS must be a valid number: {}", e))?;

        let seed_user_name = match std::env::var("SEED_USER_NAME") {
            Ok(name) if name.trim().is_empty() => None,
            Ok(name) => Some(name.trim().to_string()),
            Err(_) => defaults.seed_user_name,
        };

        Ok(Self {
            database_url,
            db_pool_size,
            db_pool_timeout_secs,
            bind_address,
            allowed_origins,
            log_level,
            log_format,
            max_message_length,
            generation_timeout_secs,
            seed_user_name,
        })
    }

    /// Validate configuration values against operational limits.
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=100).contains(&self.db_pool_size) {
            return Err("DB_POOL_SIZE must be between 1 and 100".to_string());
        }

        if !(1..=300).contains(&self.db_pool_timeout_secs) {
            return Err("DB_POOL_TIMEOUT_SECS must be between 1 and 300".to_string());
        }

        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(format!("LOG_LEVEL must be one of {:?}", LOG_LEVELS));
        }

        if !LOG_FORMATS.contains(&self.log_format.as_str()) {
            return Err(format!("LOG_FORMAT must be one of {:?}", LOG_FORMATS));
        }

        if self.max_message_length == 0 {
            return Err("MAX_MESSAGE_LENGTH must be at least 1".to_string());
        }

        if !(1..=600).contains(&self.generation_timeout_secs) {
            return Err("GENERATION_TIMEOUT_SECS must be between 1 and 600".to_string());
        }

        if self.allowed_origins.is_empty() {
            return Err("CORS_ORIGINS must list at least one origin".to_string());
        }

        if let Some(name) = &self.seed_user_name {
            if name.len() > 30 {
                return Err("SEED_USER_NAME must be at most 30 characters".to_string());
            }
        }

        Ok(())
    }
}

/// Split a comma-separated origin list, dropping blanks.
fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Global configuration instance (initialized once at startup).
static CONFIG: OnceLock<Config> = OnceLock::new();

/// Initialize the global configuration.
///
/// This should be called once at application startup, before any handlers
/// or services that need configuration are used.
///
/// # Errors
///
/// Returns an error if:
/// - Environment variables are invalid
/// - Configuration validation fails
/// - Config has already been initialized
pub fn init_config() -> Result<&'static Config, String> {
    let config = Config::from_env()?;
    config.validate()?;

    CONFIG.set(config)
        .map_err(|_| "Config has already been initialized".to_string())?;
    Ok(core_config())
}

/// Get a reference to the global configuration.
///
/// # Panics
///
/// Panics if [`init_config()`] has not been called yet.
pub fn core_config() -> &'static Config {
    CONFIG.get().expect("Config must be initialized with init_config() before use")
}

// endregion: --- Tests
