//! services/api/src/config.rs
//!
//! Defines the application's configuration structures and loading logic.
//!
//! Service settings are loaded from environment variables at startup. The `.env`
//! file is used for local development. The list of users and the cookie settings
//! live in a separate YAML file whose path comes from `AUTH_CONFIG_PATH`.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::Level;

use crate::password;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse auth config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid auth config: {0}")]
    InvalidAuthConfig(String),
}

const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub auth_config_path: PathBuf,
    pub openai_api_key: String,
    pub openai_api_base: Option<String>,
    pub generation_model: String,
    pub cors_origin: String,
    pub max_upload_bytes: usize,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Server Settings ---
        let bind_address_str =
            lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let auth_config_path = lookup("AUTH_CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./config.yaml"));

        let cors_origin =
            lookup("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string());

        let max_upload_bytes = match lookup("MAX_UPLOAD_BYTES") {
            Some(raw) => raw.parse::<usize>().map_err(|e| {
                ConfigError::InvalidValue("MAX_UPLOAD_BYTES".to_string(), e.to_string())
            })?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        // --- Generation Service ---
        let openai_api_key = lookup("OPENAI_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingVar("OPENAI_API_KEY".to_string()))?;
        let openai_api_base = lookup("OPENAI_API_BASE").filter(|base| !base.trim().is_empty());
        let generation_model =
            lookup("GENERATION_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string());

        Ok(Self {
            bind_address,
            log_level,
            auth_config_path,
            openai_api_key,
            openai_api_base,
            generation_model,
            cors_origin,
            max_upload_bytes,
        })
    }
}

//=========================================================================================
// Auth Config (YAML)
//=========================================================================================

/// The users allowed to log in and the settings of the session cookie.
#[derive(Clone, Debug, Deserialize)]
pub struct AuthConfig {
    pub credentials: CredentialsConfig,
    pub cookie: CookieConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CredentialsConfig {
    pub usernames: BTreeMap<String, UserEntry>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct UserEntry {
    pub name: String,
    /// Argon2 PHC string, as printed by the `hash_password` binary, or a
    /// bcrypt hash carried over from an older file.
    pub password: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CookieConfig {
    pub name: String,
    pub key: String,
    pub expiry_days: u32,
}

impl AuthConfig {
    /// Reads and validates the auth config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&raw)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: AuthConfig = serde_yaml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let cookie = &self.cookie;
        let valid_name = !cookie.name.is_empty()
            && cookie
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid_name {
            return Err(ConfigError::InvalidAuthConfig(format!(
                "cookie.name '{}' must be a non-empty token of letters, digits, '_' or '-'",
                cookie.name
            )));
        }
        if cookie.key.trim().is_empty() {
            return Err(ConfigError::InvalidAuthConfig(
                "cookie.key must not be empty".to_string(),
            ));
        }
        if cookie.expiry_days == 0 {
            return Err(ConfigError::InvalidAuthConfig(
                "cookie.expiry_days must be at least 1".to_string(),
            ));
        }
        if self.credentials.usernames.is_empty() {
            return Err(ConfigError::InvalidAuthConfig(
                "credentials.usernames must list at least one user".to_string(),
            ));
        }
        for (username, entry) in &self.credentials.usernames {
            password::check_format(&entry.password).map_err(|e| {
                ConfigError::InvalidAuthConfig(format!(
                    "password of '{}' is not a valid password hash: {}",
                    username, e
                ))
            })?;
        }
        Ok(())
    }
}
