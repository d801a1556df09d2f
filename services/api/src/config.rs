//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub llm_api_key: Option<String>,
    pub llm_api_base: String,
    pub llm_model: String,
    pub redis_url: Option<String>,
    pub ai_timeout: Duration,
    pub session_ttl: Duration,
    pub session_store_timeout: Duration,
    pub auth_header: String,
    pub cors_origin: String,
    pub default_sessions_limit: i32,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Load Server and Database Settings ---
        let bind_address: SocketAddr = parse_or(&lookup, "BIND_ADDRESS", "0.0.0.0:3000")?;

        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load the Model Provider Settings ---
        let llm_api_key = lookup("LLM_API_KEY").or_else(|| lookup("OPENAI_API_KEY"));
        let llm_api_base = lookup("LLM_API_BASE")
            .unwrap_or_else(|| "https://api.groq.com/openai/v1".to_string());
        let llm_model =
            lookup("LLM_MODEL").unwrap_or_else(|| "llama-3.3-70b-versatile".to_string());

        // --- Load Session Settings ---
        let redis_url = lookup("REDIS_URL").filter(|url| !url.trim().is_empty());
        let ai_timeout = Duration::from_secs(parse_or(&lookup, "AI_TIMEOUT_SECS", "30")?);
        let session_ttl = Duration::from_secs(parse_or(&lookup, "SESSION_TTL_SECS", "1800")?);
        let session_store_timeout =
            Duration::from_millis(parse_or(&lookup, "SESSION_STORE_TIMEOUT_MS", "2000")?);

        // --- Load Web Settings ---
        let auth_header = lookup("AUTH_HEADER")
            .unwrap_or_else(|| "x-user-id".to_string())
            .to_ascii_lowercase();
        let cors_origin =
            lookup("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string());
        let default_sessions_limit: i32 = parse_or(&lookup, "DEFAULT_SESSIONS_LIMIT", "10")?;

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            llm_api_key,
            llm_api_base,
            llm_model,
            redis_url,
            ai_timeout,
            session_ttl,
            session_store_timeout,
            auth_header,
            cors_origin,
            default_sessions_limit,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: &str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = lookup(key).unwrap_or_else(|| default.to_string());
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_database_url_is_set() {
        let config = Config::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://db")])).unwrap();

        assert_eq!(config.bind_address.to_string(), "0.0.0.0:3000");
        assert_eq!(config.ai_timeout, Duration::from_secs(30));
        assert_eq!(config.session_ttl, Duration::from_secs(1800));
        assert_eq!(config.session_store_timeout, Duration::from_millis(2000));
        assert_eq!(config.llm_model, "llama-3.3-70b-versatile");
        assert_eq!(config.auth_header, "x-user-id");
        assert_eq!(config.default_sessions_limit, 10);
        assert!(config.redis_url.is_none());
        assert!(config.llm_api_key.is_none());
    }

    #[test]
    fn missing_database_url_is_an_error() {
        let err = Config::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(var) if var == "DATABASE_URL"));
    }

    #[test]
    fn openai_key_is_a_fallback_for_llm_key() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://db"),
            ("OPENAI_API_KEY", "sk-openai"),
        ]))
        .unwrap();
        assert_eq!(config.llm_api_key.as_deref(), Some("sk-openai"));
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        let err = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://db"),
            ("AI_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(var, _) if var == "AI_TIMEOUT_SECS"));
    }
}
