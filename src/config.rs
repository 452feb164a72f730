//! Configuration management

use anyhow::{self, Context, Result};

const DEFAULT_NATS_URL: &str = "nats://localhost:4222";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_DB_ACQUIRE_TIMEOUT_SECS: u64 = 30;
const DEFAULT_LOGS_DIR: &str = "../logs";
const MIN_JWT_SECRET_LEN: usize = 32;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// NATS server URL
    pub nats_url: String,
    pub nats_user: Option<String>,
    pub nats_password: Option<String>,

    /// PostgreSQL connection string. Without it the worker keeps master data
    /// in memory.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_acquire_timeout_secs: u64,

    /// JWT secret key for token validation
    pub jwt_secret: String,

    /// Directory for rolling log files
    pub logs_dir: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let nats_url = non_empty("NATS_URL").unwrap_or_else(|| DEFAULT_NATS_URL.to_string());

        let db_max_connections = match non_empty("DB_MAX_CONNECTIONS") {
            Some(v) => v.parse().context("DB_MAX_CONNECTIONS must be a positive integer")?,
            None => DEFAULT_DB_MAX_CONNECTIONS,
        };

        let db_acquire_timeout_secs = match non_empty("DB_ACQUIRE_TIMEOUT_SECS") {
            Some(v) => v.parse().context("DB_ACQUIRE_TIMEOUT_SECS must be a number of seconds")?,
            None => DEFAULT_DB_ACQUIRE_TIMEOUT_SECS,
        };

        let jwt_secret = non_empty("JWT_SECRET")
            .context("JWT_SECRET must be set, generate one with: openssl rand -base64 48")?;

        if jwt_secret.len() < MIN_JWT_SECRET_LEN {
            anyhow::bail!(
                "JWT_SECRET must be at least {} bytes (current: {} bytes). Generate one with: openssl rand -base64 48",
                MIN_JWT_SECRET_LEN,
                jwt_secret.len()
            );
        }

        Ok(Self {
            nats_url,
            nats_user: non_empty("NATS_USER"),
            nats_password: non_empty("NATS_PASSWORD"),
            database_url: non_empty("DATABASE_URL"),
            db_max_connections,
            db_acquire_timeout_secs,
            jwt_secret,
            logs_dir: non_empty("LOGS_DIR").unwrap_or_else(|| DEFAULT_LOGS_DIR.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "test-secret-key-for-jwt-at-least-32-bytes-long";

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("JWT_SECRET", SECRET)]).unwrap();

        assert_eq!(config.nats_url, "nats://localhost:4222");
        assert!(config.database_url.is_none());
        assert_eq!(config.db_max_connections, 10);
        assert_eq!(config.db_acquire_timeout_secs, 30);
        assert_eq!(config.logs_dir, "../logs");
        assert!(config.nats_user.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("JWT_SECRET", SECRET),
            ("NATS_URL", "nats://nats:4222"),
            ("DATABASE_URL", "postgres://breakbulk@db/breakbulk"),
            ("DB_MAX_CONNECTIONS", "4"),
            ("DB_ACQUIRE_TIMEOUT_SECS", "5"),
        ])
        .unwrap();

        assert_eq!(config.nats_url, "nats://nats:4222");
        assert_eq!(config.database_url.as_deref(), Some("postgres://breakbulk@db/breakbulk"));
        assert_eq!(config.db_max_connections, 4);
        assert_eq!(config.db_acquire_timeout_secs, 5);
    }

    #[test]
    fn test_blank_database_url_is_unset() {
        let config = load(&[("JWT_SECRET", SECRET), ("DATABASE_URL", "  ")]).unwrap();
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_missing_jwt_secret_fails() {
        assert!(load(&[]).is_err());
    }

    #[test]
    fn test_short_jwt_secret_fails() {
        let err = load(&[("JWT_SECRET", "too-short")]).unwrap_err();
        assert!(err.to_string().contains("at least 32 bytes"));
    }

    #[test]
    fn test_invalid_pool_size_fails() {
        assert!(load(&[("JWT_SECRET", SECRET), ("DB_MAX_CONNECTIONS", "many")]).is_err());
    }
}
