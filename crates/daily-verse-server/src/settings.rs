//! Server configuration, read once at startup from the environment.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

/// Ten years
const MAX_SESSION_TTL_HOURS: i64 = 24 * 365 * 10;

/// Which Entity Store implementation backs the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// SQLite file on disk
    Sqlite,
    /// Process-local maps, lost on restart
    Memory,
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackend::Sqlite => write!(f, "sqlite"),
            StorageBackend::Memory => write!(f, "memory"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub bind_address: String,
    pub storage_backend: StorageBackend,
    pub database_path: String,
    pub session_ttl_hours: i64,
    pub session_prune_interval_secs: u64,
    pub dispatch_delay_ms: u64,
    /// Built front end to serve, if any
    pub static_dir: Option<String>,

    // Mail
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub email_user: Option<String>,
    pub email_pass: Option<String>,
    pub email_from: String,
    /// Base URL used for the unsubscribe link
    pub app_url: String,

    // Scripture API
    pub bible_api_url: String,
    pub bible_api_key: Option<String>,
    pub bible_id: String,
}

impl ServerConfig {
    /// Load from process environment variables (`BIND_ADDRESS`, `SMTP_HOST`, ...).
    pub fn load() -> Result<Self> {
        Self::from_environment(config::Environment::default())
    }

    fn from_environment(env: config::Environment) -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("bind_address", "0.0.0.0:5000")?
            .set_default("storage_backend", "sqlite")?
            .set_default("database_path", "./data/daily_verse.db")?
            .set_default("session_ttl_hours", 24 * 7)?
            .set_default("session_prune_interval_secs", 15 * 60)?
            .set_default("dispatch_delay_ms", 200)?
            .set_default("smtp_port", 587)?
            .set_default("email_from", "noreply@dailybibleverse.com")?
            .set_default("app_url", "http://localhost:5000")?
            .set_default("bible_api_url", "https://api.scripture.api.bible/v1")?
            .set_default("bible_id", "de4e12af7f28f599-01")?
            .add_source(env)
            .build()
            .context("Failed to read configuration")?;

        let config: ServerConfig = settings
            .try_deserialize()
            .context("Invalid configuration")?;

        if !(1..=MAX_SESSION_TTL_HOURS).contains(&config.session_ttl_hours)
            || chrono::Duration::try_hours(config.session_ttl_hours).is_none()
        {
            anyhow::bail!(
                "SESSION_TTL_HOURS must be between 1 and {}",
                MAX_SESSION_TTL_HOURS
            );
        }

        Ok(config)
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session_ttl_hours)
    }

    pub fn session_prune_interval(&self) -> Duration {
        Duration::from_secs(self.session_prune_interval_secs.max(1))
    }

    pub fn dispatch_delay(&self) -> Duration {
        Duration::from_millis(self.dispatch_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> config::Environment {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        config::Environment::default().source(Some(map))
    }

    #[test]
    fn test_defaults() -> Result<()> {
        let config = ServerConfig::from_environment(env(&[]))?;

        assert_eq!(config.bind_address, "0.0.0.0:5000");
        assert_eq!(config.storage_backend, StorageBackend::Sqlite);
        assert_eq!(config.dispatch_delay(), Duration::from_millis(200));
        assert_eq!(config.smtp_port, 587);
        assert!(config.smtp_host.is_none());
        assert!(config.bible_api_key.is_none());
        Ok(())
    }

    #[test]
    fn test_overrides() -> Result<()> {
        let config = ServerConfig::from_environment(env(&[
            ("STORAGE_BACKEND", "memory"),
            ("DISPATCH_DELAY_MS", "50"),
            ("SMTP_HOST", "smtp.example.com"),
            ("APP_URL", "https://verses.example.com"),
        ]))?;

        assert_eq!(config.storage_backend, StorageBackend::Memory);
        assert_eq!(config.dispatch_delay(), Duration::from_millis(50));
        assert_eq!(config.smtp_host.as_deref(), Some("smtp.example.com"));
        assert_eq!(config.app_url, "https://verses.example.com");
        Ok(())
    }

    #[test]
    fn test_string_settings_are_not_coerced() -> Result<()> {
        let config = ServerConfig::from_environment(env(&[
            ("EMAIL_PASS", "00123456"),
            ("BIBLE_API_KEY", "1234e5"),
            ("EMAIL_USER", "true"),
            ("SMTP_PORT", "2525"),
        ]))?;

        assert_eq!(config.email_pass.as_deref(), Some("00123456"));
        assert_eq!(config.bible_api_key.as_deref(), Some("1234e5"));
        assert_eq!(config.email_user.as_deref(), Some("true"));
        assert_eq!(config.smtp_port, 2525);
        Ok(())
    }

    #[test]
    fn test_session_ttl_bounds() -> Result<()> {
        for bad in ["0", "-5", "9000000000000000"] {
            let result = ServerConfig::from_environment(env(&[("SESSION_TTL_HOURS", bad)]));
            assert!(result.is_err(), "{}", bad);
        }

        let config = ServerConfig::from_environment(env(&[("SESSION_TTL_HOURS", "48")]))?;
        assert_eq!(config.session_ttl(), chrono::Duration::hours(48));
        Ok(())
    }

    #[test]
    fn test_rejects_unknown_backend() {
        let result = ServerConfig::from_environment(env(&[("STORAGE_BACKEND", "postgres")]));
        assert!(result.is_err());
    }
}
