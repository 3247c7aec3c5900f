//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `wattlog.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::time::Duration;

use serde::Deserialize;
use wattlog_adapter_tuya::{DEFAULT_ENDPOINT, TuyaConfig};
use wattlog_app::collection::CollectionConfig;
use wattlog_domain::telemetry::ProfileRegistry;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Database settings.
    pub database: DatabaseConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Collection schedule and trigger settings.
    pub collection: CollectionSettings,
    /// Vendor cloud credentials.
    pub tuya: TuyaSettings,
    /// Status-code profiles and per-device assignments.
    pub telemetry: ProfileRegistry,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port.
    pub port: u16,
}

/// `SQLite` database configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL or file path.
    pub url: String,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CollectionSettings {
    /// Seconds between scheduled runs. `0` leaves scheduling to the
    /// external trigger only.
    pub interval_secs: u64,
    /// Upper bound on a single device fetch, in seconds.
    pub fetch_timeout_secs: u64,
    /// Store reverse counters and derive injection.
    pub track_injection: bool,
    /// Bearer token required by `POST /api/collect`. The endpoint refuses
    /// every call when unset.
    pub cron_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TuyaSettings {
    pub access_id: Option<String>,
    pub access_key: Option<String>,
    /// Regional API base URL.
    pub endpoint: String,
    /// Per-request timeout, in seconds.
    pub timeout_secs: u64,
}

impl Config {
    /// Load configuration from `wattlog.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is inconsistent.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("wattlog.toml")?;
        config.apply_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("WATTLOG_HOST") {
            self.server.host = val;
        }
        if let Some(port) = var("WATTLOG_PORT").and_then(|val| val.parse().ok()) {
            self.server.port = port;
        }
        if let Some(val) = var("WATTLOG_BIND") {
            if let Some((host, port)) = val.rsplit_once(':') {
                self.server.host = host.to_string();
                if let Ok(port) = port.parse() {
                    self.server.port = port;
                }
            }
        }
        if let Some(val) = var("WATTLOG_DATABASE_URL") {
            self.database.url = val;
        }
        if let Some(val) = var("WATTLOG_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("WATTLOG_CRON_SECRET").or_else(|| var("CRON_SECRET")) {
            self.collection.cron_secret = Some(val).filter(|v| !v.is_empty());
        }
        if let Some(val) = var("TUYA_ACCESS_ID") {
            self.tuya.access_id = Some(val);
        }
        if let Some(val) = var("TUYA_ACCESS_KEY") {
            self.tuya.access_key = Some(val);
        }
        if let Some(val) = var("TUYA_API_ENDPOINT") {
            self.tuya.endpoint = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        if self.collection.fetch_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "collection.fetch_timeout_secs must be non-zero".to_string(),
            ));
        }
        if self.tuya.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "tuya.timeout_secs must be non-zero".to_string(),
            ));
        }
        if has_value(self.tuya.access_id.as_deref()) != has_value(self.tuya.access_key.as_deref()) {
            return Err(ConfigError::Validation(
                "tuya.access_id and tuya.access_key must be set together".to_string(),
            ));
        }
        Ok(())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Return the database URL in `sqlx`-compatible format.
    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database.url
    }
}

impl CollectionSettings {
    #[must_use]
    pub fn collection_config(&self) -> CollectionConfig {
        CollectionConfig {
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
            track_injection: self.track_injection,
        }
    }

    /// The trigger secret, `None` when unset or blank.
    #[must_use]
    pub fn cron_secret(&self) -> Option<&str> {
        self.cron_secret.as_deref().filter(|v| !v.is_empty())
    }

    /// Period of the in-process scheduler, `None` when disabled.
    #[must_use]
    pub fn collection_interval(&self) -> Option<Duration> {
        (self.interval_secs > 0).then(|| Duration::from_secs(self.interval_secs))
    }
}

impl TuyaSettings {
    /// Client configuration, or `None` unless both credentials are set.
    #[must_use]
    pub fn client_config(&self) -> Option<TuyaConfig> {
        let access_id = self.access_id.as_deref().filter(|v| !v.is_empty())?;
        let access_key = self.access_key.as_deref().filter(|v| !v.is_empty())?;
        Some(
            TuyaConfig::new(access_id, access_key)
                .with_endpoint(self.endpoint.as_str())
                .with_timeout(Duration::from_secs(self.timeout_secs)),
        )
    }
}

fn has_value(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.is_empty())
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:wattlog.db?mode=rwc".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "wattlogd=info,wattlog=info,tower_http=debug".to_string(),
        }
    }
}

impl Default for CollectionSettings {
    fn default() -> Self {
        Self {
            interval_secs: 3600,
            fetch_timeout_secs: 15,
            track_injection: true,
            cron_secret: None,
        }
    }
}

impl Default for TuyaSettings {
    fn default() -> Self {
        Self {
            access_id: None,
            access_key: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: 10,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
