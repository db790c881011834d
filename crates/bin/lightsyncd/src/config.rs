//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `lightsync.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::time::Duration;

use serde::Deserialize;

use lightsync_adapter_mqtt::MqttConfig;
use lightsync_app::engine::{DEFAULT_NOTIFICATION_CAPACITY, EngineConfig};
use lightsync_domain::command::TopicScheme;
use lightsync_domain::error::ValidationError;

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
    /// Broker connection and topic layout.
    pub mqtt: MqttConfig,
    /// Engine tuning.
    pub engine: EngineSection,
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
pub struct EngineSection {
    /// How long a locally deleted id waits for its own echo.
    pub echo_window_secs: u64,
    /// Buffer size of the notification channel per observer.
    pub notification_capacity: usize,
}

impl Config {
    /// Load configuration from `lightsync.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("lightsync.toml")?;
        config.apply_env_overrides();
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

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("LIGHTSYNC_HOST") {
            self.server.host = val;
        }
        if let Ok(val) = std::env::var("LIGHTSYNC_PORT")
            && let Ok(port) = val.parse()
        {
            self.server.port = port;
        }
        if let Ok(val) = std::env::var("LIGHTSYNC_BIND")
            && let Some((host, port)) = val.rsplit_once(':')
        {
            self.server.host = host.to_string();
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Ok(val) = std::env::var("LIGHTSYNC_DATABASE_URL") {
            self.database.url = val;
        }
        if let Ok(val) = std::env::var("LIGHTSYNC_MQTT_HOST") {
            self.mqtt.broker_host = val;
        }
        if let Ok(val) = std::env::var("LIGHTSYNC_MQTT_PORT")
            && let Ok(port) = val.parse()
        {
            self.mqtt.broker_port = port;
        }
        if let Ok(val) = std::env::var("LIGHTSYNC_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        if self.mqtt.broker_port == 0 {
            return Err(ConfigError::Validation(
                "broker port must be non-zero".to_string(),
            ));
        }
        if self.engine.notification_capacity == 0 {
            return Err(ConfigError::Validation(
                "notification capacity must be non-zero".to_string(),
            ));
        }
        self.topic_scheme()?;
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

    fn topic_scheme(&self) -> Result<TopicScheme, ConfigError> {
        TopicScheme::new(&self.mqtt.root_topic, &self.mqtt.category).map_err(ConfigError::Topic)
    }

    /// Build the engine configuration from the `[mqtt]` topic layout and the
    /// `[engine]` section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Topic`] if the root topic or category is not a
    /// valid topic segment.
    pub fn engine_config(&self) -> Result<EngineConfig, ConfigError> {
        let mut engine = EngineConfig::new(self.topic_scheme()?);
        engine.global_topics.clone_from(&self.mqtt.global_topics);
        engine.echo_window = Duration::from_secs(self.engine.echo_window_secs);
        engine.notification_capacity = self.engine.notification_capacity;
        Ok(engine)
    }
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
            url: "sqlite:lightsync.db?mode=rwc".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "lightsyncd=info,lightsync=info,tower_http=debug".to_string(),
        }
    }
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            echo_window_secs: 5,
            notification_capacity: DEFAULT_NOTIFICATION_CAPACITY,
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
    /// Root topic or category cannot be used as a topic segment.
    #[error("invalid topic layout")]
    Topic(#[source] ValidationError),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
