//! MQTT bus configuration.

use serde::Deserialize;

/// Configuration for the MQTT message bus.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// MQTT broker hostname or IP address.
    pub broker_host: String,
    /// MQTT broker port.
    pub broker_port: u16,
    /// MQTT client identifier. A random `lightsync_<uuid>` is used when unset.
    pub client_id: Option<String>,
    /// Keep-alive interval in seconds.
    pub keep_alive_secs: u16,
    /// Delay between reconnection attempts, in seconds.
    pub retry_delay_secs: u16,
    /// First segment of every device topic.
    pub root_topic: String,
    /// Second segment of every device topic.
    pub category: String,
    /// Topics subscribed next to the device wildcard.
    pub global_topics: Vec<String>,
}

impl MqttConfig {
    /// The configured client id, or a fresh random one.
    #[must_use]
    pub fn resolve_client_id(&self) -> String {
        self.client_id
            .clone()
            .unwrap_or_else(|| format!("lightsync_{}", uuid::Uuid::new_v4()))
    }
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker_host: "localhost".to_string(),
            broker_port: 1883,
            client_id: None,
            keep_alive_secs: 30,
            retry_delay_secs: 5,
            root_topic: "home".to_string(),
            category: "light".to_string(),
            global_topics: vec![
                "/devices/notification".to_string(),
                "/speech/command".to_string(),
            ],
        }
    }
}
