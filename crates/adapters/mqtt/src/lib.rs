//! # lightsync-adapter-mqtt
//!
//! MQTT adapter — the message bus shared with the light firmware.
//!
//! ## Responsibilities
//! - Connect to an MQTT broker and keep reconnecting while the process runs
//! - Implement the `MessageBus` port (publish / subscribe / connection state)
//! - Hand every delivered message and connection change to a `BusEventSink`
//!   without ever blocking on engine work
//!
//! ## Dependency rule
//! Same as other adapters: depends on `lightsync-app` and `lightsync-domain`.

pub mod bus;
pub mod config;
pub mod error;

pub use bus::MqttBus;
pub use config::MqttConfig;
pub use error::MqttError;
