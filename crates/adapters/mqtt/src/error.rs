//! MQTT adapter error types.

use lightsync_domain::error::SyncError;

/// Errors specific to the MQTT adapter.
#[derive(Debug, thiserror::Error)]
pub enum MqttError {
    /// No broker session is currently established.
    #[error("MQTT client not connected")]
    NotConnected,

    /// `connect` was called before an event sink was attached.
    #[error("no event sink attached to the MQTT bus")]
    NoSink,

    /// An event sink is already attached.
    #[error("an event sink is already attached to the MQTT bus")]
    SinkAlreadyAttached,

    /// The event loop has already been started.
    #[error("MQTT event loop already running")]
    AlreadyStarted,

    /// The rumqttc client returned an error.
    #[error("MQTT client error")]
    Client(#[source] rumqttc::ClientError),
}

impl MqttError {
    /// Convert into a [`SyncError`] for propagation across port boundaries.
    pub fn into_domain(self) -> SyncError {
        match self {
            Self::NotConnected => SyncError::BusUnavailable,
            other => SyncError::Bus(Box::new(other)),
        }
    }
}

impl From<MqttError> for SyncError {
    fn from(err: MqttError) -> Self {
        err.into_domain()
    }
}
