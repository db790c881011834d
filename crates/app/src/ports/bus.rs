//! Message bus ports — outbound publish/subscribe and inbound event delivery.

use std::future::Future;

use lightsync_domain::error::SyncError;

/// Delivery guarantee requested for a subscription or publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Qos {
    AtMostOnce,
    #[default]
    AtLeastOnce,
    ExactlyOnce,
}

/// Publish/subscribe transport shared with the physical devices.
///
/// Reconnection is the implementation's business; the engine only asks
/// whether the bus is currently connected and reports
/// [`SyncError::BusUnavailable`] otherwise.
pub trait MessageBus {
    /// Start connecting to the broker.
    fn connect(&self) -> impl Future<Output = Result<(), SyncError>> + Send;

    /// Subscribe to a topic filter.
    fn subscribe(
        &self,
        topic: String,
        qos: Qos,
    ) -> impl Future<Output = Result<(), SyncError>> + Send;

    /// Publish a payload on a topic.
    fn publish(
        &self,
        topic: String,
        payload: String,
        qos: Qos,
    ) -> impl Future<Output = Result<(), SyncError>> + Send;

    /// Whether the transport currently holds a live broker session.
    fn is_connected(&self) -> bool;
}

impl<T: MessageBus + Send + Sync> MessageBus for std::sync::Arc<T> {
    fn connect(&self) -> impl Future<Output = Result<(), SyncError>> + Send {
        (**self).connect()
    }

    fn subscribe(
        &self,
        topic: String,
        qos: Qos,
    ) -> impl Future<Output = Result<(), SyncError>> + Send {
        (**self).subscribe(topic, qos)
    }

    fn publish(
        &self,
        topic: String,
        payload: String,
        qos: Qos,
    ) -> impl Future<Output = Result<(), SyncError>> + Send {
        (**self).publish(topic, payload, qos)
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }
}

/// Something that happened on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    Connected,
    Disconnected,
    /// A delivered message. At-least-once: duplicates are expected.
    Message { topic: String, payload: String },
}

/// Inbound port: receives bus events from the transport's own task.
///
/// `dispatch` must return promptly and never fail; the transport cannot do
/// anything useful with engine-level errors.
pub trait BusEventSink: Send + Sync {
    fn dispatch(&self, event: BusEvent);
}

impl<T: BusEventSink + ?Sized> BusEventSink for std::sync::Arc<T> {
    fn dispatch(&self, event: BusEvent) {
        (**self).dispatch(event);
    }
}
