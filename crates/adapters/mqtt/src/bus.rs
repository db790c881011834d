//! rumqttc-backed [`MessageBus`].
//!
//! The [`EventLoop`] is polled on its own task. Connection state is tracked
//! from the packets it yields: a `ConnAck` marks the bus connected, any poll
//! error marks it disconnected. rumqttc reconnects on the next poll, so the
//! task just backs off and keeps polling.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};

use lightsync_app::ports::{BusEvent, BusEventSink, MessageBus, Qos};
use lightsync_domain::error::SyncError;

use crate::config::MqttConfig;
use crate::error::MqttError;

/// Capacity of the request channel between the client and the event loop.
const REQUEST_CAPACITY: usize = 10;

#[derive(Debug, Default)]
struct LinkState {
    connected: AtomicBool,
    stopping: AtomicBool,
}

/// MQTT implementation of the [`MessageBus`] port.
///
/// Attach a sink with [`attach`](Self::attach) before calling
/// [`connect`](MessageBus::connect).
pub struct MqttBus {
    client: AsyncClient,
    event_loop: Mutex<Option<EventLoop>>,
    sink: OnceLock<Arc<dyn BusEventSink>>,
    state: Arc<LinkState>,
    retry_delay: Duration,
}

impl MqttBus {
    /// Build the client. No network traffic happens until `connect`.
    #[must_use]
    pub fn new(config: &MqttConfig) -> Self {
        let mut options = MqttOptions::new(
            config.resolve_client_id(),
            config.broker_host.clone(),
            config.broker_port,
        );
        options.set_keep_alive(Duration::from_secs(u64::from(config.keep_alive_secs)));
        options.set_clean_session(true);

        let (client, event_loop) = AsyncClient::new(options, REQUEST_CAPACITY);
        Self {
            client,
            event_loop: Mutex::new(Some(event_loop)),
            sink: OnceLock::new(),
            state: Arc::default(),
            retry_delay: Duration::from_secs(u64::from(config.retry_delay_secs)),
        }
    }

    /// Set the receiver of bus events. Can only be done once.
    ///
    /// # Errors
    ///
    /// Returns [`MqttError::SinkAlreadyAttached`] on a second call.
    pub fn attach(&self, sink: impl BusEventSink + 'static) -> Result<(), MqttError> {
        self.sink
            .set(Arc::new(sink))
            .map_err(|_| MqttError::SinkAlreadyAttached)
    }

    /// Send a clean MQTT disconnect and stop the event loop task.
    ///
    /// # Errors
    ///
    /// Returns [`MqttError::Client`] if the request cannot be queued.
    pub async fn disconnect(&self) -> Result<(), MqttError> {
        self.state.stopping.store(true, Ordering::SeqCst);
        self.state.connected.store(false, Ordering::SeqCst);
        self.client.disconnect().await.map_err(MqttError::Client)
    }

    fn start(&self) -> Result<(), MqttError> {
        let sink = self.sink.get().cloned().ok_or(MqttError::NoSink)?;
        let event_loop = self
            .event_loop
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(MqttError::AlreadyStarted)?;

        tokio::spawn(poll_loop(
            event_loop,
            Arc::clone(&self.state),
            sink,
            self.retry_delay,
        ));
        Ok(())
    }
}

impl MessageBus for MqttBus {
    fn connect(&self) -> impl Future<Output = Result<(), SyncError>> + Send {
        let result = self.start();
        async move {
            result?;
            tracing::info!("MQTT event loop started");
            Ok(())
        }
    }

    fn subscribe(
        &self,
        topic: String,
        qos: Qos,
    ) -> impl Future<Output = Result<(), SyncError>> + Send {
        let client = self.client.clone();
        let connected = self.is_connected();
        async move {
            if !connected {
                return Err(MqttError::NotConnected.into());
            }
            client
                .subscribe(topic.clone(), map_qos(qos))
                .await
                .map_err(MqttError::Client)?;
            tracing::debug!(%topic, "subscribed");
            Ok(())
        }
    }

    fn publish(
        &self,
        topic: String,
        payload: String,
        qos: Qos,
    ) -> impl Future<Output = Result<(), SyncError>> + Send {
        let client = self.client.clone();
        let connected = self.is_connected();
        async move {
            if !connected {
                return Err(MqttError::NotConnected.into());
            }
            tracing::debug!(%topic, %payload, "publishing");
            client
                .publish(topic, map_qos(qos), false, payload)
                .await
                .map_err(MqttError::Client)?;
            Ok(())
        }
    }

    fn is_connected(&self) -> bool {
        self.state.connected.load(Ordering::SeqCst)
    }
}

fn map_qos(qos: Qos) -> QoS {
    match qos {
        Qos::AtMostOnce => QoS::AtMostOnce,
        Qos::AtLeastOnce => QoS::AtLeastOnce,
        Qos::ExactlyOnce => QoS::ExactlyOnce,
    }
}

async fn poll_loop(
    mut event_loop: EventLoop,
    state: Arc<LinkState>,
    sink: Arc<dyn BusEventSink>,
    retry_delay: Duration,
) {
    loop {
        match event_loop.poll().await {
            Ok(Event::Outgoing(Outgoing::Disconnect)) if state.stopping.load(Ordering::SeqCst) => {
                tracing::info!("MQTT event loop stopped");
                return;
            }
            Ok(event) => handle_event(event, &state, sink.as_ref()),
            Err(err) => {
                handle_connection_loss(&state, sink.as_ref());
                if state.stopping.load(Ordering::SeqCst) {
                    tracing::info!("MQTT event loop stopped");
                    return;
                }
                tracing::warn!(error = %err, retry_in = ?retry_delay, "MQTT connection error");
                tokio::time::sleep(retry_delay).await;
            }
        }
    }
}

fn handle_event(event: Event, state: &LinkState, sink: &dyn BusEventSink) {
    let Event::Incoming(packet) = event else {
        return;
    };
    match packet {
        Packet::ConnAck(ack) => {
            tracing::info!(session_present = ack.session_present, "connected to MQTT broker");
            state.connected.store(true, Ordering::SeqCst);
            sink.dispatch(BusEvent::Connected);
        }
        Packet::Publish(publish) => {
            let topic = publish.topic.to_string();
            match std::str::from_utf8(&publish.payload) {
                Ok(payload) => sink.dispatch(BusEvent::Message {
                    topic,
                    payload: payload.to_string(),
                }),
                Err(err) => tracing::warn!(%topic, error = %err, "dropping non UTF-8 payload"),
            }
        }
        _ => {}
    }
}

fn handle_connection_loss(state: &LinkState, sink: &dyn BusEventSink) {
    if state.connected.swap(false, Ordering::SeqCst) {
        sink.dispatch(BusEvent::Disconnected);
    }
}
