//! Reconciliation engine — applies local intents and remote bus messages to
//! the store, the registry and the bus, and emits change notifications.
//!
//! The engine itself is not synchronized: [`SyncEngine::spawn`](crate::worker)
//! moves it onto a single worker task that processes jobs in FIFO order, so
//! two mutations for the same device never overlap.
//!
//! Local intents follow the order store → registry → bus → notification. A
//! store failure aborts before the registry is touched, so the registry never
//! shows a state the store does not have.

use std::time::Duration;

use lightsync_domain::command::{Command, TopicScheme, parse_topic};
use lightsync_domain::device::{DEFAULT_DEVICE_NAME, DeviceId, DeviceRecord};
use lightsync_domain::error::{MissingRowError, NotFoundError, SyncError};
use lightsync_domain::intent::LocalIntent;

use crate::notifier::ChangeNotifier;
use crate::pending::{PendingDeletes, PendingPhase};
use crate::ports::{DeviceStore, MessageBus, Qos};
use crate::published::PublishedCommands;
use crate::registry::SharedRegistry;

/// How long a completed local delete keeps waiting for its own echo.
pub const DEFAULT_ECHO_WINDOW: Duration = Duration::from_secs(5);

/// Global channels subscribed next to the per-device topics.
pub const DEFAULT_GLOBAL_TOPICS: [&str; 2] = ["/devices/notification", "/speech/command"];

pub const DEFAULT_NOTIFICATION_CAPACITY: usize = 256;

/// Engine settings.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Topic layout used for locally registered devices and the wildcard
    /// subscription.
    pub topics: TopicScheme,
    /// Topics outside the per-device scheme. Messages on them are forwarded
    /// to observers untouched.
    pub global_topics: Vec<String>,
    pub echo_window: Duration,
    pub qos: Qos,
    pub notification_capacity: usize,
}

impl EngineConfig {
    #[must_use]
    pub fn new(topics: TopicScheme) -> Self {
        Self {
            topics,
            global_topics: DEFAULT_GLOBAL_TOPICS.map(String::from).to_vec(),
            echo_window: DEFAULT_ECHO_WINDOW,
            qos: Qos::AtLeastOnce,
            notification_capacity: DEFAULT_NOTIFICATION_CAPACITY,
        }
    }

    #[must_use]
    pub fn is_global(&self, topic: &str) -> bool {
        self.global_topics.iter().any(|t| t == topic)
    }
}

/// Lifecycle of a single device as seen by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    /// Never seen, or deleted long enough ago that its echo window closed.
    Unknown,
    Active,
    /// A local delete is in flight.
    PendingLocalDelete,
    /// Deleted locally; the bus echo is still expected.
    Deleted,
}

impl DeviceState {
    /// Derive the state of `id` from the registry and the pending-delete set.
    #[must_use]
    pub fn of(id: &DeviceId, registry: &SharedRegistry, pending: &PendingDeletes) -> Self {
        match pending.phase(id) {
            Some(PendingPhase::InFlight) => Self::PendingLocalDelete,
            Some(PendingPhase::AwaitingEcho) => Self::Deleted,
            None if registry.get(id).is_some() => Self::Active,
            None => Self::Unknown,
        }
    }
}

/// What a remote message ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOutcome {
    /// First sight of a device.
    Registered,
    Updated,
    /// Re-delivery or a payload that carries no state.
    Unchanged,
    /// Genuine remote deletion.
    Deleted,
    /// Echo of our own `deleteNVS` or of a state command we published.
    EchoSuppressed,
    /// A non-delete message for a device being deleted locally.
    StalePending,
    /// Nothing to do (delete of an unknown device, topic mismatch).
    Ignored,
    GlobalChannel,
    /// Malformed topic.
    Dropped,
    /// A store operation failed; the message had no effect.
    Failed,
}

/// The reconciliation engine.
pub struct SyncEngine<S, B> {
    store: S,
    bus: B,
    registry: SharedRegistry,
    notifier: ChangeNotifier,
    pending: PendingDeletes,
    published: PublishedCommands,
    config: EngineConfig,
}

impl<S, B> SyncEngine<S, B>
where
    S: DeviceStore + Send + Sync,
    B: MessageBus + Send + Sync,
{
    /// Create an engine with an empty registry.
    ///
    /// Call [`reload`](Self::reload) to load the devices already in the store.
    pub fn new(store: S, bus: B, config: EngineConfig) -> Self {
        Self {
            store,
            bus,
            registry: SharedRegistry::new(),
            notifier: ChangeNotifier::new(config.notification_capacity.max(1)),
            pending: PendingDeletes::new(config.echo_window),
            published: PublishedCommands::new(config.echo_window),
            config,
        }
    }

    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    pub fn pending(&self) -> &PendingDeletes {
        &self.pending
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn device_state(&self, id: &DeviceId) -> DeviceState {
        DeviceState::of(id, &self.registry, &self.pending)
    }

    /// Apply a user action to a known device and return the new record.
    ///
    /// # Errors
    ///
    /// - [`SyncError::DeviceNotFound`] when `id` is not in the registry.
    /// - [`SyncError::BusUnavailable`] when the action must be published and
    ///   the bus is down. Nothing is changed in that case.
    /// - [`SyncError::Validation`] for a blank name.
    /// - [`SyncError::StoreWriteFailed`] when persisting fails; the registry
    ///   keeps the previous record.
    /// - A bus error if the publish fails after the new state was stored.
    #[tracing::instrument(skip(self), fields(device_id = %id))]
    pub async fn apply_local_intent(
        &self,
        id: &DeviceId,
        intent: LocalIntent,
    ) -> Result<DeviceRecord, SyncError> {
        let current = self
            .registry
            .get(id)
            .ok_or_else(|| NotFoundError::device(id))?;

        let mut next = current.clone();
        let needs_publish = intent.apply(&mut next);
        if needs_publish && !self.bus.is_connected() {
            return Err(SyncError::BusUnavailable);
        }
        next.validate()?;

        let mut diff = None;
        if next != current {
            self.persist(next.clone()).await?;
            diff = Some(self.registry.update(|registry| {
                registry.upsert(next.clone());
            }));
        }

        let published = if needs_publish {
            let command = next.wire_command();
            let sent = self
                .publish(&next.command_topic, command.as_payload())
                .await;
            if sent.is_ok() {
                self.published.record(id, command.as_payload());
            }
            sent
        } else {
            Ok(())
        };

        if let Some(diff) = diff {
            self.notifier.changed(diff);
        }
        if let Err(err) = &published {
            tracing::warn!(error = %err, "state stored but command not published");
        }
        published.map(|()| next)
    }

    /// Apply a message delivered by the bus.
    ///
    /// Never fails: errors are logged and the message is dropped, since the
    /// bus has nothing useful to do with them.
    #[tracing::instrument(skip(self, payload), fields(topic = %topic))]
    pub async fn apply_remote_message(&self, topic: &str, payload: &str) -> RemoteOutcome {
        if self.config.is_global(topic) {
            self.notifier.channel(topic, payload);
            return RemoteOutcome::GlobalChannel;
        }

        let id = match parse_topic(topic) {
            Ok(id) => id,
            Err(err) => {
                tracing::warn!(error = %err, "dropping message on malformed topic");
                return RemoteOutcome::Dropped;
            }
        };
        let command = Command::parse(payload);

        if command.is_delete() {
            if self.pending.take_echo(&id) {
                tracing::debug!(device_id = %id, "suppressed echo of local delete");
                return RemoteOutcome::EchoSuppressed;
            }
        } else if self.pending.contains(&id) {
            tracing::debug!(device_id = %id, %command, "dropping report for device being deleted");
            return RemoteOutcome::StalePending;
        } else if self.published.take_echo(&id, command.as_payload()) {
            tracing::debug!(device_id = %id, %command, "suppressed echo of local command");
            return RemoteOutcome::EchoSuppressed;
        }

        let result = match self.registry.get_by_topic(topic) {
            None => self.first_sight(id, topic, &command).await,
            Some(record) if command.is_delete() => self.remote_delete(record).await,
            Some(record) => self.remote_update(record, &command).await,
        };

        result.unwrap_or_else(|err| {
            tracing::warn!(error = %err, "failed to apply remote message");
            RemoteOutcome::Failed
        })
    }

    /// Delete a device on behalf of the user and tell the device to wipe
    /// itself.
    ///
    /// # Errors
    ///
    /// - [`SyncError::DeviceNotFound`] when `id` is not in the registry.
    /// - [`SyncError::BusUnavailable`] when the bus is down. Nothing is
    ///   deleted in that case.
    /// - [`SyncError::DeleteFailed`] when the store delete fails; the device
    ///   stays in the registry.
    /// - A bus error if the `deleteNVS` publish fails after the store delete.
    #[tracing::instrument(skip(self), fields(device_id = %id))]
    pub async fn request_local_delete(&self, id: &DeviceId) -> Result<(), SyncError> {
        let record = self
            .registry
            .get(id)
            .ok_or_else(|| NotFoundError::device(id))?;
        if !self.bus.is_connected() {
            return Err(SyncError::BusUnavailable);
        }

        let guard = self.pending.mark(id.clone());
        self.published.forget(id);

        let deleted = match self.store.delete_by_id(id.clone()).await {
            Ok(deleted) => deleted,
            Err(err) => {
                drop(guard);
                tracing::warn!(error = %err, "store delete failed, keeping device");
                return Err(SyncError::DeleteFailed {
                    id: id.clone(),
                    source: Box::new(err),
                });
            }
        };
        if !deleted {
            tracing::debug!("device was already absent from the store");
        }

        let published = self
            .publish(&record.command_topic, Command::DeleteNvs.as_payload())
            .await;

        let diff = self.registry.update(|registry| {
            registry.remove(id);
        });
        self.notifier.changed(diff);

        match published {
            Ok(()) => {
                guard.commit();
                tracing::info!("device deleted locally");
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "device deleted but deleteNVS not published");
                Err(err)
            }
        }
    }

    /// Register a device announced through provisioning rather than the bus.
    ///
    /// Idempotent: an already known device is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::StoreWriteFailed`] when the insert fails, or a
    /// storage error when reading back an existing row fails.
    #[tracing::instrument(skip(self), fields(device_id = %id))]
    pub async fn register_device(&self, id: DeviceId) -> Result<DeviceRecord, SyncError> {
        if let Some(existing) = self.registry.get(&id) {
            return Ok(existing);
        }
        self.pending.release(&id);

        let topic = self.config.topics.device_topic(&id);
        let record = self.insert_or_load(&id, &topic).await?;
        let diff = self.registry.update(|registry| {
            registry.upsert(record.clone());
        });
        self.notifier.changed(diff);
        tracing::info!(topic = %record.command_topic, "device registered");
        Ok(record)
    }

    /// Replace the registry with the content of the store and send a full
    /// reset to observers.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the store cannot be read; the registry is
    /// left as it was.
    #[tracing::instrument(skip(self))]
    pub async fn reload(&self) -> Result<Vec<DeviceRecord>, SyncError> {
        let records = self.store.get_all().await?;
        self.registry.update(|registry| registry.replace_all(records));
        let snapshot = self.registry.snapshot();
        tracing::info!(count = snapshot.len(), "device registry reloaded");
        self.notifier.reset(snapshot.clone());
        Ok(snapshot)
    }

    /// React to the bus connecting or disconnecting.
    ///
    /// On connect the device wildcard and the global channels are
    /// (re)subscribed, since a fresh broker session starts with none.
    #[tracing::instrument(skip(self))]
    pub async fn bus_status(&self, connected: bool) {
        self.notifier.connection(connected);
        if !connected {
            tracing::warn!("message bus disconnected");
            return;
        }
        tracing::info!("message bus connected");

        let topics = std::iter::once(self.config.topics.subscription_filter())
            .chain(self.config.global_topics.iter().cloned());
        for topic in topics {
            if let Err(err) = self.bus.subscribe(topic.clone(), self.config.qos).await {
                tracing::warn!(%topic, error = %err, "subscription failed");
            }
        }
    }

    async fn first_sight(
        &self,
        id: DeviceId,
        topic: &str,
        command: &Command,
    ) -> Result<RemoteOutcome, SyncError> {
        if command.is_delete() {
            tracing::debug!(device_id = %id, "delete for unknown device, nothing to do");
            return Ok(RemoteOutcome::Ignored);
        }
        if let Some(known) = self.registry.get(&id) {
            tracing::warn!(
                device_id = %id,
                known_topic = %known.command_topic,
                "device already known under another topic"
            );
            return Ok(RemoteOutcome::Ignored);
        }

        let stored = self.insert_or_load(&id, topic).await?;
        if stored.command_topic != topic {
            tracing::warn!(
                device_id = %id,
                stored_topic = %stored.command_topic,
                "stored device uses another topic"
            );
            let diff = self.registry.update(|registry| {
                registry.upsert(stored);
            });
            self.notifier.changed(diff);
            return Ok(RemoteOutcome::Ignored);
        }

        let mut record = stored.clone();
        let record = if record.apply_command(command) {
            match self.persist(record.clone()).await {
                Ok(()) => record,
                Err(err) => {
                    tracing::warn!(error = %err, "first-sight state not persisted");
                    stored
                }
            }
        } else {
            stored
        };

        let diff = self.registry.update(|registry| {
            registry.upsert(record);
        });
        self.notifier.changed(diff);
        tracing::info!(device_id = %id, "registered device on first sight");
        Ok(RemoteOutcome::Registered)
    }

    async fn remote_delete(&self, record: DeviceRecord) -> Result<RemoteOutcome, SyncError> {
        let deleted = self
            .store
            .delete_by_id(record.id.clone())
            .await
            .map_err(|err| SyncError::DeleteFailed {
                id: record.id.clone(),
                source: Box::new(err),
            })?;
        if !deleted {
            tracing::debug!(device_id = %record.id, "device was already absent from the store");
        }

        self.published.forget(&record.id);
        let diff = self.registry.update(|registry| {
            registry.remove(&record.id);
        });
        self.notifier.changed(diff);
        tracing::info!(device_id = %record.id, "device deleted remotely");
        Ok(RemoteOutcome::Deleted)
    }

    async fn remote_update(
        &self,
        record: DeviceRecord,
        command: &Command,
    ) -> Result<RemoteOutcome, SyncError> {
        let mut next = record;
        if !next.apply_command(command) {
            return Ok(RemoteOutcome::Unchanged);
        }
        self.persist(next.clone()).await?;
        let diff = self.registry.update(|registry| {
            registry.upsert(next);
        });
        self.notifier.changed(diff);
        Ok(RemoteOutcome::Updated)
    }

    async fn insert_or_load(&self, id: &DeviceId, topic: &str) -> Result<DeviceRecord, SyncError> {
        let created = self
            .store
            .insert_if_absent(id.clone(), topic.to_string(), DEFAULT_DEVICE_NAME.to_string())
            .await
            .map_err(SyncError::into_write_failure)?;
        if created {
            return Ok(DeviceRecord::first_sight(id.clone(), topic));
        }
        self.store
            .get_by_id(id.clone())
            .await?
            .ok_or_else(|| NotFoundError::device(id).into())
    }

    async fn persist(&self, record: DeviceRecord) -> Result<(), SyncError> {
        let id = record.id.clone();
        match self.store.update(record).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(SyncError::StoreWriteFailed(Box::new(MissingRowError(id)))),
            Err(err) => Err(err.into_write_failure()),
        }
    }

    async fn publish(&self, topic: &str, payload: &str) -> Result<(), SyncError> {
        self.bus
            .publish(topic.to_string(), payload.to_string(), self.config.qos)
            .await
    }
}
