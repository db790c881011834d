//! Engine worker — the single FIFO queue every mutation goes through.
//!
//! [`SyncEngine::spawn`] moves the engine onto its own task and returns an
//! [`EngineHandle`]. Local requests wait for their result on a oneshot
//! channel; bus events are fire-and-forget so the transport task is never
//! blocked by engine work.

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

use lightsync_domain::device::{DeviceId, DeviceRecord};
use lightsync_domain::error::SyncError;
use lightsync_domain::intent::LocalIntent;

use crate::engine::{DeviceState, SyncEngine};
use crate::notifier::{ChangeNotifier, Notification};
use crate::pending::PendingDeletes;
use crate::ports::{BusEvent, BusEventSink, DeviceStore, MessageBus};
use crate::registry::SharedRegistry;

type Reply<T> = oneshot::Sender<Result<T, SyncError>>;

enum Job {
    LocalIntent {
        id: DeviceId,
        intent: LocalIntent,
        reply: Reply<DeviceRecord>,
    },
    LocalDelete {
        id: DeviceId,
        reply: Reply<()>,
    },
    Register {
        id: DeviceId,
        reply: Reply<DeviceRecord>,
    },
    Reload {
        reply: Reply<Vec<DeviceRecord>>,
    },
    Remote {
        topic: String,
        payload: String,
    },
    BusStatus(bool),
}

impl<S, B> SyncEngine<S, B>
where
    S: DeviceStore + Send + Sync + 'static,
    B: MessageBus + Send + Sync + 'static,
{
    /// Move the engine onto a worker task.
    ///
    /// The worker stops once every [`EngineHandle`] is dropped.
    pub fn spawn(self) -> (EngineHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let handle = EngineHandle {
            sender,
            registry: self.registry().clone(),
            notifier: self.notifier().clone(),
            pending: self.pending().clone(),
        };
        let task = tokio::spawn(self.run(receiver));
        (handle, task)
    }

    async fn run(self, mut jobs: mpsc::UnboundedReceiver<Job>) {
        tracing::debug!("engine worker started");
        while let Some(job) = jobs.recv().await {
            self.process(job).await;
        }
        tracing::debug!("engine worker stopped");
    }

    async fn process(&self, job: Job) {
        // A dropped receiver means the caller gave up waiting; the work is
        // done either way.
        match job {
            Job::LocalIntent { id, intent, reply } => {
                let _ = reply.send(self.apply_local_intent(&id, intent).await);
            }
            Job::LocalDelete { id, reply } => {
                let _ = reply.send(self.request_local_delete(&id).await);
            }
            Job::Register { id, reply } => {
                let _ = reply.send(self.register_device(id).await);
            }
            Job::Reload { reply } => {
                let _ = reply.send(self.reload().await);
            }
            Job::Remote { topic, payload } => {
                let outcome = self.apply_remote_message(&topic, &payload).await;
                tracing::trace!(%topic, ?outcome, "remote message processed");
            }
            Job::BusStatus(connected) => self.bus_status(connected).await,
        }
    }
}

/// Cloneable front door to a running engine.
///
/// Reads go straight to the shared registry; writes are queued.
#[derive(Clone)]
pub struct EngineHandle {
    sender: mpsc::UnboundedSender<Job>,
    registry: SharedRegistry,
    notifier: ChangeNotifier,
    pending: PendingDeletes,
}

impl EngineHandle {
    /// # Errors
    ///
    /// See [`SyncEngine::apply_local_intent`]; [`SyncError::EngineStopped`]
    /// when the worker is gone.
    pub async fn apply_local_intent(
        &self,
        id: DeviceId,
        intent: LocalIntent,
    ) -> Result<DeviceRecord, SyncError> {
        self.request(|reply| Job::LocalIntent { id, intent, reply })
            .await
    }

    /// # Errors
    ///
    /// See [`SyncEngine::request_local_delete`]; [`SyncError::EngineStopped`]
    /// when the worker is gone.
    pub async fn request_local_delete(&self, id: DeviceId) -> Result<(), SyncError> {
        self.request(|reply| Job::LocalDelete { id, reply }).await
    }

    /// # Errors
    ///
    /// See [`SyncEngine::register_device`]; [`SyncError::EngineStopped`]
    /// when the worker is gone.
    pub async fn register_device(&self, id: DeviceId) -> Result<DeviceRecord, SyncError> {
        self.request(|reply| Job::Register { id, reply }).await
    }

    /// # Errors
    ///
    /// See [`SyncEngine::reload`]; [`SyncError::EngineStopped`] when the
    /// worker is gone.
    pub async fn reload(&self) -> Result<Vec<DeviceRecord>, SyncError> {
        self.request(|reply| Job::Reload { reply }).await
    }

    /// Queue a delivered bus message and return immediately.
    pub fn submit_remote(&self, topic: String, payload: String) {
        self.enqueue(Job::Remote { topic, payload });
    }

    /// Current device list, ordered by id.
    #[must_use]
    pub fn snapshot(&self) -> Vec<DeviceRecord> {
        self.registry.snapshot()
    }

    #[must_use]
    pub fn get(&self, id: &DeviceId) -> Option<DeviceRecord> {
        self.registry.get(id)
    }

    #[must_use]
    pub fn device_state(&self, id: &DeviceId) -> DeviceState {
        DeviceState::of(id, &self.registry, &self.pending)
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifier.subscribe()
    }

    async fn request<T>(&self, job: impl FnOnce(Reply<T>) -> Job) -> Result<T, SyncError> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(job(reply))
            .map_err(|_| SyncError::EngineStopped)?;
        response.await.map_err(|_| SyncError::EngineStopped)?
    }

    fn enqueue(&self, job: Job) {
        if self.sender.send(job).is_err() {
            tracing::warn!("engine worker stopped, dropping bus event");
        }
    }
}

impl BusEventSink for EngineHandle {
    fn dispatch(&self, event: BusEvent) {
        match event {
            BusEvent::Connected => self.enqueue(Job::BusStatus(true)),
            BusEvent::Disconnected => self.enqueue(Job::BusStatus(false)),
            BusEvent::Message { topic, payload } => self.submit_remote(topic, payload),
        }
    }
}
