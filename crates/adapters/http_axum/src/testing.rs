//! Stub ports and a running engine for handler tests.

use std::collections::BTreeMap;
use std::sync::Mutex;

use lightsync_app::engine::{EngineConfig, SyncEngine};
use lightsync_app::ports::{DeviceStore, MessageBus, Qos};
use lightsync_domain::command::TopicScheme;
use lightsync_domain::device::{DeviceId, DeviceRecord};
use lightsync_domain::error::SyncError;

use crate::state::AppState;

#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<DeviceId, DeviceRecord>>,
}

impl DeviceStore for MemoryStore {
    async fn insert_if_absent(
        &self,
        id: DeviceId,
        topic: String,
        default_name: String,
    ) -> Result<bool, SyncError> {
        let mut records = self.records.lock().unwrap();
        if records.contains_key(&id) {
            return Ok(false);
        }
        let mut record = DeviceRecord::first_sight(id.clone(), topic);
        record.name = default_name;
        records.insert(id, record);
        Ok(true)
    }

    async fn get_by_id(&self, id: DeviceId) -> Result<Option<DeviceRecord>, SyncError> {
        Ok(self.records.lock().unwrap().get(&id).cloned())
    }

    async fn get_all(&self) -> Result<Vec<DeviceRecord>, SyncError> {
        Ok(self.records.lock().unwrap().values().cloned().collect())
    }

    async fn update(&self, record: DeviceRecord) -> Result<bool, SyncError> {
        let mut records = self.records.lock().unwrap();
        match records.get_mut(&record.id) {
            Some(slot) => {
                *slot = record;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_by_id(&self, id: DeviceId) -> Result<bool, SyncError> {
        Ok(self.records.lock().unwrap().remove(&id).is_some())
    }
}

pub struct StubBus {
    connected: bool,
}

impl MessageBus for StubBus {
    async fn connect(&self) -> Result<(), SyncError> {
        Ok(())
    }

    async fn subscribe(&self, _topic: String, _qos: Qos) -> Result<(), SyncError> {
        Ok(())
    }

    async fn publish(&self, _topic: String, _payload: String, _qos: Qos) -> Result<(), SyncError> {
        if self.connected {
            Ok(())
        } else {
            Err(SyncError::BusUnavailable)
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

/// Spawn an engine over `records` and wrap its handle in an [`AppState`].
pub async fn spawn_state(records: Vec<DeviceRecord>, connected: bool) -> AppState {
    let store = MemoryStore::default();
    for record in records {
        store
            .records
            .lock()
            .unwrap()
            .insert(record.id.clone(), record);
    }
    let config = EngineConfig::new(TopicScheme::new("home", "light").unwrap());
    let (handle, _task) = SyncEngine::new(store, StubBus { connected }, config).spawn();
    handle.reload().await.unwrap();
    AppState::new(handle)
}

pub fn record(id: &str) -> DeviceRecord {
    DeviceRecord::first_sight(id.parse().unwrap(), format!("home/light/{id}"))
}
