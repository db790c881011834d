//! In-memory port fakes shared by the engine and worker tests.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use lightsync_domain::device::{DeviceId, DeviceRecord};
use lightsync_domain::error::{MissingRowError, SyncError};

use crate::ports::{DeviceStore, MessageBus, Qos};

#[derive(Default)]
pub struct InMemoryStore {
    records: Mutex<BTreeMap<DeviceId, DeviceRecord>>,
    pub fail_insert: AtomicBool,
    pub fail_update: AtomicBool,
    pub fail_delete: AtomicBool,
    pub writes: AtomicUsize,
}

impl InMemoryStore {
    pub fn with(records: impl IntoIterator<Item = DeviceRecord>) -> Arc<Self> {
        let store = Self::default();
        {
            let mut map = store.records.lock().unwrap();
            for record in records {
                map.insert(record.id.clone(), record);
            }
        }
        Arc::new(store)
    }

    pub fn record(&self, id: &DeviceId) -> Option<DeviceRecord> {
        self.records.lock().unwrap().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn failure(id: &DeviceId) -> SyncError {
        SyncError::Storage(Box::new(MissingRowError(id.clone())))
    }
}

impl DeviceStore for InMemoryStore {
    fn insert_if_absent(
        &self,
        id: DeviceId,
        topic: String,
        default_name: String,
    ) -> impl Future<Output = Result<bool, SyncError>> + Send {
        let result = if self.fail_insert.load(Ordering::SeqCst) {
            Err(Self::failure(&id))
        } else {
            let mut records = self.records.lock().unwrap();
            if records.contains_key(&id) {
                Ok(false)
            } else {
                self.writes.fetch_add(1, Ordering::SeqCst);
                let mut record = DeviceRecord::first_sight(id.clone(), topic);
                record.name = default_name;
                records.insert(id, record);
                Ok(true)
            }
        };
        async { result }
    }

    fn get_by_id(
        &self,
        id: DeviceId,
    ) -> impl Future<Output = Result<Option<DeviceRecord>, SyncError>> + Send {
        let result = self.record(&id);
        async { Ok(result) }
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<DeviceRecord>, SyncError>> + Send {
        let result: Vec<_> = self.records.lock().unwrap().values().cloned().collect();
        async { Ok(result) }
    }

    fn update(&self, record: DeviceRecord) -> impl Future<Output = Result<bool, SyncError>> + Send {
        let result = if self.fail_update.load(Ordering::SeqCst) {
            Err(Self::failure(&record.id))
        } else {
            let mut records = self.records.lock().unwrap();
            match records.get_mut(&record.id) {
                Some(slot) => {
                    self.writes.fetch_add(1, Ordering::SeqCst);
                    *slot = record;
                    Ok(true)
                }
                None => Ok(false),
            }
        };
        async { result }
    }

    fn delete_by_id(&self, id: DeviceId) -> impl Future<Output = Result<bool, SyncError>> + Send {
        let result = if self.fail_delete.load(Ordering::SeqCst) {
            Err(Self::failure(&id))
        } else {
            let removed = self.records.lock().unwrap().remove(&id).is_some();
            if removed {
                self.writes.fetch_add(1, Ordering::SeqCst);
            }
            Ok(removed)
        };
        async { result }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub topic: String,
    pub payload: String,
    pub qos: Qos,
}

pub struct RecordingBus {
    pub connected: AtomicBool,
    pub fail_publish: AtomicBool,
    published: Mutex<Vec<Published>>,
    subscriptions: Mutex<Vec<(String, Qos)>>,
}

impl RecordingBus {
    pub fn connected() -> Arc<Self> {
        Arc::new(Self {
            connected: AtomicBool::new(true),
            fail_publish: AtomicBool::new(false),
            published: Mutex::default(),
            subscriptions: Mutex::default(),
        })
    }

    pub fn disconnected() -> Arc<Self> {
        let bus = Self::connected();
        bus.connected.store(false, Ordering::SeqCst);
        bus
    }

    pub fn published(&self) -> Vec<Published> {
        self.published.lock().unwrap().clone()
    }

    pub fn payloads(&self) -> Vec<String> {
        self.published().into_iter().map(|p| p.payload).collect()
    }

    pub fn subscriptions(&self) -> Vec<(String, Qos)> {
        self.subscriptions.lock().unwrap().clone()
    }
}

impl MessageBus for RecordingBus {
    fn connect(&self) -> impl Future<Output = Result<(), SyncError>> + Send {
        self.connected.store(true, Ordering::SeqCst);
        async { Ok(()) }
    }

    fn subscribe(
        &self,
        topic: String,
        qos: Qos,
    ) -> impl Future<Output = Result<(), SyncError>> + Send {
        self.subscriptions.lock().unwrap().push((topic, qos));
        async { Ok(()) }
    }

    fn publish(
        &self,
        topic: String,
        payload: String,
        qos: Qos,
    ) -> impl Future<Output = Result<(), SyncError>> + Send {
        let result = if !self.connected.load(Ordering::SeqCst) {
            Err(SyncError::BusUnavailable)
        } else if self.fail_publish.load(Ordering::SeqCst) {
            Err(SyncError::Bus("broker rejected publish".into()))
        } else {
            self.published.lock().unwrap().push(Published {
                topic,
                payload,
                qos,
            });
            Ok(())
        };
        async { result }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
