//! Persistent store port — durable storage for device records.

use std::future::Future;

use lightsync_domain::device::{DeviceId, DeviceRecord};
use lightsync_domain::error::SyncError;

/// Durable keyed store of [`DeviceRecord`]s.
///
/// Implementations report driver failures as [`SyncError::Storage`]; the
/// engine decides whether a failure is a read or a write failure.
pub trait DeviceStore {
    /// Insert a first-sight record unless one already exists for `id`.
    ///
    /// Returns `true` when a row was created.
    fn insert_if_absent(
        &self,
        id: DeviceId,
        topic: String,
        default_name: String,
    ) -> impl Future<Output = Result<bool, SyncError>> + Send;

    /// Get a record by device id.
    fn get_by_id(
        &self,
        id: DeviceId,
    ) -> impl Future<Output = Result<Option<DeviceRecord>, SyncError>> + Send;

    /// Get all records, ordered by device id.
    fn get_all(&self) -> impl Future<Output = Result<Vec<DeviceRecord>, SyncError>> + Send;

    /// Overwrite the mutable fields of an existing record.
    ///
    /// Returns `false` when no record exists for `record.id`.
    fn update(&self, record: DeviceRecord) -> impl Future<Output = Result<bool, SyncError>> + Send;

    /// Delete a record. Returns `true` when a row was removed.
    fn delete_by_id(&self, id: DeviceId) -> impl Future<Output = Result<bool, SyncError>> + Send;
}

impl<T: DeviceStore + Send + Sync> DeviceStore for std::sync::Arc<T> {
    fn insert_if_absent(
        &self,
        id: DeviceId,
        topic: String,
        default_name: String,
    ) -> impl Future<Output = Result<bool, SyncError>> + Send {
        (**self).insert_if_absent(id, topic, default_name)
    }

    fn get_by_id(
        &self,
        id: DeviceId,
    ) -> impl Future<Output = Result<Option<DeviceRecord>, SyncError>> + Send {
        (**self).get_by_id(id)
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<DeviceRecord>, SyncError>> + Send {
        (**self).get_all()
    }

    fn update(&self, record: DeviceRecord) -> impl Future<Output = Result<bool, SyncError>> + Send {
        (**self).update(record)
    }

    fn delete_by_id(&self, id: DeviceId) -> impl Future<Output = Result<bool, SyncError>> + Send {
        (**self).delete_by_id(id)
    }
}
