//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into [`SyncError`]
//! via `From`, so port boundaries only ever see this one type.

use crate::command::TopicParseError;
use crate::device::DeviceId;

/// Boxed error coming from an adapter (database driver, MQTT client, …).
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Top-level error for the synchronization engine and its ports.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A topic could not be mapped to a device id.
    #[error("malformed topic")]
    Parse(#[from] TopicParseError),

    /// The requested device is not known.
    #[error("device not found")]
    DeviceNotFound(#[from] NotFoundError),

    /// A domain invariant was violated.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// Writing to the persistent store failed; in-memory state was not changed.
    #[error("store write failed")]
    StoreWriteFailed(#[source] BoxedError),

    /// Deleting a device from the persistent store failed; the device is kept.
    #[error("failed to delete device {id}")]
    DeleteFailed {
        id: DeviceId,
        #[source]
        source: BoxedError,
    },

    /// The message bus is disconnected.
    #[error("message bus unavailable")]
    BusUnavailable,

    /// The message bus reported a transport error.
    #[error("message bus error")]
    Bus(#[source] BoxedError),

    /// The persistent store reported an error while reading.
    #[error("storage error")]
    Storage(#[source] BoxedError),

    /// The engine worker has shut down and cannot accept work.
    #[error("synchronization engine stopped")]
    EngineStopped,
}

impl SyncError {
    /// Reclassify an error returned by a store write.
    ///
    /// Storage-layer failures become [`SyncError::StoreWriteFailed`]; domain
    /// errors pass through untouched.
    #[must_use]
    pub fn into_write_failure(self) -> Self {
        match self {
            Self::Storage(err) => Self::StoreWriteFailed(err),
            other => other,
        }
    }
}

/// A lookup did not match any known record.
#[derive(Debug, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

impl NotFoundError {
    /// Shorthand for a missing device.
    #[must_use]
    pub fn device(id: &DeviceId) -> Self {
        Self {
            entity: "Device",
            id: id.to_string(),
        }
    }
}

/// Domain invariant violations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("device id must not be empty")]
    EmptyId,
    #[error("device id must not contain '/', '+' or '#'")]
    InvalidId,
    #[error("name must not be empty")]
    EmptyName,
    #[error("command topic must not be empty")]
    EmptyTopic,
    #[error("topic segment {0:?} must be non-empty and free of '/', '+' and '#'")]
    InvalidTopicSegment(String),
}

/// A store write reported that no row was affected.
#[derive(Debug, thiserror::Error)]
#[error("no stored record for device {0}")]
pub struct MissingRowError(pub DeviceId);
