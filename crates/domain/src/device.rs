//! Device — the persisted/cached state unit for one physical light.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::command::Command;
use crate::error::{SyncError, ValidationError};

/// Name given to a device the first time it is seen.
pub const DEFAULT_DEVICE_NAME: &str = "ESP Device";

/// Identifier assigned by the physical device.
///
/// Opaque and never generated locally; the only constraint is that it can
/// be embedded as a single topic segment.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceId(String);

impl DeviceId {
    /// Validate and wrap an identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyId`] for an empty string and
    /// [`ValidationError::InvalidId`] when it contains a topic separator or
    /// an MQTT wildcard.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if value.is_empty() {
            return Err(ValidationError::EmptyId);
        }
        if value.contains(['/', '+', '#']) {
            return Err(ValidationError::InvalidId);
        }
        Ok(Self(value))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DeviceId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for DeviceId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DeviceId> for String {
    fn from(value: DeviceId) -> Self {
        value.0
    }
}

/// A light known to the system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub id: DeviceId,
    pub name: String,
    pub command_topic: String,
    pub light_on: bool,
    pub rgb_mode: bool,
}

impl DeviceRecord {
    /// Record as created on first sight: default name, light off, plain mode.
    #[must_use]
    pub fn first_sight(id: DeviceId, command_topic: impl Into<String>) -> Self {
        Self {
            id,
            name: DEFAULT_DEVICE_NAME.to_string(),
            command_topic: command_topic.into(),
            light_on: false,
            rgb_mode: false,
        }
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Validation`] when `name` or `command_topic` is empty.
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        if self.command_topic.is_empty() {
            return Err(ValidationError::EmptyTopic.into());
        }
        Ok(())
    }

    /// Apply a remote command, returning `true` when a field changed.
    ///
    /// Only the light state is taken from the payload. The `RGB` suffix tells
    /// the firmware which driver to use and is not treated as a mode report.
    pub fn apply_command(&mut self, command: &Command) -> bool {
        match command.light_state() {
            Some(on) if on != self.light_on => {
                self.light_on = on;
                true
            }
            _ => false,
        }
    }

    /// Wire command that drives the physical device to this record's state.
    #[must_use]
    pub fn wire_command(&self) -> Command {
        Command::for_state(self.light_on, self.rgb_mode)
    }
}
