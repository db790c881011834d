//! Command protocol — topic structure and payload vocabulary shared with the
//! physical devices.
//!
//! Per-device topics have the shape `<root>/<category>/<deviceId>`; only the
//! third segment is interpreted. Payloads are plain case-sensitive strings.

use std::fmt;

use crate::device::DeviceId;
use crate::error::ValidationError;

const ON: &str = "on";
const OFF: &str = "off";
const ON_RGB: &str = "onRGB";
const OFF_RGB: &str = "offRGB";
const DELETE_NVS: &str = "deleteNVS";

/// Index of the device id inside a `/`-split topic.
const DEVICE_SEGMENT: usize = 2;

/// A topic could not be mapped to a device id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopicParseError {
    #[error("topic is empty")]
    Empty,
    #[error("topic {0:?} has fewer than 3 segments")]
    TooShort(String),
    #[error("topic {0:?} has an empty or invalid device segment")]
    InvalidDevice(String),
}

/// Extract the device id from a per-device topic.
///
/// # Errors
///
/// Returns [`TopicParseError`] when the topic is empty, has fewer than three
/// `/`-separated segments, or the device segment is blank.
pub fn parse_topic(topic: &str) -> Result<DeviceId, TopicParseError> {
    if topic.is_empty() {
        return Err(TopicParseError::Empty);
    }
    let segment = topic
        .split('/')
        .nth(DEVICE_SEGMENT)
        .ok_or_else(|| TopicParseError::TooShort(topic.to_string()))?;
    DeviceId::new(segment).map_err(|_| TopicParseError::InvalidDevice(topic.to_string()))
}

/// A payload exchanged on a device topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    On,
    Off,
    OnRgb,
    OffRgb,
    DeleteNvs,
    /// Anything outside the vocabulary. Accepted, but carries no state.
    Unrecognized(String),
}

impl Command {
    /// Interpret a payload. Never fails: unknown payloads map to
    /// [`Command::Unrecognized`].
    #[must_use]
    pub fn parse(payload: &str) -> Self {
        match payload {
            ON => Self::On,
            OFF => Self::Off,
            ON_RGB => Self::OnRgb,
            OFF_RGB => Self::OffRgb,
            DELETE_NVS => Self::DeleteNvs,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    /// Outbound command for a target state. The mode is encoded in the suffix
    /// so the firmware picks the right driver.
    #[must_use]
    pub fn for_state(light_on: bool, rgb_mode: bool) -> Self {
        match (light_on, rgb_mode) {
            (true, false) => Self::On,
            (false, false) => Self::Off,
            (true, true) => Self::OnRgb,
            (false, true) => Self::OffRgb,
        }
    }

    /// Light state asserted by this command, if any.
    #[must_use]
    pub fn light_state(&self) -> Option<bool> {
        match self {
            Self::On | Self::OnRgb => Some(true),
            Self::Off | Self::OffRgb => Some(false),
            Self::DeleteNvs | Self::Unrecognized(_) => None,
        }
    }

    #[must_use]
    pub fn is_delete(&self) -> bool {
        matches!(self, Self::DeleteNvs)
    }

    /// Wire representation.
    #[must_use]
    pub fn as_payload(&self) -> &str {
        match self {
            Self::On => ON,
            Self::Off => OFF,
            Self::OnRgb => ON_RGB,
            Self::OffRgb => OFF_RGB,
            Self::DeleteNvs => DELETE_NVS,
            Self::Unrecognized(raw) => raw,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_payload())
    }
}

/// Builds per-device topics for devices registered locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicScheme {
    root: String,
    category: String,
}

impl TopicScheme {
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidTopicSegment`] when a segment is
    /// empty or contains `/`, `+` or `#`.
    pub fn new(
        root: impl Into<String>,
        category: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let root = root.into();
        let category = category.into();
        for segment in [&root, &category] {
            if segment.is_empty() || segment.contains(['/', '+', '#']) {
                return Err(ValidationError::InvalidTopicSegment(segment.clone()));
            }
        }
        Ok(Self { root, category })
    }

    /// `<root>/<category>/<id>`
    #[must_use]
    pub fn device_topic(&self, id: &DeviceId) -> String {
        format!("{}/{}/{}", self.root, self.category, id)
    }

    /// Wildcard filter matching every device topic of this scheme.
    #[must_use]
    pub fn subscription_filter(&self) -> String {
        format!("{}/{}/+", self.root, self.category)
    }
}
