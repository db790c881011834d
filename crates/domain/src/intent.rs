//! Local intents — mutations requested by the user through a driving adapter.

use serde::{Deserialize, Serialize};

use crate::device::DeviceRecord;

/// A user action on a single device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "value", rename_all = "snake_case")]
pub enum LocalIntent {
    ToggleLight,
    ToggleMode,
    SetLight(bool),
    SetMode(bool),
    Rename(String),
}

impl LocalIntent {
    /// Apply the intent to `record` in place.
    ///
    /// Returns `true` when the physical device must be told about the new
    /// state, i.e. for every intent except a rename.
    pub fn apply(&self, record: &mut DeviceRecord) -> bool {
        match self {
            Self::ToggleLight => record.light_on = !record.light_on,
            Self::ToggleMode => record.rgb_mode = !record.rgb_mode,
            Self::SetLight(on) => record.light_on = *on,
            Self::SetMode(rgb) => record.rgb_mode = *rgb,
            Self::Rename(name) => {
                record.name = name.trim().to_string();
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::device::DeviceId;

    fn record() -> DeviceRecord {
        DeviceRecord::first_sight(DeviceId::new("esp42").unwrap(), "home/light/esp42")
    }

    #[test]
    fn should_toggle_light_and_request_publish() {
        let mut device = record();
        assert!(LocalIntent::ToggleLight.apply(&mut device));
        assert!(device.light_on);
        assert_eq!(device.wire_command(), Command::On);
    }

    #[test]
    fn should_toggle_mode_and_keep_light_state() {
        let mut device = record();
        device.light_on = true;
        assert!(LocalIntent::ToggleMode.apply(&mut device));
        assert!(device.rgb_mode);
        assert_eq!(device.wire_command(), Command::OnRgb);
    }

    #[test]
    fn should_trim_name_and_skip_publish_when_renaming() {
        let mut device = record();
        assert!(!LocalIntent::Rename("  Desk lamp ".to_string()).apply(&mut device));
        assert_eq!(device.name, "Desk lamp");
    }

    #[test]
    fn should_deserialize_tagged_json() {
        let intent: LocalIntent =
            serde_json::from_str(r#"{"action":"set_light","value":true}"#).unwrap();
        assert_eq!(intent, LocalIntent::SetLight(true));
        let intent: LocalIntent = serde_json::from_str(r#"{"action":"toggle_mode"}"#).unwrap();
        assert_eq!(intent, LocalIntent::ToggleMode);
    }
}
