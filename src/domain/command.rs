// Control commands accepted by the device API
use serde::Serialize;

/// Guarded UI control, disabled while its command is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ControlId {
    LineModeBtn,
    BatteryModeBtn,
    TurnOffGridBtn,
    ChargeGridBtn,
}

impl ControlId {
    pub const ALL: [ControlId; 4] = [
        ControlId::LineModeBtn,
        ControlId::BatteryModeBtn,
        ControlId::TurnOffGridBtn,
        ControlId::ChargeGridBtn,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SwitchToLineMode,
    SwitchToBatteryMode,
    TurnOffGridCharging,
    TurnOnGridCharging { charge_current: Option<u32> },
}

impl Command {
    /// Parse the wire name; `charge_current` only applies to grid charging.
    pub fn from_name(name: &str, charge_current: Option<u32>) -> Option<Self> {
        match name {
            "SWITCH_TO_LINE_MODE" => Some(Command::SwitchToLineMode),
            "SWITCH_TO_BATTERY_MODE" => Some(Command::SwitchToBatteryMode),
            "TURN_OFF_GRID_CHARGING" => Some(Command::TurnOffGridCharging),
            "TURN_ON_GRID_CHARGING" => Some(Command::TurnOnGridCharging { charge_current }),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::SwitchToLineMode => "SWITCH_TO_LINE_MODE",
            Command::SwitchToBatteryMode => "SWITCH_TO_BATTERY_MODE",
            Command::TurnOffGridCharging => "TURN_OFF_GRID_CHARGING",
            Command::TurnOnGridCharging { .. } => "TURN_ON_GRID_CHARGING",
        }
    }

    pub fn control(&self) -> ControlId {
        match self {
            Command::SwitchToLineMode => ControlId::LineModeBtn,
            Command::SwitchToBatteryMode => ControlId::BatteryModeBtn,
            Command::TurnOffGridCharging => ControlId::TurnOffGridBtn,
            Command::TurnOnGridCharging { .. } => ControlId::ChargeGridBtn,
        }
    }

    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        match self {
            Command::TurnOnGridCharging {
                charge_current: Some(amps),
            } => vec![("charge_current", amps.to_string())],
            _ => Vec::new(),
        }
    }

    pub fn success_message(&self) -> &'static str {
        match self {
            Command::SwitchToLineMode => {
                "Switched to line mode (this may take a few seconds to update)."
            }
            Command::SwitchToBatteryMode => {
                "Switched to battery mode (this may take a few seconds to update)."
            }
            Command::TurnOffGridCharging => "Turned off grid charging.",
            Command::TurnOnGridCharging { .. } => "Turned on grid charging.",
        }
    }

    pub fn failure_message(&self) -> &'static str {
        match self {
            Command::SwitchToLineMode => "Failed to switch to line mode!",
            Command::SwitchToBatteryMode => "Failed to switch to battery mode!",
            Command::TurnOffGridCharging => "Failed to turn off grid charging!",
            Command::TurnOnGridCharging { .. } => "Failed to turn on grid charging!",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name() {
        assert_eq!(
            Command::from_name("SWITCH_TO_LINE_MODE", Some(10)),
            Some(Command::SwitchToLineMode)
        );
        assert_eq!(
            Command::from_name("TURN_ON_GRID_CHARGING", Some(10)),
            Some(Command::TurnOnGridCharging { charge_current: Some(10) })
        );
        assert_eq!(Command::from_name("REBOOT", None), None);
    }

    #[test]
    fn test_query_params() {
        let cmd = Command::TurnOnGridCharging { charge_current: Some(30) };
        assert_eq!(cmd.query_params(), vec![("charge_current", "30".to_string())]);
        assert!(Command::TurnOnGridCharging { charge_current: None }
            .query_params()
            .is_empty());
        assert!(Command::SwitchToBatteryMode.query_params().is_empty());
    }
}
