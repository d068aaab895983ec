// Device snapshot domain model and telemetry frame decoding
use serde::Deserialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("frame is not a valid telemetry document: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unrecognized device type `{0}`")]
    UnknownDeviceKind(String),
    #[error("malformed {kind} state: {source}")]
    InvalidState {
        kind: DeviceKind,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    Inverter,
    Battery,
}

impl DeviceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceKind::Inverter => "inverter",
            DeviceKind::Battery => "battery",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridState {
    On,
    Off,
}

/// Style class of an inverter mode string. Only line power is told apart; the
/// label itself is shown as reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Line,
    Inverter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargerSource {
    Solar,
    Grid,
}

impl GridState {
    pub fn label(&self) -> &'static str {
        match self {
            GridState::On => "ON",
            GridState::Off => "OFF",
        }
    }
}

impl OutputMode {
    pub fn from_raw(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("line") {
            OutputMode::Line
        } else {
            OutputMode::Inverter
        }
    }
}

impl ChargerSource {
    pub fn from_raw(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("solar") {
            ChargerSource::Solar
        } else {
            ChargerSource::Grid
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InverterState {
    pub time_updated: f64,
    pub grid_state: GridState,
    /// Mode strings are kept as reported, e.g. `line`, `battery`, `sbu`.
    pub output_mode: String,
    pub output_voltage: f64,
    pub output_frequency: f64,
    pub selected_mode: String,
    pub selected_charger: String,
    pub pv_input_power: f64,
    pub load_power: f64,
    pub load_va: f64,
    pub load_percentage: f64,
    pub grid_charge_current: f64,
    pub pv_charge_current: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BatteryState {
    pub time_updated: f64,
    pub state_of_charge: f64,
    pub voltage: f64,
    pub current: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeviceSnapshot {
    Inverter(InverterState),
    Battery(BatteryState),
}

#[derive(Debug, Deserialize)]
struct RawFrame {
    device_info: RawDeviceInfo,
    device_state: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct RawDeviceInfo {
    device_type: String,
}

/// Decode one telemetry frame. Missing or mistyped fields are errors, never
/// defaulted.
pub fn parse(raw: &str) -> Result<DeviceSnapshot, SnapshotError> {
    let frame: RawFrame = serde_json::from_str(raw)?;
    from_frame(frame)
}

/// Same as [`parse`] for an already-decoded document, e.g. a `/devices/{name}/` response.
pub fn parse_value(value: serde_json::Value) -> Result<DeviceSnapshot, SnapshotError> {
    let frame: RawFrame = serde_json::from_value(value)?;
    from_frame(frame)
}

fn from_frame(frame: RawFrame) -> Result<DeviceSnapshot, SnapshotError> {
    let kind = match frame.device_info.device_type.as_str() {
        "inverter" => DeviceKind::Inverter,
        "battery" => DeviceKind::Battery,
        other => return Err(SnapshotError::UnknownDeviceKind(other.to_string())),
    };

    let invalid = |source| SnapshotError::InvalidState { kind, source };
    match kind {
        DeviceKind::Inverter => serde_json::from_value(frame.device_state)
            .map(DeviceSnapshot::Inverter)
            .map_err(invalid),
        DeviceKind::Battery => serde_json::from_value(frame.device_state)
            .map(DeviceSnapshot::Battery)
            .map_err(invalid),
    }
}

impl DeviceSnapshot {
    pub fn kind(&self) -> DeviceKind {
        match self {
            DeviceSnapshot::Inverter(_) => DeviceKind::Inverter,
            DeviceSnapshot::Battery(_) => DeviceKind::Battery,
        }
    }

    /// Whole seconds since the epoch; sub-second precision is dropped.
    pub fn time_updated(&self) -> i64 {
        let t = match self {
            DeviceSnapshot::Inverter(s) => s.time_updated,
            DeviceSnapshot::Battery(s) => s.time_updated,
        };
        t as i64
    }

    /// Values the producer should have kept in range but did not.
    pub fn quality_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        let mut fraction = |name: &str, value: f64| {
            if !(0.0..=1.0).contains(&value) {
                issues.push(format!("{name}={value} outside [0, 1]"));
            }
        };

        match self {
            DeviceSnapshot::Inverter(s) => fraction("load_percentage", s.load_percentage),
            DeviceSnapshot::Battery(s) => fraction("state_of_charge", s.state_of_charge),
        }
        issues
    }
}
