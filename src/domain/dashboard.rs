// Dashboard domain model - indicator slots and the rendered view
use super::command::ControlId;
use super::series::{ChartId, SeriesPoint};
use super::threshold::StyleBucket;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndicatorId {
    GridStatus,
    GridOffSince,
    OutputMode,
    OutputVoltage,
    OutputFrequency,
    SelectedMode,
    SelectedCharger,
    PvInput,
    LoadPower,
    LoadPowerProgressBar,
    BatterySoc,
    BatterySocProgressBar,
    BatteryChargeCurrent,
    ControlUpdate,
    DashboardStatus,
    StreamStatus,
}

impl IndicatorId {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndicatorId::GridStatus => "grid-status",
            IndicatorId::GridOffSince => "grid-off-since",
            IndicatorId::OutputMode => "output-mode",
            IndicatorId::OutputVoltage => "output-voltage",
            IndicatorId::OutputFrequency => "output-frequency",
            IndicatorId::SelectedMode => "selected-mode",
            IndicatorId::SelectedCharger => "selected-charger",
            IndicatorId::PvInput => "pv-input",
            IndicatorId::LoadPower => "load-power",
            IndicatorId::LoadPowerProgressBar => "load-power-progress-bar",
            IndicatorId::BatterySoc => "battery-soc",
            IndicatorId::BatterySocProgressBar => "battery-soc-progress-bar",
            IndicatorId::BatteryChargeCurrent => "battery-charge-current",
            IndicatorId::ControlUpdate => "control-update",
            IndicatorId::DashboardStatus => "dashboard-status",
            IndicatorId::StreamStatus => "stream-status",
        }
    }
}

impl Serialize for IndicatorId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Indicator {
    pub text: String,
    pub style: StyleBucket,
}

impl Indicator {
    pub fn new(text: impl Into<String>, style: StyleBucket) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

/// Point-in-time copy of everything a renderer needs for the status panel.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub indicators: BTreeMap<IndicatorId, Indicator>,
    pub controls: BTreeMap<ControlId, bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeriesView {
    pub id: &'static str,
    pub name: &'static str,
    pub points: Vec<SeriesPoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartView {
    pub id: ChartId,
    pub series: Vec<SeriesView>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_keys_are_slot_names() {
        let mut indicators = BTreeMap::new();
        indicators.insert(
            IndicatorId::LoadPowerProgressBar,
            Indicator::new("20%", StyleBucket::Warning),
        );
        let view = DashboardView {
            indicators,
            controls: BTreeMap::new(),
        };

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["indicators"]["load-power-progress-bar"]["text"], "20%");
        assert_eq!(json["indicators"]["load-power-progress-bar"]["style"], "warning");
    }
}
