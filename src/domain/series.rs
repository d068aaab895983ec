// Rolling time series - bounded FIFO buffers backing the charts
use serde::{Serialize, Serializer};
use std::collections::{HashMap, VecDeque};
use thiserror::Error;

/// One point/second for one hour.
pub const DEFAULT_CAPACITY: usize = 3600;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint {
    /// Seconds since the epoch.
    pub time: i64,
    pub value: f64,
}

impl SeriesPoint {
    pub fn new(time: i64, value: f64) -> Self {
        Self { time, value }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartId {
    SystemLoad,
    BatteryPercentage,
    BatteryChargeCurrent,
    BatteryVoltage,
}

impl ChartId {
    pub const ALL: [ChartId; 4] = [
        ChartId::SystemLoad,
        ChartId::BatteryPercentage,
        ChartId::BatteryChargeCurrent,
        ChartId::BatteryVoltage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChartId::SystemLoad => "system-load-plot",
            ChartId::BatteryPercentage => "battery-percentage-plot",
            ChartId::BatteryChargeCurrent => "battery-charge-current-plot",
            ChartId::BatteryVoltage => "battery-voltage-plot",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }

    /// Series drawn on this chart, in trace order.
    pub fn series(&self) -> &'static [SeriesId] {
        match self {
            ChartId::SystemLoad => &[SeriesId::LoadPower, SeriesId::LoadVa, SeriesId::PvInputPower],
            ChartId::BatteryPercentage => &[SeriesId::StateOfCharge],
            ChartId::BatteryChargeCurrent => &[
                SeriesId::BatteryCurrent,
                SeriesId::GridChargeCurrent,
                SeriesId::PvChargeCurrent,
            ],
            ChartId::BatteryVoltage => &[SeriesId::BatteryVoltage],
        }
    }
}

/// Chart ids serialize as their element names, e.g. `battery-voltage-plot`.
impl Serialize for ChartId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SeriesId {
    LoadPower,
    LoadVa,
    PvInputPower,
    StateOfCharge,
    BatteryCurrent,
    GridChargeCurrent,
    PvChargeCurrent,
    BatteryVoltage,
}

impl SeriesId {
    pub const ALL: [SeriesId; 8] = [
        SeriesId::LoadPower,
        SeriesId::LoadVa,
        SeriesId::PvInputPower,
        SeriesId::StateOfCharge,
        SeriesId::BatteryCurrent,
        SeriesId::GridChargeCurrent,
        SeriesId::PvChargeCurrent,
        SeriesId::BatteryVoltage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SeriesId::LoadPower => "load-power",
            SeriesId::LoadVa => "load-va",
            SeriesId::PvInputPower => "pv-input-power",
            SeriesId::StateOfCharge => "state-of-charge",
            SeriesId::BatteryCurrent => "battery-current",
            SeriesId::GridChargeCurrent => "grid-charge-current",
            SeriesId::PvChargeCurrent => "pv-charge-current",
            SeriesId::BatteryVoltage => "battery-voltage",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SeriesId::LoadPower => "Load Power",
            SeriesId::LoadVa => "Load VA",
            SeriesId::PvInputPower => "PV Input Power",
            SeriesId::StateOfCharge => "State of Charge",
            SeriesId::BatteryCurrent => "Battery Current",
            SeriesId::GridChargeCurrent => "Grid Charge Current",
            SeriesId::PvChargeCurrent => "PV Charge Current",
            SeriesId::BatteryVoltage => "Battery Voltage",
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SeriesError {
    #[error("series `{0}` has not been initialized")]
    UnknownSeries(&'static str),
    #[error("{ids} series ids but {points} points")]
    LengthMismatch { ids: usize, points: usize },
}

#[derive(Debug, Clone)]
pub struct RollingSeries {
    capacity: usize,
    points: VecDeque<SeriesPoint>,
}

impl RollingSeries {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            points: VecDeque::with_capacity(capacity.max(1)),
        }
    }

    pub fn push(&mut self, point: SeriesPoint) {
        self.points.push_back(point);
        while self.points.len() > self.capacity {
            self.points.pop_front();
        }
    }

    /// Replace the contents, keeping only the newest `capacity` points.
    pub fn replace(&mut self, points: Vec<SeriesPoint>) {
        let skip = points.len().saturating_sub(self.capacity);
        self.points.clear();
        self.points.extend(points.into_iter().skip(skip));
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SeriesPoint> {
        self.points.iter()
    }
}

/// Every chart series keyed by id. Series only exist after `initialize`.
#[derive(Debug, Clone)]
pub struct SeriesStore {
    capacity: usize,
    series: HashMap<SeriesId, RollingSeries>,
}

impl SeriesStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            series: HashMap::new(),
        }
    }

    pub fn initialize(&mut self, id: SeriesId, points: Vec<SeriesPoint>) {
        self.series
            .entry(id)
            .or_insert_with(|| RollingSeries::new(self.capacity))
            .replace(points);
    }

    pub fn contains(&self, id: SeriesId) -> bool {
        self.series.contains_key(&id)
    }

    pub fn append(&mut self, id: SeriesId, point: SeriesPoint) -> Result<(), SeriesError> {
        self.series
            .get_mut(&id)
            .ok_or(SeriesError::UnknownSeries(id.as_str()))?
            .push(point);
        Ok(())
    }

    /// Append one point to each series, or to none of them.
    pub fn append_many(&mut self, ids: &[SeriesId], points: &[SeriesPoint]) -> Result<(), SeriesError> {
        if ids.len() != points.len() {
            return Err(SeriesError::LengthMismatch {
                ids: ids.len(),
                points: points.len(),
            });
        }
        if let Some(missing) = ids.iter().find(|id| !self.contains(**id)) {
            return Err(SeriesError::UnknownSeries(missing.as_str()));
        }

        for (id, point) in ids.iter().zip(points) {
            self.append(*id, *point)?;
        }
        Ok(())
    }

    pub fn get(&self, id: SeriesId) -> Option<&RollingSeries> {
        self.series.get(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(range: std::ops::Range<i64>) -> Vec<SeriesPoint> {
        range.map(|t| SeriesPoint::new(t, t as f64 * 1.5)).collect()
    }

    #[test]
    fn test_overflow_evicts_oldest() {
        let mut series = RollingSeries::new(5);
        for p in points(0..6) {
            series.push(p);
        }
        assert_eq!(series.len(), 5);
        let kept: Vec<_> = series.iter().copied().collect();
        assert_eq!(kept, points(1..6));
    }

    #[test]
    fn test_default_capacity_window() {
        let mut series = RollingSeries::new(DEFAULT_CAPACITY);
        for p in points(0..DEFAULT_CAPACITY as i64 + 1) {
            series.push(p);
        }
        assert_eq!(series.len(), DEFAULT_CAPACITY);
        assert_eq!(series.iter().next().unwrap().time, 1);
    }

    #[test]
    fn test_replace_keeps_newest() {
        let mut series = RollingSeries::new(3);
        series.replace(points(0..10));
        let kept: Vec<_> = series.iter().map(|p| p.time).collect();
        assert_eq!(kept, vec![7, 8, 9]);

        series.replace(Vec::new());
        assert!(series.is_empty());
    }

    #[test]
    fn test_append_requires_initialized_series() {
        let mut store = SeriesStore::new(10);
        let err = store
            .append(SeriesId::LoadPower, SeriesPoint::new(1, 1.0))
            .unwrap_err();
        assert_eq!(err, SeriesError::UnknownSeries("load-power"));
    }

    #[test]
    fn test_append_many_is_all_or_nothing() {
        let mut store = SeriesStore::new(10);
        store.initialize(SeriesId::GridChargeCurrent, points(0..2));

        let ids = [SeriesId::GridChargeCurrent, SeriesId::PvChargeCurrent];
        let batch = [SeriesPoint::new(5, 1.0), SeriesPoint::new(5, 2.0)];
        assert!(store.append_many(&ids, &batch).is_err());
        assert_eq!(store.get(SeriesId::GridChargeCurrent).unwrap().len(), 2);
        assert!(!store.contains(SeriesId::PvChargeCurrent));

        store.initialize(SeriesId::PvChargeCurrent, points(0..2));
        store.append_many(&ids, &batch).unwrap();
        assert_eq!(store.get(SeriesId::GridChargeCurrent).unwrap().len(), 3);
        assert_eq!(store.get(SeriesId::PvChargeCurrent).unwrap().len(), 3);
    }

    #[test]
    fn test_append_many_length_mismatch() {
        let mut store = SeriesStore::new(10);
        store.initialize(SeriesId::LoadPower, Vec::new());
        let err = store
            .append_many(&[SeriesId::LoadPower], &[])
            .unwrap_err();
        assert_eq!(err, SeriesError::LengthMismatch { ids: 1, points: 0 });
        assert!(store.get(SeriesId::LoadPower).unwrap().is_empty());
    }

    #[test]
    fn test_chart_lookup() {
        assert_eq!(ChartId::from_name("battery-voltage-plot"), Some(ChartId::BatteryVoltage));
        assert_eq!(ChartId::from_name("nope"), None);
        let total: usize = ChartId::ALL.iter().map(|c| c.series().len()).sum();
        assert_eq!(total, SeriesId::ALL.len());
    }

    #[test]
    fn test_chart_id_serializes_as_element_name() {
        for chart in ChartId::ALL {
            assert_eq!(serde_json::to_value(chart).unwrap(), chart.as_str());
        }
    }
}
