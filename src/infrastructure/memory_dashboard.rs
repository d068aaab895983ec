// In-memory dashboard surface - indicator slots, controls and chart series
use crate::application::dashboard_sink::DashboardSink;
use crate::domain::command::ControlId;
use crate::domain::dashboard::{ChartView, DashboardView, Indicator, IndicatorId, SeriesView};
use crate::domain::series::{ChartId, SeriesError, SeriesId, SeriesPoint, SeriesStore};
use crate::domain::threshold::StyleBucket;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Every write takes the single lock, so readers never observe half of a batch.
pub struct MemoryDashboard {
    state: RwLock<State>,
}

struct State {
    indicators: BTreeMap<IndicatorId, Indicator>,
    controls: BTreeMap<ControlId, bool>,
    series: SeriesStore,
    revision: u64,
}

impl MemoryDashboard {
    pub fn new(capacity: usize) -> Self {
        let controls = ControlId::ALL.into_iter().map(|c| (c, true)).collect();
        Self {
            state: RwLock::new(State {
                indicators: BTreeMap::new(),
                controls,
                series: SeriesStore::new(capacity),
                revision: 0,
            }),
        }
    }

    pub fn view(&self) -> DashboardView {
        let state = self.state.read();
        DashboardView {
            indicators: state.indicators.clone(),
            controls: state.controls.clone(),
        }
    }

    /// Series that have not been initialized yet are left out.
    pub fn chart(&self, chart: ChartId) -> ChartView {
        let state = self.state.read();
        let series = chart
            .series()
            .iter()
            .filter_map(|id| {
                state.series.get(*id).map(|s| SeriesView {
                    id: id.as_str(),
                    name: id.name(),
                    points: s.iter().copied().collect(),
                })
            })
            .collect();
        ChartView { id: chart, series }
    }

    pub fn indicator(&self, id: IndicatorId) -> Option<Indicator> {
        self.state.read().indicators.get(&id).cloned()
    }

    pub fn series_points(&self, id: SeriesId) -> Option<Vec<SeriesPoint>> {
        self.state
            .read()
            .series
            .get(id)
            .map(|s| s.iter().copied().collect())
    }

    pub fn control_enabled(&self, control: ControlId) -> bool {
        self.state
            .read()
            .controls
            .get(&control)
            .copied()
            .unwrap_or(true)
    }

    /// Bumped on every visible change.
    pub fn revision(&self) -> u64 {
        self.state.read().revision
    }
}

impl DashboardSink for MemoryDashboard {
    fn set_indicator(&self, id: IndicatorId, text: &str, style: StyleBucket) {
        let mut state = self.state.write();
        if let Some(current) = state.indicators.get(&id) {
            if current.text == text && current.style == style {
                return;
            }
        }
        state.indicators.insert(id, Indicator::new(text, style));
        state.revision += 1;
        tracing::trace!(slot = id.as_str(), text, %style, "indicator updated");
    }

    fn initialize_series(&self, id: SeriesId, points: Vec<SeriesPoint>) {
        let mut state = self.state.write();
        state.series.initialize(id, points);
        state.revision += 1;
    }

    fn append_series(&self, batch: &[(SeriesId, SeriesPoint)]) -> Result<(), SeriesError> {
        let (ids, points): (Vec<SeriesId>, Vec<SeriesPoint>) = batch.iter().copied().unzip();
        let mut state = self.state.write();
        state.series.append_many(&ids, &points)?;
        state.revision += 1;
        Ok(())
    }

    fn has_series(&self, id: SeriesId) -> bool {
        self.state.read().series.contains(id)
    }

    fn set_control_enabled(&self, control: ControlId, enabled: bool) {
        let mut state = self.state.write();
        if state.controls.insert(control, enabled) != Some(enabled) {
            state.revision += 1;
        }
    }
}
