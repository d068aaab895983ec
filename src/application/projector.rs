// Dashboard projector - writes one snapshot into indicators and chart series
use crate::application::bootstrap::BootstrapReport;
use crate::application::dashboard_sink::DashboardSink;
use crate::domain::dashboard::IndicatorId;
use crate::domain::series::{SeriesId, SeriesPoint};
use crate::domain::snapshot::{
    BatteryState, ChargerSource, DeviceSnapshot, GridState, InverterState, OutputMode,
};
use crate::domain::threshold::{Classification, ClassifyError, Metric, StyleBucket, ThresholdTable};
use chrono::{DateTime, FixedOffset};
use std::sync::Arc;

/// `HH:MM` wall-clock time of a unix timestamp in the given offset.
pub fn clock_time(unix_seconds: i64, offset: &FixedOffset) -> Option<String> {
    DateTime::from_timestamp(unix_seconds, 0)
        .map(|t| t.with_timezone(offset).format("%H:%M").to_string())
}

pub fn grid_off_since_text(unix_seconds: i64, offset: &FixedOffset) -> String {
    match clock_time(unix_seconds, offset) {
        Some(time) => format!("(since {time})"),
        None => String::new(),
    }
}

pub struct DashboardProjector {
    sink: Arc<dyn DashboardSink>,
    thresholds: ThresholdTable,
    display_offset: FixedOffset,
    last_grid_state: Option<GridState>,
    last_grid_on: Option<i64>,
}

impl DashboardProjector {
    pub fn new(
        sink: Arc<dyn DashboardSink>,
        thresholds: ThresholdTable,
        display_offset: FixedOffset,
    ) -> Self {
        Self {
            sink,
            thresholds,
            display_offset,
            last_grid_state: None,
            last_grid_on: None,
        }
    }

    /// Continue grid tracking from the state bootstrap observed, so the first
    /// live frame is compared against it.
    pub fn resume_from(&mut self, report: &BootstrapReport) {
        self.last_grid_state = Some(report.grid_state());
        self.last_grid_on = report.grid_last_on();
    }

    pub fn project(&mut self, snapshot: &DeviceSnapshot) {
        for issue in snapshot.quality_issues() {
            tracing::warn!(device = %snapshot.kind(), %issue, "data quality issue in snapshot");
        }

        let time = snapshot.time_updated();
        match snapshot {
            DeviceSnapshot::Inverter(state) => self.project_inverter(time, state),
            DeviceSnapshot::Battery(state) => self.project_battery(time, state),
        }
    }

    fn project_inverter(&mut self, time: i64, s: &InverterState) {
        let grid_style = match s.grid_state {
            GridState::On => StyleBucket::Success,
            GridState::Off => StyleBucket::Danger,
        };
        self.sink
            .set_indicator(IndicatorId::GridStatus, s.grid_state.label(), grid_style);
        self.track_grid(time, s.grid_state);

        self.sink.set_indicator(
            IndicatorId::OutputMode,
            &s.output_mode.to_uppercase(),
            mode_style(OutputMode::from_raw(&s.output_mode)),
        );
        self.sink.set_indicator(
            IndicatorId::SelectedMode,
            &s.selected_mode.to_uppercase(),
            mode_style(OutputMode::from_raw(&s.selected_mode)),
        );
        let charger_style = match ChargerSource::from_raw(&s.selected_charger) {
            ChargerSource::Solar => StyleBucket::Accent,
            ChargerSource::Grid => StyleBucket::Info,
        };
        self.sink.set_indicator(
            IndicatorId::SelectedCharger,
            &s.selected_charger.to_uppercase(),
            charger_style,
        );

        self.sink.set_indicator(
            IndicatorId::OutputVoltage,
            &format!("{:.1}V", s.output_voltage),
            StyleBucket::Normal,
        );
        self.sink.set_indicator(
            IndicatorId::OutputFrequency,
            &format!("{:.1}Hz", s.output_frequency),
            StyleBucket::Normal,
        );

        let pv = self.classify(Metric::PvInputPower, s.pv_input_power);
        self.sink.set_indicator(
            IndicatorId::PvInput,
            &format!("{:.0}W", s.pv_input_power),
            pv.style,
        );

        let load = self.classify(Metric::LoadPercentage, s.load_percentage);
        self.sink.set_indicator(
            IndicatorId::LoadPower,
            &format!("{:.0}W", s.load_power),
            load.style,
        );
        self.sink.set_indicator(
            IndicatorId::LoadPowerProgressBar,
            &format!("{:.0}%", s.load_percentage * 100.0),
            load.style,
        );

        self.append(&[
            (SeriesId::LoadPower, SeriesPoint::new(time, s.load_power)),
            (SeriesId::LoadVa, SeriesPoint::new(time, s.load_va)),
            (SeriesId::PvInputPower, SeriesPoint::new(time, s.pv_input_power)),
            (SeriesId::GridChargeCurrent, SeriesPoint::new(time, s.grid_charge_current)),
            (SeriesId::PvChargeCurrent, SeriesPoint::new(time, s.pv_charge_current)),
        ]);
    }

    fn project_battery(&mut self, time: i64, s: &BatteryState) {
        let percentage = s.state_of_charge * 100.0;
        let soc = self.classify(Metric::BatterySoc, percentage);
        let soc_text = format!("{percentage:.0}%");
        self.sink
            .set_indicator(IndicatorId::BatterySoc, &soc_text, soc.style);
        self.sink
            .set_indicator(IndicatorId::BatterySocProgressBar, &soc_text, soc.style);

        let current = self.classify(Metric::BatteryCurrent, s.current);
        self.sink.set_indicator(
            IndicatorId::BatteryChargeCurrent,
            &format!("{:.1}A", s.current),
            current.style,
        );

        self.append(&[
            (SeriesId::StateOfCharge, SeriesPoint::new(time, percentage)),
            (SeriesId::BatteryVoltage, SeriesPoint::new(time, s.voltage)),
            (SeriesId::BatteryCurrent, SeriesPoint::new(time, s.current)),
        ]);
    }

    /// Live on/off transitions keep the "grid off since" label current.
    fn track_grid(&mut self, time: i64, grid: GridState) {
        let previous = self.last_grid_state.replace(grid);
        match (previous, grid) {
            (Some(GridState::On), GridState::Off) => {
                let since = self.last_grid_on.unwrap_or(time);
                self.sink.set_indicator(
                    IndicatorId::GridOffSince,
                    &grid_off_since_text(since, &self.display_offset),
                    StyleBucket::Muted,
                );
            }
            (Some(GridState::Off), GridState::On) => {
                self.sink
                    .set_indicator(IndicatorId::GridOffSince, "", StyleBucket::Muted);
            }
            _ => {}
        }
        if grid == GridState::On {
            self.last_grid_on = Some(time);
        }
    }

    fn classify(&self, metric: Metric, value: f64) -> Classification {
        match self.thresholds.classify(metric, value) {
            Ok(classification) => classification,
            Err(e) => {
                tracing::error!(%metric, value, error = %e, "classification failed");
                debug_assert!(
                    !matches!(e, ClassifyError::UnknownMetric(_)),
                    "threshold table has no rule for {metric}"
                );
                Classification {
                    bucket: "unknown".to_string(),
                    style: StyleBucket::Muted,
                }
            }
        }
    }

    fn append(&self, batch: &[(SeriesId, SeriesPoint)]) {
        if let Err(e) = self.sink.append_series(batch) {
            tracing::error!(error = %e, "failed to append snapshot to chart series");
        }
    }
}

fn mode_style(mode: OutputMode) -> StyleBucket {
    match mode {
        OutputMode::Line => StyleBucket::Info,
        OutputMode::Inverter => StyleBucket::Success,
    }
}
