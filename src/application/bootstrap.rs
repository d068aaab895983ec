// Bootstrap loader - primes chart series and indicators from history
use crate::application::dashboard_sink::DashboardSink;
use crate::application::device_api::{DeviceApi, FetchError, HistoryColumns, HistorySource};
use crate::application::projector::grid_off_since_text;
use crate::application::retry::RetryPolicy;
use crate::domain::dashboard::IndicatorId;
use crate::domain::series::{SeriesId, SeriesPoint};
use crate::domain::snapshot::{self, DeviceSnapshot, GridState, SnapshotError};
use crate::domain::threshold::StyleBucket;
use chrono::FixedOffset;
use std::sync::Arc;
use thiserror::Error;

const BATTERY_COLUMNS: [(&str, SeriesId); 3] = [
    ("state_of_charge", SeriesId::StateOfCharge),
    ("voltage", SeriesId::BatteryVoltage),
    ("current", SeriesId::BatteryCurrent),
];

const INVERTER_COLUMNS: [(&str, SeriesId); 5] = [
    ("load_power", SeriesId::LoadPower),
    ("load_va", SeriesId::LoadVa),
    ("pv_input_power", SeriesId::PvInputPower),
    ("pv_charge_current", SeriesId::PvChargeCurrent),
    ("grid_charge_current", SeriesId::GridChargeCurrent),
];

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("{what} failed after retries: {source}")]
    Fetch {
        what: &'static str,
        #[source]
        source: FetchError,
    },
    #[error("{device} history is malformed: {reason}")]
    MalformedHistory {
        device: &'static str,
        reason: String,
    },
    #[error("current inverter state is malformed: {0}")]
    Snapshot(#[from] SnapshotError),
    #[error("expected an inverter snapshot, got {0}")]
    UnexpectedDevice(&'static str),
}

/// Proof that every chart series exists. The stream supervisor requires one,
/// and only [`BootstrapLoader::bootstrap`] hands them out.
#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapReport {
    battery_points: usize,
    inverter_points: usize,
    grid_state: GridState,
    grid_last_on: Option<i64>,
}

impl BootstrapReport {
    pub fn battery_points(&self) -> usize {
        self.battery_points
    }

    pub fn inverter_points(&self) -> usize {
        self.inverter_points
    }

    pub fn grid_state(&self) -> GridState {
        self.grid_state
    }

    /// Last time the grid was seen on: the snapshot time while it is on, the
    /// daemon's record while it is off.
    pub fn grid_last_on(&self) -> Option<i64> {
        self.grid_last_on
    }

    pub fn grid_off_since(&self) -> Option<i64> {
        match self.grid_state {
            GridState::On => None,
            GridState::Off => self.grid_last_on,
        }
    }

    #[cfg(test)]
    pub(crate) fn primed(grid_state: GridState, grid_last_on: Option<i64>) -> Self {
        Self {
            battery_points: 0,
            inverter_points: 0,
            grid_state,
            grid_last_on,
        }
    }
}

pub struct BootstrapLoader {
    api: Arc<dyn DeviceApi>,
    sink: Arc<dyn DashboardSink>,
    retry: RetryPolicy,
    display_offset: FixedOffset,
    inverter_device: String,
}

impl BootstrapLoader {
    pub fn new(
        api: Arc<dyn DeviceApi>,
        sink: Arc<dyn DashboardSink>,
        retry: RetryPolicy,
        display_offset: FixedOffset,
        inverter_device: String,
    ) -> Self {
        Self {
            api,
            sink,
            retry,
            display_offset,
            inverter_device,
        }
    }

    /// Load the lookback window and write status. Either every series is
    /// initialized or none is.
    pub async fn bootstrap(&self, lookback_minutes: u32) -> Result<BootstrapReport, BootstrapError> {
        self.sink
            .set_indicator(IndicatorId::DashboardStatus, "Loading history...", StyleBucket::Muted);

        match self.load(lookback_minutes).await {
            Ok(report) => {
                tracing::info!(
                    lookback_minutes,
                    battery_points = report.battery_points,
                    inverter_points = report.inverter_points,
                    "dashboard bootstrapped"
                );
                self.sink
                    .set_indicator(IndicatorId::DashboardStatus, "Live", StyleBucket::Success);
                Ok(report)
            }
            Err(e) => {
                tracing::error!(error = %e, "dashboard bootstrap failed");
                self.sink.set_indicator(
                    IndicatorId::DashboardStatus,
                    &format!("Failed to load dashboard: {e}"),
                    StyleBucket::Danger,
                );
                Err(e)
            }
        }
    }

    async fn load(&self, lookback_minutes: u32) -> Result<BootstrapReport, BootstrapError> {
        let battery = self
            .history(HistorySource::Battery, lookback_minutes, &BATTERY_COLUMNS)
            .await?;
        let inverter = self
            .history(HistorySource::Inverter, lookback_minutes, &INVERTER_COLUMNS)
            .await?;
        let (grid_state, grid_last_on) = self.grid_status().await?;

        let report = BootstrapReport {
            battery_points: battery.first().map_or(0, |(_, p)| p.len()),
            inverter_points: inverter.first().map_or(0, |(_, p)| p.len()),
            grid_state,
            grid_last_on,
        };

        // Nothing is written until every query has succeeded.
        for (id, points) in battery.into_iter().chain(inverter) {
            self.sink.initialize_series(id, points);
        }
        if let Some(since) = report.grid_off_since() {
            self.sink.set_indicator(
                IndicatorId::GridOffSince,
                &grid_off_since_text(since, &self.display_offset),
                StyleBucket::Muted,
            );
        }

        Ok(report)
    }

    async fn history(
        &self,
        source: HistorySource,
        minutes: u32,
        columns: &[(&'static str, SeriesId)],
    ) -> Result<Vec<(SeriesId, Vec<SeriesPoint>)>, BootstrapError> {
        let names: Vec<&str> = columns.iter().map(|(name, _)| *name).collect();
        let what = match source {
            HistorySource::Battery => "battery history query",
            HistorySource::Inverter => "inverter history query",
        };

        let data = self
            .retry
            .run(what, || self.api.past_minutes(source, minutes, &names))
            .await
            .map_err(|source| BootstrapError::Fetch { what, source })?;

        zip_columns(source, &data, columns)
    }

    async fn grid_status(&self) -> Result<(GridState, Option<i64>), BootstrapError> {
        let what = "current inverter state query";
        let raw = self
            .retry
            .run(what, || self.api.device_snapshot(&self.inverter_device))
            .await
            .map_err(|source| BootstrapError::Fetch { what, source })?;

        let state = match snapshot::parse_value(raw)? {
            DeviceSnapshot::Inverter(state) => state,
            DeviceSnapshot::Battery(_) => return Err(BootstrapError::UnexpectedDevice("battery")),
        };
        if state.grid_state == GridState::On {
            return Ok((GridState::On, Some(state.time_updated as i64)));
        }

        let what = "grid last on query";
        let last_on = self
            .retry
            .run(what, || self.api.time_grid_last_on())
            .await
            .map_err(|source| BootstrapError::Fetch { what, source })?;
        Ok((GridState::Off, Some(last_on as i64)))
    }
}

fn zip_columns(
    source: HistorySource,
    data: &HistoryColumns,
    columns: &[(&'static str, SeriesId)],
) -> Result<Vec<(SeriesId, Vec<SeriesPoint>)>, BootstrapError> {
    let malformed = |reason: String| BootstrapError::MalformedHistory {
        device: source.as_str(),
        reason,
    };

    columns
        .iter()
        .map(|(name, id)| {
            let values = data
                .columns
                .get(*name)
                .ok_or_else(|| malformed(format!("missing column `{name}`")))?;
            if values.len() != data.time_updated.len() {
                return Err(malformed(format!(
                    "column `{name}` has {} values for {} timestamps",
                    values.len(),
                    data.time_updated.len()
                )));
            }

            // State of charge is charted on the 0-100 scale.
            let scale = if *id == SeriesId::StateOfCharge { 100.0 } else { 1.0 };
            let points = data
                .time_updated
                .iter()
                .zip(values)
                .map(|(t, v)| SeriesPoint::new(*t as i64, v * scale))
                .collect();
            Ok((*id, points))
        })
        .collect()
}
