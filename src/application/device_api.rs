// Device API trait - historical queries and control commands
use crate::domain::command::Command;
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },
    #[error("unexpected response from {url}: {message}")]
    Decode { url: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistorySource {
    Battery,
    Inverter,
}

impl HistorySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistorySource::Battery => "battery",
            HistorySource::Inverter => "inverter",
        }
    }
}

/// Column-oriented history. Every column lines up by index with `time_updated`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryColumns {
    pub time_updated: Vec<f64>,
    pub columns: HashMap<String, Vec<f64>>,
}

#[async_trait]
pub trait DeviceApi: Send + Sync {
    /// `GET /data/{source}/past_minutes/?minutes=N&columns=...`
    async fn past_minutes(
        &self,
        source: HistorySource,
        minutes: u32,
        columns: &[&str],
    ) -> Result<HistoryColumns, FetchError>;

    /// `GET /devices/{device}/`, returned undecoded.
    async fn device_snapshot(&self, device: &str) -> Result<serde_json::Value, FetchError>;

    /// `GET /data/time_when_grid_last_on/`, unix seconds.
    async fn time_grid_last_on(&self) -> Result<f64, FetchError>;

    /// `PUT /devices/control/{device}/{COMMAND}/`, or
    /// `PUT /devices/control/charge_inverter_from_grid/?charge_current=N` for grid
    /// charging at a given current. Returns the HTTP status.
    async fn send_command(&self, device: &str, command: &Command) -> Result<u16, FetchError>;
}
