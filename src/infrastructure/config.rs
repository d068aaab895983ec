use crate::application::retry::{Backoff, RetryPolicy};
use crate::domain::series::DEFAULT_CAPACITY;
use crate::domain::threshold::Band;
use chrono::{FixedOffset, Local, Offset};
use config::builder::DefaultState;
use config::ConfigBuilder;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    pub api: ApiSettings,
    pub stream: StreamSettings,
    pub http: HttpSettings,
    pub history: HistorySettings,
    pub series: SeriesSettings,
    #[serde(default)]
    pub display: DisplaySettings,
    /// Per-metric band overrides, keyed by metric name.
    #[serde(default)]
    pub thresholds: HashMap<String, Vec<Band>>,
}

/// Device daemon serving history, snapshots and control commands.
#[derive(Debug, Deserialize, Clone)]
pub struct ApiSettings {
    pub host: String,
    pub port: u16,
    pub device: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StreamSettings {
    pub host: String,
    pub port: u16,
    pub reconnect_initial_ms: u64,
    pub reconnect_max_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpSettings {
    pub listen: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HistorySettings {
    pub lookback_minutes: u32,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SeriesSettings {
    pub capacity: usize,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DisplaySettings {
    /// Offset used for `HH:MM` labels. Host local time when unset.
    #[serde(default)]
    pub utc_offset_minutes: Option<i32>,
}

impl DashboardConfig {
    pub fn stream_url(&self) -> String {
        format!("ws://{}:{}/", self.stream.host, self.stream.port)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.history.retry_attempts,
            Duration::from_millis(self.history.retry_delay_ms),
        )
    }

    pub fn backoff(&self) -> Backoff {
        Backoff {
            initial: Duration::from_millis(self.stream.reconnect_initial_ms),
            max: Duration::from_millis(self.stream.reconnect_max_ms),
            factor: 2,
        }
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    pub fn display_offset(&self) -> anyhow::Result<FixedOffset> {
        match self.display.utc_offset_minutes {
            Some(minutes) => FixedOffset::east_opt(minutes * 60)
                .ok_or_else(|| anyhow::anyhow!("utc_offset_minutes {} is out of range", minutes)),
            None => Ok(Local::now().offset().fix()),
        }
    }
}

fn with_defaults() -> anyhow::Result<ConfigBuilder<DefaultState>> {
    Ok(config::Config::builder()
        .set_default("api.host", "localhost")?
        .set_default("api.port", 8000)?
        .set_default("api.device", "inverter")?
        .set_default("api.timeout_secs", 10)?
        .set_default("stream.host", "localhost")?
        .set_default("stream.port", 8765)?
        .set_default("stream.reconnect_initial_ms", 1000)?
        .set_default("stream.reconnect_max_ms", 30_000)?
        .set_default("http.listen", "0.0.0.0:8080")?
        .set_default("history.lookback_minutes", 60)?
        .set_default("history.retry_attempts", 3)?
        .set_default("history.retry_delay_ms", 2000)?
        .set_default("series.capacity", DEFAULT_CAPACITY as u64)?)
}

/// Defaults, then `config/dashboard.*` if present, then `DASHBOARD__SECTION__KEY`
/// environment variables.
pub fn load_dashboard_config() -> anyhow::Result<DashboardConfig> {
    let settings = with_defaults()?
        .add_source(config::File::with_name("config/dashboard").required(false))
        .add_source(config::Environment::with_prefix("DASHBOARD").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::threshold::{Metric, StyleBucket, ThresholdTable};

    fn from_toml(toml: &str) -> DashboardConfig {
        with_defaults()
            .unwrap()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = from_toml("");
        assert_eq!(config.api.port, 8000);
        assert_eq!(config.api.device, "inverter");
        assert_eq!(config.series.capacity, 3600);
        assert_eq!(config.retry_policy(), RetryPolicy::default());
        assert_eq!(config.backoff(), Backoff::default());
        assert_eq!(config.stream_url(), "ws://localhost:8765/");
        assert!(config.thresholds.is_empty());
    }

    #[test]
    fn test_file_overrides_and_thresholds() {
        let config = from_toml(
            r#"
            [api]
            host = "192.168.1.20"

            [display]
            utc_offset_minutes = 120

            [[thresholds.battery_soc]]
            upper = 20.0
            label = "critical"
            style = "critical"

            [[thresholds.battery_soc]]
            label = "normal"
            style = "normal"
            "#,
        );

        assert_eq!(config.api.host, "192.168.1.20");
        assert_eq!(config.api.port, 8000);
        assert_eq!(
            config.display_offset().unwrap(),
            FixedOffset::east_opt(7200).unwrap()
        );

        let table = ThresholdTable::from_overrides(&config.thresholds).unwrap();
        let c = table.classify(Metric::BatterySoc, 25.0).unwrap();
        assert_eq!(c.style, StyleBucket::Normal);
    }

    #[test]
    fn test_out_of_range_offset() {
        let config = from_toml("[display]\nutc_offset_minutes = 100000\n");
        assert!(config.display_offset().is_err());
    }
}
