// HTTP implementation of the device API
use crate::application::device_api::{DeviceApi, FetchError, HistoryColumns, HistorySource};
use crate::domain::command::Command;
use anyhow::Context;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

const TIME_COLUMN: &str = "time_updated";

#[derive(Debug, Clone)]
pub struct HttpDeviceApi {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct GridLastOnResponse {
    time_grid_last_on: f64,
}

impl HttpDeviceApi {
    pub fn new(host: &str, port: u16, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: format!("http://{}:{}", host.trim_end_matches('/'), port),
            client,
        })
    }

    /// Grid charging with a current goes to the daemon's dedicated inverter
    /// endpoint; the generic command route takes no parameters.
    pub fn control_url(&self, device: &str, command: &Command) -> String {
        let mut url = match command {
            Command::TurnOnGridCharging {
                charge_current: Some(_),
            } => format!("{}/devices/control/charge_inverter_from_grid/", self.base_url),
            _ => format!(
                "{}/devices/control/{}/{}/",
                self.base_url,
                urlencoding::encode(device),
                command.name()
            ),
        };
        let params = command.query_params();
        if !params.is_empty() {
            let query: Vec<String> = params
                .iter()
                .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
                .collect();
            url.push('?');
            url.push_str(&query.join("&"));
        }
        url
    }

    fn history_url(&self, source: HistorySource, minutes: u32, columns: &[&str]) -> String {
        let mut requested = vec![TIME_COLUMN];
        requested.extend(columns.iter().copied().filter(|c| *c != TIME_COLUMN));
        format!(
            "{}/data/{}/past_minutes/?minutes={}&columns={}",
            self.base_url,
            source.as_str(),
            minutes,
            urlencoding::encode(&requested.join(","))
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        response.json::<T>().await.map_err(|e| FetchError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl DeviceApi for HttpDeviceApi {
    async fn past_minutes(
        &self,
        source: HistorySource,
        minutes: u32,
        columns: &[&str],
    ) -> Result<HistoryColumns, FetchError> {
        let url = self.history_url(source, minutes, columns);
        tracing::debug!(%url, "querying history");

        let mut data: HashMap<String, Vec<f64>> = self.get_json(&url).await?;
        let time_updated = data.remove(TIME_COLUMN).ok_or_else(|| FetchError::Decode {
            url: url.clone(),
            message: format!("response has no `{TIME_COLUMN}` column"),
        })?;

        Ok(HistoryColumns {
            time_updated,
            columns: data,
        })
    }

    async fn device_snapshot(&self, device: &str) -> Result<serde_json::Value, FetchError> {
        let url = format!("{}/devices/{}/", self.base_url, urlencoding::encode(device));
        self.get_json(&url).await
    }

    async fn time_grid_last_on(&self) -> Result<f64, FetchError> {
        let url = format!("{}/data/time_when_grid_last_on/", self.base_url);
        let response: GridLastOnResponse = self.get_json(&url).await?;
        Ok(response.time_grid_last_on)
    }

    async fn send_command(&self, device: &str, command: &Command) -> Result<u16, FetchError> {
        let url = self.control_url(device, command);
        tracing::debug!(%url, "sending control command");

        let response = self
            .client
            .put(&url)
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                url: url.clone(),
                message: e.to_string(),
            })?;
        Ok(response.status().as_u16())
    }
}
