// Presentation layer - HTTP surface over the dashboard
pub mod app_state;
pub mod handlers;

use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{get_chart, get_dashboard, health_check, trigger_control};
use axum::routing::{get, put};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/dashboard", get(get_dashboard))
        .route("/charts/:id", get(get_chart))
        .route("/controls/:command", put(trigger_control))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dashboard_sink::DashboardSink;
    use crate::application::device_api::{DeviceApi, FetchError, HistoryColumns, HistorySource};
    use crate::application::dispatcher::CommandDispatcher;
    use crate::domain::command::Command;
    use crate::domain::series::{SeriesId, SeriesPoint};
    use crate::infrastructure::memory_dashboard::MemoryDashboard;
    use crate::presentation::handlers::ControlResponse;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingApi {
        sent: Mutex<Vec<(String, Command)>>,
    }

    #[async_trait]
    impl DeviceApi for RecordingApi {
        async fn past_minutes(
            &self,
            _source: HistorySource,
            _minutes: u32,
            _columns: &[&str],
        ) -> Result<HistoryColumns, FetchError> {
            unreachable!()
        }

        async fn device_snapshot(&self, _device: &str) -> Result<serde_json::Value, FetchError> {
            unreachable!()
        }

        async fn time_grid_last_on(&self) -> Result<f64, FetchError> {
            unreachable!()
        }

        async fn send_command(&self, device: &str, command: &Command) -> Result<u16, FetchError> {
            self.sent.lock().push((device.to_string(), *command));
            Ok(match command {
                Command::TurnOffGridCharging => 500,
                _ => 200,
            })
        }
    }

    async fn serve() -> (String, Arc<RecordingApi>, Arc<MemoryDashboard>) {
        let dashboard = Arc::new(MemoryDashboard::new(10));
        let api = Arc::new(RecordingApi::default());
        let state = Arc::new(AppState {
            dashboard: dashboard.clone(),
            dispatcher: CommandDispatcher::new(api.clone(), dashboard.clone()),
            control_device: "inverter".to_string(),
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });
        (format!("http://{addr}"), api, dashboard)
    }

    #[tokio::test]
    async fn test_health_and_dashboard() {
        let (base, _api, _dashboard) = serve().await;

        let body = reqwest::get(format!("{base}/healthz")).await.unwrap().text().await.unwrap();
        assert_eq!(body, "ok");

        let view: serde_json::Value = reqwest::get(format!("{base}/dashboard"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(view["controls"]["line-mode-btn"], true);
    }

    #[tokio::test]
    async fn test_chart_endpoint() {
        let (base, _api, dashboard) = serve().await;
        dashboard.initialize_series(SeriesId::BatteryVoltage, vec![SeriesPoint::new(5, 51.2)]);

        let chart: serde_json::Value = reqwest::get(format!("{base}/charts/battery-voltage-plot"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(chart["id"], "battery-voltage-plot");
        assert_eq!(chart["series"][0]["id"], "battery-voltage");
        assert_eq!(chart["series"][0]["points"][0]["value"], 51.2);

        let missing = reqwest::get(format!("{base}/charts/nope")).await.unwrap();
        assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_control_endpoint() {
        let (base, api, _dashboard) = serve().await;
        let client = reqwest::Client::new();

        let response = client
            .put(format!("{base}/controls/TURN_ON_GRID_CHARGING?charge_current=25"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let body: ControlResponse = response.json().await.unwrap();
        assert_eq!(body.status, "succeeded");
        assert_eq!(body.message.as_deref(), Some("Turned on grid charging."));

        let response = client
            .put(format!("{base}/controls/TURN_OFF_GRID_CHARGING"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_GATEWAY);

        let response = client
            .put(format!("{base}/controls/SELF_DESTRUCT"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);

        let sent = api.sent.lock().clone();
        assert_eq!(
            sent,
            vec![
                (
                    "inverter".to_string(),
                    Command::TurnOnGridCharging { charge_current: Some(25) }
                ),
                ("inverter".to_string(), Command::TurnOffGridCharging),
            ]
        );
    }
}
