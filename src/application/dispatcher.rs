// Command dispatcher - one-shot control commands with status reporting
use crate::application::dashboard_sink::DashboardSink;
use crate::application::device_api::DeviceApi;
use crate::domain::command::{Command, ControlId};
use crate::domain::dashboard::IndicatorId;
use crate::domain::threshold::StyleBucket;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandStatus {
    Succeeded,
    Failed,
    /// The control was already in flight; nothing was sent.
    Busy,
}

#[derive(Clone)]
pub struct CommandDispatcher {
    api: Arc<dyn DeviceApi>,
    sink: Arc<dyn DashboardSink>,
    in_flight: Arc<Mutex<HashSet<ControlId>>>,
}

/// Re-enables the control when dropped, whatever the outcome.
struct InFlight<'a> {
    dispatcher: &'a CommandDispatcher,
    control: ControlId,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.dispatcher.in_flight.lock().remove(&self.control);
        self.dispatcher
            .sink
            .set_control_enabled(self.control, true);
    }
}

impl CommandDispatcher {
    pub fn new(api: Arc<dyn DeviceApi>, sink: Arc<dyn DashboardSink>) -> Self {
        Self {
            api,
            sink,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Issue `command` once. No retry: a failure is reported and the user may
    /// trigger again.
    pub async fn dispatch(&self, command: Command, device: &str) -> CommandStatus {
        let Some(_guard) = self.begin(command.control()) else {
            tracing::debug!(command = command.name(), "control busy, ignoring trigger");
            return CommandStatus::Busy;
        };

        let status = match self.api.send_command(device, &command).await {
            Ok(200) => CommandStatus::Succeeded,
            Ok(code) => {
                tracing::warn!(command = command.name(), device, status = code, "command rejected");
                CommandStatus::Failed
            }
            Err(e) => {
                tracing::warn!(command = command.name(), device, error = %e, "command request failed");
                CommandStatus::Failed
            }
        };

        let (text, style) = match status {
            CommandStatus::Succeeded => (command.success_message(), StyleBucket::Success),
            _ => (command.failure_message(), StyleBucket::Danger),
        };
        self.sink
            .set_indicator(IndicatorId::ControlUpdate, text, style);
        tracing::info!(command = command.name(), device, ?status, "command dispatched");
        status
    }

    fn begin(&self, control: ControlId) -> Option<InFlight<'_>> {
        if !self.in_flight.lock().insert(control) {
            return None;
        }
        self.sink.set_control_enabled(control, false);
        Some(InFlight {
            dispatcher: self,
            control,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::device_api::{FetchError, HistoryColumns, HistorySource};
    use crate::domain::dashboard::Indicator;
    use crate::infrastructure::memory_dashboard::MemoryDashboard;
    use async_trait::async_trait;
    use tokio::sync::Notify;

    struct FixedStatusApi {
        status: u16,
        release: Option<Arc<Notify>>,
        observed_enabled: Mutex<Vec<bool>>,
        dashboard: Arc<MemoryDashboard>,
    }

    #[async_trait]
    impl DeviceApi for FixedStatusApi {
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

        async fn send_command(&self, _device: &str, command: &Command) -> Result<u16, FetchError> {
            self.observed_enabled
                .lock()
                .push(self.dashboard.control_enabled(command.control()));
            if let Some(release) = &self.release {
                release.notified().await;
            }
            Ok(self.status)
        }
    }

    fn setup(status: u16, release: Option<Arc<Notify>>) -> (CommandDispatcher, Arc<FixedStatusApi>, Arc<MemoryDashboard>) {
        let dashboard = Arc::new(MemoryDashboard::new(10));
        let api = Arc::new(FixedStatusApi {
            status,
            release,
            observed_enabled: Mutex::new(Vec::new()),
            dashboard: dashboard.clone(),
        });
        let dispatcher = CommandDispatcher::new(api.clone(), dashboard.clone());
        (dispatcher, api, dashboard)
    }

    #[tokio::test]
    async fn test_success_reports_and_reenables() {
        let (dispatcher, api, dashboard) = setup(200, None);

        let status = dispatcher
            .dispatch(Command::SwitchToLineMode, "inverter")
            .await;

        assert_eq!(status, CommandStatus::Succeeded);
        assert_eq!(*api.observed_enabled.lock(), vec![false]);
        assert!(dashboard.control_enabled(ControlId::LineModeBtn));
        assert_eq!(
            dashboard.indicator(IndicatorId::ControlUpdate),
            Some(Indicator::new(
                "Switched to line mode (this may take a few seconds to update).",
                StyleBucket::Success
            ))
        );
    }

    #[tokio::test]
    async fn test_service_unavailable_reports_failure() {
        let (dispatcher, _api, dashboard) = setup(503, None);

        let status = dispatcher
            .dispatch(Command::TurnOnGridCharging { charge_current: Some(20) }, "inverter")
            .await;

        assert_eq!(status, CommandStatus::Failed);
        assert!(dashboard.control_enabled(ControlId::ChargeGridBtn));
        assert_eq!(
            dashboard.indicator(IndicatorId::ControlUpdate),
            Some(Indicator::new("Failed to turn on grid charging!", StyleBucket::Danger))
        );
    }

    #[tokio::test]
    async fn test_second_trigger_while_in_flight_is_busy() {
        let release = Arc::new(Notify::new());
        let (dispatcher, api, dashboard) = setup(200, Some(release.clone()));

        let first = tokio::spawn({
            let dispatcher = dispatcher.clone();
            async move {
                dispatcher
                    .dispatch(Command::SwitchToBatteryMode, "inverter")
                    .await
            }
        });
        while api.observed_enabled.lock().is_empty() {
            tokio::task::yield_now().await;
        }

        let second = dispatcher
            .dispatch(Command::SwitchToBatteryMode, "inverter")
            .await;
        assert_eq!(second, CommandStatus::Busy);
        assert!(!dashboard.control_enabled(ControlId::BatteryModeBtn));

        release.notify_one();
        assert_eq!(first.await.unwrap(), CommandStatus::Succeeded);
        assert!(dashboard.control_enabled(ControlId::BatteryModeBtn));
        assert_eq!(api.observed_enabled.lock().len(), 1);
    }
}
