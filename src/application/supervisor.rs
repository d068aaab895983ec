// Stream supervisor - owns the telemetry connection and feeds the projector
use crate::application::bootstrap::BootstrapReport;
use crate::application::dashboard_sink::DashboardSink;
use crate::application::projector::DashboardProjector;
use crate::application::retry::Backoff;
use crate::domain::dashboard::IndicatorId;
use crate::domain::snapshot;
use crate::domain::threshold::StyleBucket;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::future::Future;
use std::sync::Arc;

/// Text frames in arrival order. An `Err` item ends the connection.
pub type FrameStream = BoxStream<'static, anyhow::Result<String>>;

#[async_trait]
pub trait TelemetryConnector: Send + Sync {
    async fn connect(&self) -> anyhow::Result<FrameStream>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub connections: u64,
    pub frames_received: u64,
    pub frames_projected: u64,
    pub frames_rejected: u64,
}

pub struct StreamSupervisor {
    connector: Arc<dyn TelemetryConnector>,
    projector: DashboardProjector,
    sink: Arc<dyn DashboardSink>,
    backoff: Backoff,
    stats: StreamStats,
}

impl StreamSupervisor {
    /// Requires a bootstrap report so that every chart series exists before
    /// the first frame is routed.
    pub fn new(
        connector: Arc<dyn TelemetryConnector>,
        mut projector: DashboardProjector,
        sink: Arc<dyn DashboardSink>,
        backoff: Backoff,
        primed: &BootstrapReport,
    ) -> Self {
        projector.resume_from(primed);
        Self {
            connector,
            projector,
            sink,
            backoff,
            stats: StreamStats::default(),
        }
    }

    /// Consume frames until `shutdown` resolves, reconnecting with backoff
    /// whenever the connection fails or closes.
    pub async fn run<S>(mut self, shutdown: S) -> StreamStats
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut delays = self.backoff.delays();

        loop {
            let connected = tokio::select! {
                _ = &mut shutdown => break,
                connected = self.connector.connect() => connected,
            };

            match connected {
                Ok(frames) => {
                    self.stats.connections += 1;
                    delays.reset();
                    self.sink
                        .set_indicator(IndicatorId::StreamStatus, "Connected", StyleBucket::Success);
                    tracing::info!(connection = self.stats.connections, "telemetry stream connected");

                    let ended = tokio::select! {
                        _ = &mut shutdown => break,
                        ended = self.consume(frames) => ended,
                    };
                    match ended {
                        Some(e) => tracing::warn!(error = %e, "telemetry stream failed"),
                        None => tracing::warn!("telemetry stream closed by peer"),
                    }
                }
                Err(e) => tracing::warn!(error = %e, "telemetry stream connection failed"),
            }

            let delay = delays.next_delay();
            self.sink
                .set_indicator(IndicatorId::StreamStatus, "Reconnecting", StyleBucket::Warning);
            tracing::info!(delay_ms = delay.as_millis() as u64, "reconnecting telemetry stream");
            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        tracing::info!(
            frames_received = self.stats.frames_received,
            frames_rejected = self.stats.frames_rejected,
            "telemetry stream stopped"
        );
        self.stats
    }

    async fn consume(&mut self, mut frames: FrameStream) -> Option<anyhow::Error> {
        while let Some(frame) = frames.next().await {
            match frame {
                Ok(text) => self.handle_frame(&text),
                Err(e) => return Some(e),
            }
        }
        None
    }

    fn handle_frame(&mut self, raw: &str) {
        self.stats.frames_received += 1;
        match snapshot::parse(raw) {
            Ok(snapshot) => {
                self.projector.project(&snapshot);
                self.stats.frames_projected += 1;
            }
            Err(e) => {
                self.stats.frames_rejected += 1;
                tracing::warn!(error = %e, "skipping malformed telemetry frame");
            }
        }
    }
}
