// Sink trait - the only way the engine touches indicators and charts
use crate::domain::command::ControlId;
use crate::domain::dashboard::IndicatorId;
use crate::domain::series::{SeriesError, SeriesId, SeriesPoint};
use crate::domain::threshold::StyleBucket;

pub trait DashboardSink: Send + Sync {
    /// Write text and style into a slot. Writing the same pair twice is a no-op.
    fn set_indicator(&self, id: IndicatorId, text: &str, style: StyleBucket);

    /// Replace the full contents of a series, creating it if needed.
    fn initialize_series(&self, id: SeriesId, points: Vec<SeriesPoint>);

    /// Append one point per series as a single visible update. Fails without
    /// touching anything if any series is missing.
    fn append_series(&self, batch: &[(SeriesId, SeriesPoint)]) -> Result<(), SeriesError>;

    fn has_series(&self, id: SeriesId) -> bool;

    fn set_control_enabled(&self, control: ControlId, enabled: bool);
}
