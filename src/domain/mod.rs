// Domain layer - device snapshots, thresholds, series and dashboard state
pub mod command;
pub mod dashboard;
pub mod series;
pub mod snapshot;
pub mod threshold;
