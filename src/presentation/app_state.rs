// Application state for HTTP handlers
use crate::application::dispatcher::CommandDispatcher;
use crate::infrastructure::memory_dashboard::MemoryDashboard;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub dashboard: Arc<MemoryDashboard>,
    pub dispatcher: CommandDispatcher,
    /// Device that control commands are addressed to.
    pub control_device: String,
}
