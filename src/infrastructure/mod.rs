// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod http_device_api;
pub mod memory_dashboard;
pub mod websocket_stream;
