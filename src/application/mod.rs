// Application layer - bootstrap, live projection and command dispatch
pub mod bootstrap;
pub mod dashboard_sink;
pub mod device_api;
pub mod dispatcher;
pub mod projector;
pub mod retry;
pub mod supervisor;
