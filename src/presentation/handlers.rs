// HTTP request handlers
use crate::application::dispatcher::CommandStatus;
use crate::domain::command::Command;
use crate::domain::dashboard::{ChartView, DashboardView};
use crate::domain::series::ChartId;
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Deserialize)]
pub struct ControlQuery {
    pub charge_current: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ControlResponse {
    pub command: String,
    pub status: String,
    pub message: Option<String>,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Current indicator slots and control enablement
pub async fn get_dashboard(State(state): State<Arc<AppState>>) -> Json<DashboardView> {
    Json(state.dashboard.view())
}

/// Series of one chart
pub async fn get_chart(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<ChartView>, StatusCode> {
    let chart = ChartId::from_name(&id).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(state.dashboard.chart(chart)))
}

/// Trigger a control command on the configured device
pub async fn trigger_control(
    Path(name): Path<String>,
    Query(query): Query<ControlQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<ControlResponse>), (StatusCode, String)> {
    let command = Command::from_name(&name, query.charge_current)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("unknown command {name}")))?;

    let status = state
        .dispatcher
        .dispatch(command, &state.control_device)
        .await;

    let (code, label, message) = match status {
        CommandStatus::Succeeded => (StatusCode::OK, "succeeded", Some(command.success_message())),
        CommandStatus::Failed => (StatusCode::BAD_GATEWAY, "failed", Some(command.failure_message())),
        CommandStatus::Busy => (StatusCode::CONFLICT, "busy", None),
    };

    Ok((
        code,
        Json(ControlResponse {
            command: command.name().to_string(),
            status: label.to_string(),
            message: message.map(str::to_string),
        }),
    ))
}
