//! /command handler: operator commands from the dashboard.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use nexus_core::OperatorCommand;

use super::ApiState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DashboardCommand {
    Shutdown,
    Reboot,
    /// Re-push the current table to every dashboard. Nodes see nothing.
    Refresh,
}

#[derive(Deserialize)]
pub struct CommandRequest {
    pub command: DashboardCommand,
}

#[derive(Serialize)]
pub struct CommandResponse {
    pub command: String,
    pub delivered: usize,
    pub skipped: usize,
}

pub async fn handle_command(
    State(state): State<ApiState>,
    Json(req): Json<CommandRequest>,
) -> Json<CommandResponse> {
    let operator = match req.command {
        DashboardCommand::Shutdown => OperatorCommand::Shutdown,
        DashboardCommand::Reboot => OperatorCommand::Reboot,
        DashboardCommand::Refresh => {
            state.broker.refresh();
            return Json(CommandResponse {
                command: "refresh".to_string(),
                delivered: 0,
                skipped: 0,
            });
        }
    };

    let report = state.broker.broadcast(operator);
    Json(CommandResponse {
        command: operator.as_str().to_string(),
        delivered: report.delivered,
        skipped: report.skipped,
    })
}
