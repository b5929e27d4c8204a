//! /status handler.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use super::ApiState;

#[derive(Serialize)]
pub struct StatusResponse {
    pub listen_addr: String,
    pub nodes: usize,
    pub connections: usize,
    pub dashboards: usize,
}

pub async fn handle_status(State(state): State<ApiState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        listen_addr: state.listen_addr.to_string(),
        nodes: state.broker.registry().len(),
        connections: state.broker.connections().len(),
        dashboards: state.feed.subscriber_count(),
    })
}
