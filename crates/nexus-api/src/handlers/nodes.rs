//! /nodes, /table, /connections handlers.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use nexus_core::NodeDescriptor;
use nexus_services::ConnectionState;

use super::ApiState;

// ── /nodes ────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct NodesResponse {
    pub nodes: Vec<NodeDescriptor>,
}

pub async fn handle_nodes(State(state): State<ApiState>) -> Json<NodesResponse> {
    Json(NodesResponse {
        nodes: state.broker.registry().snapshot(),
    })
}

// ── /table ────────────────────────────────────────────────────────────────────

pub async fn handle_table(State(state): State<ApiState>) -> String {
    state.broker.registry().render_table()
}

// ── /connections ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ConnectionsResponse {
    pub connections: Vec<ConnectionEntry>,
}

#[derive(Serialize)]
pub struct ConnectionEntry {
    pub id: u64,
    pub peer: String,
    pub state: ConnectionState,
    pub nodes: Vec<String>,
    pub connected_secs: u64,
}

pub async fn handle_connections(State(state): State<ApiState>) -> Json<ConnectionsResponse> {
    let mut connections: Vec<ConnectionEntry> = state
        .broker
        .connections()
        .iter()
        .map(|e| {
            let c = e.value();
            ConnectionEntry {
                id: c.conn_id.0,
                peer: c.peer_addr.to_string(),
                state: c.state,
                nodes: c.identities.iter().map(|id| id.to_string()).collect(),
                connected_secs: c.connected_at.elapsed().as_secs(),
            }
        })
        .collect();
    connections.sort_by_key(|c| c.id);

    Json(ConnectionsResponse { connections })
}
