//! Live node connections: what the broker knows about each open socket.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use serde::Serialize;

use nexus_core::NodeIdentity;

use crate::link::ConnId;

/// Per-connection protocol state. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// Connected, nothing registered yet.
    Unregistered,
    /// At least one registration accepted.
    Registered,
    /// Departed; no further frames are read.
    Closed,
}

#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub conn_id: ConnId,
    pub peer_addr: SocketAddr,
    pub state: ConnectionState,
    /// Identities registered over this connection and not yet removed.
    pub identities: Vec<NodeIdentity>,
    pub connected_at: Instant,
}

impl ConnectionInfo {
    pub fn new(conn_id: ConnId, peer_addr: SocketAddr) -> Self {
        Self {
            conn_id,
            peer_addr,
            state: ConnectionState::Unregistered,
            identities: Vec::new(),
            connected_at: Instant::now(),
        }
    }
}

/// The connection table. Written by connection tasks, read by the API.
pub type ConnectionTable = Arc<DashMap<ConnId, ConnectionInfo>>;

/// Create a new empty connection table.
pub fn new_connection_table() -> ConnectionTable {
    Arc::new(DashMap::new())
}

/// Why a connection's read side stopped abnormally.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),
    #[error("peer went away")]
    Eof,
}
