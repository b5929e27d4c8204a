//! Outbound handle to a node connection.
//!
//! Each connection owns a bounded queue drained by its writer task. A
//! `NodeLink` is the sending side. Sends never wait: a full queue or a
//! dead writer drops the message, so a slow peer cannot stall the
//! registration that triggered the write.

use std::fmt;

use bytes::Bytes;
use serde::Serialize;
use tokio::sync::mpsc;

/// Broker-local connection id, unique for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ConnId(pub u64);

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error("connection closed")]
    Closed,
    #[error("outbound queue full")]
    Full,
}

#[derive(Debug, Clone)]
pub struct NodeLink {
    conn_id: ConnId,
    tx: mpsc::Sender<Bytes>,
}

impl NodeLink {
    pub fn new(conn_id: ConnId, tx: mpsc::Sender<Bytes>) -> Self {
        Self { conn_id, tx }
    }

    /// Create a link and the receiver its writer task drains.
    pub fn channel(conn_id: ConnId, depth: usize) -> (Self, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(depth.max(1));
        (Self::new(conn_id, tx), rx)
    }

    pub fn conn_id(&self) -> ConnId {
        self.conn_id
    }

    /// Queue `payload` for the connection without waiting.
    pub fn try_send(&self, payload: impl Into<Bytes>) -> Result<(), SendError> {
        self.tx.try_send(payload.into()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SendError::Full,
            mpsc::error::TrySendError::Closed(_) => SendError::Closed,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
