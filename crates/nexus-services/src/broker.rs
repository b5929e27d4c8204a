//! Broker: shared state behind every node connection, and the TCP accept
//! loop that feeds it.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;
use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, oneshot};

use nexus_core::config::BrokerConfig;
use nexus_core::OperatorCommand;

use crate::connection::{new_connection_table, ConnectionError, ConnectionState, ConnectionTable};
use crate::frame::FrameDecoder;
use crate::gateway::{broadcast_command, BroadcastReport};
use crate::handler::ConnectionHandler;
use crate::link::{ConnId, NodeLink};
use crate::observer::RegistryObserver;
use crate::registry::Registry;

const READ_BUF: usize = 4096;

/// Cheap to clone; every clone shares the same registry and tables.
#[derive(Clone)]
pub struct Broker {
    registry: Registry,
    connections: ConnectionTable,
    observer: Arc<dyn RegistryObserver>,
    config: BrokerConfig,
    next_conn_id: Arc<AtomicU64>,
}

impl Broker {
    pub fn new(config: BrokerConfig, observer: Arc<dyn RegistryObserver>) -> Self {
        Self {
            registry: Registry::new(),
            connections: new_connection_table(),
            observer,
            config,
            next_conn_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn connections(&self) -> &ConnectionTable {
        &self.connections
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    pub fn next_conn_id(&self) -> ConnId {
        ConnId(self.next_conn_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Push an operator command to every registered node.
    pub fn broadcast(&self, command: OperatorCommand) -> BroadcastReport {
        broadcast_command(&self.registry, command)
    }

    /// Re-send the current table to the observer without any change.
    pub fn refresh(&self) {
        self.notify_changed();
    }

    pub(crate) fn notify_changed(&self) {
        let table = self.registry.render_table();
        self.observer.on_registry_changed(&table);
    }
}

/// Accepts node connections and spawns a task per connection.
pub struct NodeListener {
    listener: TcpListener,
    broker: Broker,
    shutdown: broadcast::Receiver<()>,
}

impl NodeListener {
    pub fn new(listener: TcpListener, broker: Broker, shutdown: broadcast::Receiver<()>) -> Self {
        Self {
            listener,
            broker,
            shutdown,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        if let Ok(addr) = self.listener.local_addr() {
            tracing::info!(%addr, "broker listening");
        }

        loop {
            tokio::select! {
                _ = self.shutdown.recv() => {
                    tracing::info!("node listener shutting down");
                    return Ok(());
                }

                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer_addr)) => {
                            let broker = self.broker.clone();
                            tokio::spawn(handle_connection(broker, stream, peer_addr));
                        }
                        Err(e) => tracing::warn!(error = %e, "accept failed"),
                    }
                }
            }
        }
    }
}

/// Drive one node connection to completion.
pub async fn handle_connection(broker: Broker, stream: TcpStream, peer_addr: SocketAddr) {
    if let Err(e) = stream.set_nodelay(true) {
        tracing::debug!(peer = %peer_addr, error = %e, "set_nodelay failed");
    }
    let (mut reader, writer) = stream.into_split();

    let conn_id = broker.next_conn_id();
    let (link, rx) = NodeLink::channel(conn_id, broker.config().outbound_queue.max(1));
    let (close_tx, close_rx) = oneshot::channel();
    let writer_task = tokio::spawn(write_loop(conn_id, rx, writer, close_rx));

    tracing::info!(conn = %conn_id, peer = %peer_addr, "node connected");
    let mut handler = ConnectionHandler::new(broker.clone(), peer_addr, link);
    let mut decoder = FrameDecoder::new(broker.config().frame_mode, broker.config().max_frame_len);
    let mut buf = vec![0u8; READ_BUF];

    let cause = loop {
        match reader.read(&mut buf).await {
            Ok(0) => {
                if let Some(tail) = decoder.finish() {
                    handler.handle_frame(&tail);
                }
                break match handler.state() {
                    ConnectionState::Closed => None,
                    _ => Some(ConnectionError::Eof),
                };
            }
            Ok(n) => {
                let closed = decoder
                    .decode(&buf[..n])
                    .iter()
                    .any(|frame| handler.handle_frame(frame) == ConnectionState::Closed);
                if closed {
                    break None;
                }
            }
            Err(e) => break Some(ConnectionError::from(e)),
        }
    };

    handler.on_disconnect(cause.as_ref());
    let _ = close_tx.send(());
    if let Err(e) = writer_task.await {
        tracing::warn!(conn = %conn_id, error = %e, "writer task failed");
    }
}

/// Drain the connection's outbound queue onto the socket until told to
/// close, the queue's senders are all gone, or a write fails.
async fn write_loop(
    conn_id: ConnId,
    mut rx: mpsc::Receiver<Bytes>,
    mut writer: OwnedWriteHalf,
    mut close: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            biased;

            msg = rx.recv() => {
                let Some(msg) = msg else { break };
                if let Err(e) = writer.write_all(&msg).await {
                    tracing::debug!(conn = %conn_id, error = %e, "write failed");
                    return;
                }
            }

            _ = &mut close => {
                // Flush whatever was queued before the close.
                while let Ok(msg) = rx.try_recv() {
                    if writer.write_all(&msg).await.is_err() {
                        return;
                    }
                }
                break;
            }
        }
    }
    let _ = writer.shutdown().await;
}
