//! Connection handler: the per-connection protocol state machine.
//!
//! Unregistered → Registered → Closed. A registration is matched against
//! the registry in both directions and answered with introduction notices.
//! A departure removes one entry and closes the connection. Anything else a
//! node sends is ignored.

use std::net::SocketAddr;

use nexus_core::config::DepartureMatch;
use nexus_core::matcher::{interested_in, subscriptions_for};
use nexus_core::wire::introduction;
use nexus_core::{ControlMessage, NodeDescriptor, NodeIdentity};

use crate::broker::Broker;
use crate::connection::{ConnectionError, ConnectionInfo, ConnectionState};
use crate::link::{ConnId, NodeLink};

pub struct ConnectionHandler {
    broker: Broker,
    conn_id: ConnId,
    peer_addr: SocketAddr,
    link: NodeLink,
    state: ConnectionState,
    /// Identities registered over this connection.
    bound: Vec<NodeIdentity>,
}

impl ConnectionHandler {
    pub fn new(broker: Broker, peer_addr: SocketAddr, link: NodeLink) -> Self {
        let conn_id = link.conn_id();
        broker
            .connections()
            .insert(conn_id, ConnectionInfo::new(conn_id, peer_addr));
        Self {
            broker,
            conn_id,
            peer_addr,
            link,
            state: ConnectionState::Unregistered,
            bound: Vec::new(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn conn_id(&self) -> ConnId {
        self.conn_id
    }

    /// Process one inbound frame. Returns the state afterwards.
    pub fn handle_frame(&mut self, frame: &[u8]) -> ConnectionState {
        if self.state == ConnectionState::Closed {
            return self.state;
        }

        match ControlMessage::parse_bytes(frame) {
            Ok(ControlMessage::Register(node)) => self.on_register(node),
            Ok(ControlMessage::Depart { hostname }) => self.on_depart(&hostname),
            Ok(other) => {
                tracing::debug!(conn = %self.conn_id, message = ?other, "ignoring broker-bound message from node");
            }
            Err(e) => {
                tracing::debug!(
                    conn = %self.conn_id,
                    peer = %self.peer_addr,
                    error = %e,
                    frame = %String::from_utf8_lossy(frame),
                    "ignoring malformed frame"
                );
            }
        }
        self.state
    }

    fn on_register(&mut self, node: NodeDescriptor) {
        let registry = self.broker.registry().clone();
        let outcome = registry.register_with(
            node.clone(),
            self.link.clone(),
            self.broker.config().reregistration,
        );

        if !self.bound.contains(&node.identity) {
            self.bound.push(node.identity.clone());
        }
        self.set_state(ConnectionState::Registered);

        tracing::info!(
            conn = %self.conn_id,
            node = %node.identity,
            capabilities = %node.capabilities,
            interests = %node.interests,
            ?outcome,
            "node registered"
        );
        if outcome.changed() {
            self.broker.notify_changed();
        }

        let snapshot = registry.snapshot_with_links();

        // Subject first: who it should subscribe to.
        for peer in subscriptions_for(&node, snapshot.nodes()) {
            tracing::debug!(to = %node.identity, about = %peer.identity, "introduction");
            if let Err(e) = self.link.try_send(introduction(peer)) {
                tracing::warn!(conn = %self.conn_id, error = %e, "introduction to subject dropped");
            }
        }

        // Then every peer that wants what the subject produces.
        let notice = introduction(&node);
        for peer in interested_in(&node, snapshot.nodes()) {
            let Some(link) = snapshot.link_for(&peer.identity) else {
                continue;
            };
            tracing::debug!(to = %peer.identity, about = %node.identity, "introduction");
            if let Err(e) = link.try_send(notice.clone()) {
                tracing::warn!(peer = %peer.identity, error = %e, "introduction to peer dropped");
            }
        }
    }

    fn on_depart(&mut self, hostname: &str) {
        let registry = self.broker.registry().clone();
        let removed = match self.broker.config().departure_match {
            DepartureMatch::FirstByHostname => registry.remove_first_by_hostname(hostname),
            DepartureMatch::BoundIdentity => self
                .bound
                .iter()
                .find(|id| id.hostname == hostname)
                .filter(|id| registry.remove_if_bound(id, self.conn_id))
                .cloned(),
        };

        match &removed {
            Some(identity) => {
                self.bound.retain(|id| id != identity);
                tracing::info!(conn = %self.conn_id, node = %identity, "node departed");
                self.broker.notify_changed();
            }
            None => {
                tracing::debug!(conn = %self.conn_id, hostname, "departure for unknown hostname");
            }
        }
        self.set_state(ConnectionState::Closed);
    }

    /// Tear down after the reader stops, cleanly or not.
    pub fn on_disconnect(mut self, cause: Option<&ConnectionError>) {
        match cause {
            Some(e) => tracing::info!(conn = %self.conn_id, peer = %self.peer_addr, error = %e, "connection lost"),
            None => tracing::info!(conn = %self.conn_id, peer = %self.peer_addr, "connection closed"),
        }

        if self.broker.config().purge_on_disconnect {
            let registry = self.broker.registry().clone();
            let mut purged = 0;
            for identity in self.bound.drain(..) {
                if registry.remove_if_bound(&identity, self.conn_id) {
                    tracing::info!(conn = %self.conn_id, node = %identity, "purged on disconnect");
                    purged += 1;
                }
            }
            if purged > 0 {
                self.broker.notify_changed();
            }
        }

        self.broker.connections().remove(&self.conn_id);
    }

    fn set_state(&mut self, state: ConnectionState) {
        self.state = state;
        if let Some(mut info) = self.broker.connections().get_mut(&self.conn_id) {
            info.state = state;
            info.identities = self.bound.clone();
        }
    }
}
