//! Node registry: the live set of known sensor nodes.
//!
//! One ordered list of (descriptor, link) entries behind a single lock.
//! Every mutation and every snapshot takes that lock, so a snapshot always
//! reflects one instant and the one-entry-per-identity rule holds under
//! concurrent registration. No I/O happens while the lock is held.
//!
//! Insertion order is kept for display only; matching ignores it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use nexus_core::config::Reregistration;
use nexus_core::node::render_table;
use nexus_core::{NodeDescriptor, NodeIdentity};

use crate::link::{ConnId, NodeLink};

#[derive(Debug, Clone)]
struct RegistryEntry {
    descriptor: NodeDescriptor,
    link: NodeLink,
}

/// What a registration did to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// New identity, appended.
    Added,
    /// Identity already present; its sets are unchanged, only the link
    /// moved to the registering connection.
    Duplicate,
    /// Identity already present; its sets and link were overwritten.
    Replaced,
}

impl Registration {
    /// Whether the registry contents changed.
    pub fn changed(&self) -> bool {
        !matches!(self, Self::Duplicate)
    }
}

/// Point-in-time copy of the registry, with the links needed to reach
/// each node. Safe to iterate while the registry keeps changing.
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    nodes: Vec<NodeDescriptor>,
    links: Vec<NodeLink>,
}

impl RegistrySnapshot {
    pub fn nodes(&self) -> &[NodeDescriptor] {
        &self.nodes
    }

    pub fn link_for(&self, identity: &NodeIdentity) -> Option<&NodeLink> {
        self.nodes
            .iter()
            .position(|n| &n.identity == identity)
            .map(|i| &self.links[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeDescriptor, &NodeLink)> {
        self.nodes.iter().zip(self.links.iter())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// The node registry, shared between every connection task and the API.
#[derive(Clone, Default)]
pub struct Registry {
    entries: Arc<Mutex<Vec<RegistryEntry>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave a half-applied entry:
    // every mutation is a single push, remove or field swap.
    fn lock(&self) -> MutexGuard<'_, Vec<RegistryEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert `descriptor` unless its identity is already present.
    /// Returns true if it was newly added.
    pub fn register(&self, descriptor: NodeDescriptor, link: NodeLink) -> bool {
        self.register_with(descriptor, link, Reregistration::Keep) == Registration::Added
    }

    /// Insert `descriptor`, resolving an existing identity per `policy`.
    pub fn register_with(
        &self,
        descriptor: NodeDescriptor,
        link: NodeLink,
        policy: Reregistration,
    ) -> Registration {
        let mut entries = self.lock();
        match entries
            .iter_mut()
            .find(|e| e.descriptor.identity == descriptor.identity)
        {
            Some(existing) => match policy {
                Reregistration::Keep => {
                    // Sets stay as first registered; notices follow the
                    // node to its newest connection.
                    existing.link = link;
                    Registration::Duplicate
                }
                Reregistration::Replace => {
                    existing.descriptor = descriptor;
                    existing.link = link;
                    Registration::Replaced
                }
            },
            None => {
                entries.push(RegistryEntry { descriptor, link });
                Registration::Added
            }
        }
    }

    /// Remove the entry with this identity. Returns whether one was removed.
    pub fn remove(&self, identity: &NodeIdentity) -> bool {
        let mut entries = self.lock();
        match entries
            .iter()
            .position(|e| &e.descriptor.identity == identity)
        {
            Some(i) => {
                entries.remove(i);
                true
            }
            None => false,
        }
    }

    /// Remove the first entry, in registry order, with this hostname.
    /// Returns the identity that was removed.
    pub fn remove_first_by_hostname(&self, hostname: &str) -> Option<NodeIdentity> {
        let mut entries = self.lock();
        let i = entries
            .iter()
            .position(|e| e.descriptor.identity.hostname == hostname)?;
        Some(entries.remove(i).descriptor.identity)
    }

    /// Remove `identity` only if its entry is reachable through `conn_id`.
    ///
    /// Used on disconnect: a node that re-registered over a newer
    /// connection must not be purged by the old one going away.
    pub fn remove_if_bound(&self, identity: &NodeIdentity, conn_id: ConnId) -> bool {
        let mut entries = self.lock();
        match entries.iter().position(|e| {
            &e.descriptor.identity == identity && e.link.conn_id() == conn_id
        }) {
            Some(i) => {
                entries.remove(i);
                true
            }
            None => false,
        }
    }

    /// Descriptors in registry order.
    pub fn snapshot(&self) -> Vec<NodeDescriptor> {
        self.lock().iter().map(|e| e.descriptor.clone()).collect()
    }

    /// Descriptors and their links, taken under one lock.
    pub fn snapshot_with_links(&self) -> RegistrySnapshot {
        let entries = self.lock();
        let mut snapshot = RegistrySnapshot {
            nodes: Vec::with_capacity(entries.len()),
            links: Vec::with_capacity(entries.len()),
        };
        for e in entries.iter() {
            snapshot.nodes.push(e.descriptor.clone());
            snapshot.links.push(e.link.clone());
        }
        snapshot
    }

    pub fn get(&self, identity: &NodeIdentity) -> Option<NodeDescriptor> {
        self.lock()
            .iter()
            .find(|e| &e.descriptor.identity == identity)
            .map(|e| e.descriptor.clone())
    }

    pub fn contains(&self, identity: &NodeIdentity) -> bool {
        self.lock()
            .iter()
            .any(|e| &e.descriptor.identity == identity)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Newline-delimited `hostname-ip-capabilities-interests` table.
    pub fn render_table(&self) -> String {
        render_table(&self.snapshot())
    }
}
