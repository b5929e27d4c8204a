//! Broadcast gateway: pushes operator commands to every registered node.
//!
//! Fire-and-forget: no acknowledgement, no retry. A node whose connection
//! is dead or backed up is skipped and stays in the registry.

use serde::Serialize;

use nexus_core::OperatorCommand;

use crate::registry::Registry;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BroadcastReport {
    /// Nodes the command was queued for.
    pub delivered: usize,
    /// Nodes whose connection refused it.
    pub skipped: usize,
}

/// Write `command` verbatim to every registered connection, in registry order.
pub fn broadcast(registry: &Registry, command: &str) -> BroadcastReport {
    let mut report = BroadcastReport::default();
    for (node, link) in registry.snapshot_with_links().iter() {
        match link.try_send(command.to_owned()) {
            Ok(()) => report.delivered += 1,
            Err(e) => {
                tracing::debug!(node = %node.identity, error = %e, "broadcast skipped node");
                report.skipped += 1;
            }
        }
    }
    tracing::info!(
        command,
        delivered = report.delivered,
        skipped = report.skipped,
        "operator command broadcast"
    );
    report
}

pub fn broadcast_command(registry: &Registry, command: OperatorCommand) -> BroadcastReport {
    broadcast(registry, command.as_str())
}
