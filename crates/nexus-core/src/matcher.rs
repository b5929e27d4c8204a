//! Topic matching: who should talk to whom.
//!
//! Pure functions over a registry snapshot. A match in either direction
//! needs a non-empty overlap between one side's capabilities and the
//! other side's interests, and a node never matches itself.

use crate::node::NodeDescriptor;

/// Peers the subject should subscribe to: every node whose capabilities
/// cover at least one of the subject's interests.
pub fn subscriptions_for<'a>(
    subject: &NodeDescriptor,
    snapshot: &'a [NodeDescriptor],
) -> Vec<&'a NodeDescriptor> {
    snapshot
        .iter()
        .filter(|s| !s.same_node(subject))
        .filter(|s| !s.capabilities.is_empty())
        .filter(|s| s.capabilities.overlaps(&subject.interests))
        .collect()
}

/// Peers that want what the subject produces: every node whose interests
/// cover at least one of the subject's capabilities.
pub fn interested_in<'a>(
    subject: &NodeDescriptor,
    snapshot: &'a [NodeDescriptor],
) -> Vec<&'a NodeDescriptor> {
    snapshot
        .iter()
        .filter(|s| !s.same_node(subject))
        .filter(|s| !s.interests.is_empty())
        .filter(|s| subject.capabilities.overlaps(&s.interests))
        .collect()
}
