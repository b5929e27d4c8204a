//! Node model: who a sensor node is and what it produces and wants.
//!
//! These are pure values. The live connection used to reach a node is
//! kept next to the descriptor in the registry, never inside it, so the
//! matcher can run without knowing anything about transport.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Separator between topics inside a capability or interest list.
pub const TOPIC_SEPARATOR: char = ':';

// ── Identity ──────────────────────────────────────────────────────────────────

/// The (hostname, ip) pair that uniquely names a node.
///
/// Both fields are compared as exact strings. No address normalisation
/// is done: `10.0.0.1` and `010.0.0.1` are different identities.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeIdentity {
    pub hostname: String,
    pub ip: String,
}

impl NodeIdentity {
    pub fn new(hostname: impl Into<String>, ip: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            ip: ip.into(),
        }
    }
}

impl fmt::Display for NodeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.hostname, self.ip)
    }
}

// ── Topics ────────────────────────────────────────────────────────────────────

/// A set of topic names. Deduplicated, rendered in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopicSet(BTreeSet<String>);

impl TopicSet {
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Parse a `:`-joined topic list. The empty string is the empty set,
    /// and empty segments (`temp::light`) are dropped.
    pub fn parse(list: &str) -> Self {
        list.split(TOPIC_SEPARATOR)
            .filter(|t| !t.is_empty())
            .map(str::to_owned)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, topic: &str) -> bool {
        self.0.contains(topic)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// True if the two sets share at least one topic.
    pub fn overlaps(&self, other: &TopicSet) -> bool {
        // Walk the smaller set, look up in the larger one.
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        small.iter().any(|t| large.contains(t))
    }
}

impl<S: Into<String>> FromIterator<S> for TopicSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for TopicSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for topic in &self.0 {
            if !first {
                write!(f, "{TOPIC_SEPARATOR}")?;
            }
            f.write_str(topic)?;
            first = false;
        }
        Ok(())
    }
}

// ── Descriptor ────────────────────────────────────────────────────────────────

/// One registered sensor node: identity plus what it has and what it wants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDescriptor {
    pub identity: NodeIdentity,
    /// Topics this node produces.
    pub capabilities: TopicSet,
    /// Topics this node wants to receive.
    pub interests: TopicSet,
}

impl NodeDescriptor {
    pub fn new(identity: NodeIdentity, capabilities: TopicSet, interests: TopicSet) -> Self {
        Self {
            identity,
            capabilities,
            interests,
        }
    }

    pub fn hostname(&self) -> &str {
        &self.identity.hostname
    }

    pub fn ip(&self) -> &str {
        &self.identity.ip
    }

    /// Same identity as `other`. Topic sets are not compared.
    pub fn same_node(&self, other: &NodeDescriptor) -> bool {
        self.identity == other.identity
    }
}

/// Renders as `hostname-ip-capabilities-interests`, the form used both
/// in introduction notices and in the dashboard table.
impl fmt::Display for NodeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}",
            self.identity.hostname, self.identity.ip, self.capabilities, self.interests
        )
    }
}

/// Render a registry snapshot as the newline-delimited dashboard table.
pub fn render_table<'a>(nodes: impl IntoIterator<Item = &'a NodeDescriptor>) -> String {
    let mut out = String::new();
    for node in nodes {
        out.push_str(&node.to_string());
        out.push('\n');
    }
    out
}
