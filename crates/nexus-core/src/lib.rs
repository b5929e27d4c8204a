//! nexus-core: node model, wire protocol, topic matching, and configuration.
//! All other Nexus crates depend on this one.

pub mod config;
pub mod matcher;
pub mod node;
pub mod wire;

pub use node::{NodeDescriptor, NodeIdentity, TopicSet};
pub use wire::{ControlMessage, OperatorCommand, WireError};
