//! HTTP API handlers: exposes broker state as JSON and pushes registry
//! updates to dashboards.

pub mod command;
pub mod events;
pub mod nodes;
pub mod status;

use std::net::SocketAddr;

use nexus_services::{Broker, DashboardFeed};

#[derive(Clone)]
pub struct ApiState {
    pub broker: Broker,
    /// Same feed the broker notifies; the events stream subscribes here.
    pub feed: DashboardFeed,
    /// Address nodes connect to, for display.
    pub listen_addr: SocketAddr,
}

// Re-export handler functions for use in router setup.
pub use command::handle_command;
pub use events::handle_events;
pub use nodes::{handle_connections, handle_nodes, handle_table};
pub use status::handle_status;
