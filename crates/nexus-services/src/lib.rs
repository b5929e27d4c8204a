pub mod broker;
pub mod connection;
pub mod frame;
pub mod gateway;
pub mod handler;
pub mod link;
pub mod observer;
pub mod registry;

pub use broker::{handle_connection, Broker, NodeListener};
pub use connection::{
    new_connection_table, ConnectionError, ConnectionInfo, ConnectionState, ConnectionTable,
};
pub use frame::FrameDecoder;
pub use gateway::{broadcast, broadcast_command, BroadcastReport};
pub use handler::ConnectionHandler;
pub use link::{ConnId, NodeLink, SendError};
pub use observer::{DashboardFeed, NoopObserver, RegistryObserver};
pub use registry::{Registration, Registry, RegistrySnapshot};
