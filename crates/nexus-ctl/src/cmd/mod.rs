//! CLI command modules.

pub mod command;
pub mod http;
pub mod nodes;
pub mod status;
