//! Relay server
//!
//! This module provides:
//! - TCP accept loop with a task per connection
//! - Per-connection request handling and close cascade
//! - JSON-backed configuration

pub mod config;
pub mod connection;
pub mod listener;

pub use config::ServerConfig;
pub use connection::Connection;
pub use listener::RelayServer;
