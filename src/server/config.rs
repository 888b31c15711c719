//! Server configuration

use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;

use serde::Deserialize;

use crate::error::{ConfigError, Result};
use crate::protocol::constants::*;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Trailing cache capacity per pusher, in relayed units (0 = disabled)
    pub frame_buffer: usize,

    /// Capacity of each pusher's relay queue
    pub queue_capacity: usize,

    /// Size of a single transport read
    pub read_buffer_size: usize,

    /// Largest incomplete text request kept across reads
    pub max_request_size: usize,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            frame_buffer: DEFAULT_FRAME_BUFFER,
            queue_capacity: RELAY_QUEUE_CAPACITY,
            read_buffer_size: READ_BUFFER_SIZE,
            max_request_size: MAX_REQUEST_SIZE,
            tcp_nodelay: true, // Important for low latency
        }
    }
}

/// On-disk configuration file
///
/// ```json
/// { "port": 8554, "frame_buffer": 60 }
/// ```
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    port: Option<u16>,
    frame_buffer: Option<i64>,
}

impl ServerConfig {
    /// Load configuration from a JSON file
    ///
    /// Never fails: a missing or unreadable file, or one that does not
    /// parse, yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();

        match Self::try_load(path) {
            Ok(config) => {
                tracing::info!(
                    path = %path.display(),
                    port = config.bind_addr.port(),
                    frame_buffer = config.frame_buffer,
                    "Configuration loaded"
                );
                config
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Using default configuration");
                Self::default()
            }
        }
    }

    /// Load configuration from a JSON file, reporting failures
    pub fn try_load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Read)?;
        Ok(Self::from_json(&contents)?)
    }

    /// Parse configuration from JSON text
    ///
    /// Zero means "not set" for both fields. A negative `frame_buffer`
    /// disables the trailing cache.
    pub fn from_json(json: &str) -> std::result::Result<Self, ConfigError> {
        let file: ConfigFile = serde_json::from_str(json)?;
        let mut config = Self::default();

        if let Some(port) = file.port.filter(|port| *port != 0) {
            config.bind_addr.set_port(port);
        }
        if let Some(frames) = file.frame_buffer.filter(|frames| *frames != 0) {
            config.frame_buffer = usize::try_from(frames).unwrap_or(0);
        }

        Ok(config)
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the trailing cache capacity
    pub fn frame_buffer(mut self, frames: usize) -> Self {
        self.frame_buffer = frames;
        self
    }

    /// Set the relay queue capacity
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Set the largest incomplete request kept across reads
    pub fn max_request_size(mut self, size: usize) -> Self {
        self.max_request_size = size;
        self
    }
}
