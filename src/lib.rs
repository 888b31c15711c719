//! RTSP push/play relay
//!
//! A pusher announces a channel, sets up and records; from then on it
//! streams interleaved binary frames over the same TCP connection. Players
//! describe and play the channel and receive every frame the pusher sends,
//! starting with a short trailing cache.
//!
//! # Example
//!
//! ```no_run
//! use rtsp_relay::{RelayServer, ServerConfig};
//!
//! # async fn run() -> rtsp_relay::Result<()> {
//! let config = ServerConfig::load("rtsp.json");
//! RelayServer::new(config).run().await
//! # }
//! ```

pub mod error;
pub mod protocol;
pub mod registry;
pub mod relay;
pub mod server;
pub mod session;

pub use error::{Error, Result};
pub use registry::ChannelRegistry;
pub use server::{RelayServer, ServerConfig};
