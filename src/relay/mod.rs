//! Broadcast relay
//!
//! One relay task per pusher, started on RECORD. The pusher's connection
//! feeds demultiplexed units into a bounded queue; the relay task keeps a
//! trailing cache and writes each unit to every attached player.

pub mod broadcaster;
pub mod cache;

use bytes::Bytes;

pub use broadcaster::{Relay, RelayStats};
pub use cache::TrailingCache;

/// Message on a pusher's relay queue
#[derive(Debug, Clone)]
pub enum RelayCommand {
    /// One or more complete interleaved frames, back to back
    Frames(Bytes),
    /// Stop the relay task
    Shutdown,
}
