//! Registry error types

use thiserror::Error;

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Channel already has a pusher
    #[error("channel already has a pusher: {0}")]
    ChannelOccupied(String),

    /// Channel has no pusher
    #[error("channel not found: {0}")]
    ChannelNotFound(String),
}
