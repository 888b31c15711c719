//! Attached players

use std::io;

use crate::session::PeerWriter;

/// A player attached to a pusher's channel
///
/// Keyed by remote address in the pusher's player set.
#[derive(Debug, Clone)]
pub struct Player {
    /// Player's session token
    pub session_id: String,

    /// Remote peer address
    pub addr: String,

    writer: PeerWriter,
}

impl Player {
    /// Create a player handle
    pub fn new(session_id: impl Into<String>, addr: impl Into<String>, writer: PeerWriter) -> Self {
        Self {
            session_id: session_id.into(),
            addr: addr.into(),
            writer,
        }
    }

    /// Write one unit to the player
    pub async fn send(&self, data: &[u8]) -> io::Result<()> {
        self.writer.send(data).await
    }
}
