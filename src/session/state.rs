//! Session state machine
//!
//! Tracks one connection from accept to close: which role it plays, which
//! channel it is bound to, and whether the handshake has reached the point
//! where raw frames are expected.

use std::time::{Duration, Instant};

use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::protocol::constants::SESSION_ID_LEN;
use crate::protocol::Reassembler;

/// Role a connection takes on; assigned at most once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// No ANNOUNCE/DESCRIBE/PLAY accepted yet
    Unset,
    /// Uploads a stream under a channel name
    Pusher,
    /// Receives a pusher's stream
    Player,
}

/// Handshake progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Connected, no command handled yet
    Init,
    /// At least one command handled
    Handshaking,
    /// RECORD (pusher) or PLAY (player) completed
    Ready,
}

/// Per-connection state
///
/// Only the connection's own task touches this struct.
#[derive(Debug)]
pub struct SessionState {
    /// Random session token returned in every response
    pub id: String,

    /// Remote peer address
    pub peer_addr: String,

    /// Role, set once
    pub role: Role,

    /// Current phase
    pub phase: SessionPhase,

    /// Channel this connection is bound to
    pub channel: Option<String>,

    /// Bytes left over from the previous read
    pub input: Reassembler,

    /// Connection start time
    pub connected_at: Instant,

    /// Total bytes received
    pub bytes_received: u64,

    closed: bool,
}

impl SessionState {
    /// Create a new session state with a fresh token
    pub fn new(peer_addr: impl Into<String>) -> Self {
        Self::with_id(generate_session_id(), peer_addr)
    }

    /// Create a new session state with a known token
    pub fn with_id(id: impl Into<String>, peer_addr: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            peer_addr: peer_addr.into(),
            role: Role::Unset,
            phase: SessionPhase::Init,
            channel: None,
            input: Reassembler::new(),
            connected_at: Instant::now(),
            bytes_received: 0,
            closed: false,
        }
    }

    /// Record that a command was handled
    pub fn on_command(&mut self) {
        if self.phase == SessionPhase::Init {
            self.phase = SessionPhase::Handshaking;
        }
    }

    /// Bind the session to a channel
    pub fn set_channel(&mut self, channel: impl Into<String>) {
        self.channel = Some(channel.into());
    }

    /// Assign a role if none has been assigned yet
    ///
    /// Returns true if the session now has `role`.
    pub fn assign_role(&mut self, role: Role) -> bool {
        if self.role == Role::Unset {
            self.role = role;
        }
        self.role == role
    }

    /// Mark the handshake as complete
    pub fn mark_ready(&mut self) {
        self.phase = SessionPhase::Ready;
    }

    /// Check if the handshake is complete
    pub fn is_ready(&self) -> bool {
        self.phase == SessionPhase::Ready
    }

    /// Check if incoming bytes are interleaved frames rather than requests
    pub fn accepts_media(&self) -> bool {
        self.is_ready() && self.role == Role::Pusher
    }

    /// Add to the received byte counter
    pub fn add_bytes_received(&mut self, bytes: usize) {
        self.bytes_received += bytes as u64;
    }

    /// Get session duration
    pub fn duration(&self) -> Duration {
        self.connected_at.elapsed()
    }

    /// Mark the session closed
    ///
    /// Returns false if it was already closed.
    pub fn close(&mut self) -> bool {
        !std::mem::replace(&mut self.closed, true)
    }
}

/// Generate a random alphanumeric session token
pub fn generate_session_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_ID_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_lifecycle() {
        let mut state = SessionState::new("127.0.0.1:50000");

        assert_eq!(state.phase, SessionPhase::Init);
        assert_eq!(state.role, Role::Unset);

        state.on_command();
        assert_eq!(state.phase, SessionPhase::Handshaking);

        assert!(state.assign_role(Role::Pusher));
        assert!(!state.accepts_media());

        state.mark_ready();
        assert!(state.is_ready());
        assert!(state.accepts_media());
    }

    #[test]
    fn test_role_is_assigned_once() {
        let mut state = SessionState::new("127.0.0.1:50000");

        assert!(state.assign_role(Role::Player));
        assert!(!state.assign_role(Role::Pusher));
        assert!(state.assign_role(Role::Player));
        assert_eq!(state.role, Role::Player);
    }

    #[test]
    fn test_ready_player_does_not_accept_media() {
        let mut state = SessionState::new("127.0.0.1:50000");
        state.assign_role(Role::Player);
        state.mark_ready();

        assert!(!state.accepts_media());
    }

    #[test]
    fn test_close_once() {
        let mut state = SessionState::new("127.0.0.1:50000");

        assert!(state.close());
        assert!(!state.close());
    }

    #[test]
    fn test_session_id_shape() {
        let id = generate_session_id();

        assert_eq!(id.len(), SESSION_ID_LEN);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(id, generate_session_id());
    }
}
