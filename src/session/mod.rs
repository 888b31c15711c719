//! Per-connection session state

pub mod peer;
pub mod state;

pub use peer::PeerWriter;
pub use state::{generate_session_id, Role, SessionPhase, SessionState};
