//! Channel registry for push/play routing
//!
//! The registry maps each channel name to the one pusher currently
//! publishing on it. Every pusher owns its player set and a bounded relay
//! queue; a dedicated relay task drains the queue and writes to the players.
//!
//! # Architecture
//!
//! ```text
//!                        Arc<ChannelRegistry>
//!                   ┌───────────────────────────┐
//!                   │ channels: HashMap<name,   │
//!                   │   Arc<ChannelEntry {      │
//!                   │     description,          │
//!                   │     players: RwLock<..>,  │
//!                   │     tx: mpsc::Sender,     │
//!                   │   }>                      │
//!                   │ >                         │
//!                   └─────────────┬─────────────┘
//!                                 │
//!     [Pusher conn] ── demux ──► tx ──► [Relay task] ──┬──► Player TCP
//!                                        trailing cache └──► Player TCP
//! ```
//!
//! Two lock levels: the registry map and each entry's player set. The map
//! lock is never taken while holding a player-set lock.

pub mod entry;
pub mod error;
pub mod player;
pub mod store;

pub use entry::ChannelEntry;
pub use error::RegistryError;
pub use player::Player;
pub use store::ChannelRegistry;
