//! Channel entry
//!
//! The pusher side of a channel: its media description, the players
//! attached to it, and the sending half of its relay queue.

use std::collections::HashMap;
use std::time::Instant;

use bytes::Bytes;
use tokio::sync::{mpsc, RwLock, RwLockReadGuard};

use super::player::Player;
use crate::relay::RelayCommand;

/// Entry for a single channel in the registry
#[derive(Debug)]
pub struct ChannelEntry {
    /// Channel name
    pub channel: String,

    /// Pusher's session token
    pub session_id: String,

    /// Pusher's remote address
    pub peer_addr: String,

    /// Media description published verbatim on DESCRIBE
    description: Bytes,

    /// Attached players keyed by remote address
    players: RwLock<HashMap<String, Player>>,

    /// Relay queue, drained by the pusher's relay task
    tx: mpsc::Sender<RelayCommand>,

    /// When the channel was announced
    pub created_at: Instant,
}

impl ChannelEntry {
    /// Create an entry and the receiving half of its relay queue
    pub fn new(
        channel: impl Into<String>,
        session_id: impl Into<String>,
        peer_addr: impl Into<String>,
        description: Bytes,
        queue_capacity: usize,
    ) -> (Self, mpsc::Receiver<RelayCommand>) {
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));

        let entry = Self {
            channel: channel.into(),
            session_id: session_id.into(),
            peer_addr: peer_addr.into(),
            description,
            players: RwLock::new(HashMap::new()),
            tx,
            created_at: Instant::now(),
        };

        (entry, rx)
    }

    /// Get the media description
    pub fn description(&self) -> &Bytes {
        &self.description
    }

    /// Attach a player, replacing any previous player from the same address
    pub async fn add_player(&self, player: Player) {
        let mut players = self.players.write().await;
        players.insert(player.addr.clone(), player);
    }

    /// Detach a player by address
    pub async fn remove_player(&self, addr: &str) -> bool {
        self.players.write().await.remove(addr).is_some()
    }

    /// Detach a batch of players under a single write lock
    pub async fn remove_players(&self, addrs: &[String]) -> usize {
        let mut players = self.players.write().await;
        addrs
            .iter()
            .filter(|addr| players.remove(addr.as_str()).is_some())
            .count()
    }

    /// Get the number of attached players
    pub async fn player_count(&self) -> usize {
        self.players.read().await.len()
    }

    /// Read access to the player set for fan-out
    pub async fn players(&self) -> RwLockReadGuard<'_, HashMap<String, Player>> {
        self.players.read().await
    }

    /// Queue a unit of frames for relay
    ///
    /// Waits while the queue is full. Returns false if the relay task is gone.
    pub async fn enqueue(&self, unit: Bytes) -> bool {
        self.tx.send(RelayCommand::Frames(unit)).await.is_ok()
    }

    /// Ask the relay task to stop
    pub async fn shutdown(&self) {
        let _ = self.tx.send(RelayCommand::Shutdown).await;
    }
}
