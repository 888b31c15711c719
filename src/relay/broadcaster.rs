//! Per-pusher relay task
//!
//! Drains a pusher's relay queue and writes every unit to every attached
//! player, in queue order. Ingestion and fan-out are decoupled: the pusher's
//! read loop only ever waits on the queue, never on a player socket.
//!
//! Player writes have no timeout. A player whose receive window is full
//! stalls the whole iteration, and therefore every other player of the same
//! pusher, until it drains or its connection fails.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::cache::TrailingCache;
use super::RelayCommand;
use crate::registry::{ChannelEntry, Player};

/// Counters reported when a relay task stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    /// Units received from the queue
    pub units_relayed: u64,
    /// Players removed after a failed write
    pub players_pruned: u64,
}

/// Relay loop state for one pusher
pub struct Relay {
    entry: Arc<ChannelEntry>,
    rx: mpsc::Receiver<RelayCommand>,
    cache: TrailingCache,
    /// Set once the backlog has been flushed to a player. Scoped to the
    /// pusher: players attaching after the first flush get no backlog.
    backlog_sent: bool,
    stats: RelayStats,
}

impl Relay {
    /// Create a relay for `entry` draining `rx`
    pub fn new(entry: Arc<ChannelEntry>, rx: mpsc::Receiver<RelayCommand>, frame_buffer: usize) -> Self {
        Self {
            entry,
            rx,
            cache: TrailingCache::new(frame_buffer),
            backlog_sent: false,
            stats: RelayStats::default(),
        }
    }

    /// Spawn the relay loop
    pub fn spawn(self) -> JoinHandle<RelayStats> {
        tokio::spawn(self.run())
    }

    /// Run until a shutdown command arrives or the queue closes
    pub async fn run(mut self) -> RelayStats {
        tracing::info!(channel = %self.entry.channel, "Relay started");

        while let Some(command) = self.rx.recv().await {
            match command {
                RelayCommand::Frames(unit) => self.relay(unit).await,
                RelayCommand::Shutdown => break,
            }
        }

        tracing::info!(
            channel = %self.entry.channel,
            units = self.stats.units_relayed,
            pruned = self.stats.players_pruned,
            "Relay stopped"
        );

        self.stats
    }

    async fn relay(&mut self, unit: Bytes) {
        self.stats.units_relayed += 1;

        let entry = Arc::clone(&self.entry);
        let mut failed = Vec::new();

        {
            let players = entry.players().await;

            for (addr, player) in players.iter() {
                if self.cache.is_enabled() && !self.backlog_sent {
                    self.backlog_sent = true;
                    if let Err(e) = self.send_backlog(player).await {
                        tracing::warn!(peer = %addr, error = %e, "Backlog write failed, dropping player");
                        failed.push(addr.clone());
                        continue;
                    }
                }

                if let Err(e) = player.send(&unit).await {
                    tracing::warn!(peer = %addr, error = %e, "Frame write failed, dropping player");
                    failed.push(addr.clone());
                }
            }
        }

        // The unit being relayed is written right after the backlog, so it
        // joins the cache only once the fan-out is done
        self.cache.push(unit);

        if !failed.is_empty() {
            let removed = entry.remove_players(&failed).await;
            self.stats.players_pruned += removed as u64;
        }
    }

    async fn send_backlog(&self, player: &Player) -> std::io::Result<()> {
        for unit in self.cache.iter() {
            player.send(unit).await?;
        }
        Ok(())
    }
}
