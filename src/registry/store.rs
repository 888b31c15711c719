//! Channel registry implementation
//!
//! Maps channel names to the single pusher currently publishing there.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::entry::ChannelEntry;
use super::error::RegistryError;
use super::player::Player;

/// Central registry for all announced channels
///
/// Thread-safe via `RwLock`. DESCRIBE/PLAY lookups are the common case and
/// proceed concurrently; registration and removal are exclusive.
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    /// Map of channel name to its pusher
    channels: RwLock<HashMap<String, Arc<ChannelEntry>>>,
}

impl ChannelRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pusher for its channel
    ///
    /// The occupancy check and the insert happen under one write lock, so
    /// two concurrent ANNOUNCEs for the same name cannot both succeed.
    pub async fn register(&self, entry: Arc<ChannelEntry>) -> Result<(), RegistryError> {
        let mut channels = self.channels.write().await;

        if channels.contains_key(&entry.channel) {
            return Err(RegistryError::ChannelOccupied(entry.channel.clone()));
        }

        tracing::info!(
            channel = %entry.channel,
            session = %entry.session_id,
            peer = %entry.peer_addr,
            "Pusher registered"
        );
        channels.insert(entry.channel.clone(), entry);

        Ok(())
    }

    /// Remove a pusher's registration
    ///
    /// Only the session that registered the channel can remove it.
    pub async fn unregister(&self, channel: &str, session_id: &str) -> bool {
        let mut channels = self.channels.write().await;

        match channels.get(channel) {
            Some(entry) if entry.session_id == session_id => {
                tracing::info!(
                    channel = %channel,
                    session = %session_id,
                    published_secs = entry.created_at.elapsed().as_secs(),
                    "Pusher unregistered"
                );
                channels.remove(channel);
                true
            }
            Some(entry) => {
                tracing::warn!(
                    channel = %channel,
                    expected = %entry.session_id,
                    actual = %session_id,
                    "Pusher unregister mismatch"
                );
                false
            }
            None => false,
        }
    }

    /// Look up the pusher for a channel
    pub async fn get(&self, channel: &str) -> Option<Arc<ChannelEntry>> {
        self.channels.read().await.get(channel).cloned()
    }

    /// Check if a channel has a pusher
    pub async fn contains(&self, channel: &str) -> bool {
        self.channels.read().await.contains_key(channel)
    }

    /// Attach a player to a channel's pusher
    ///
    /// The registry read lock is held while the player set is updated, so
    /// the pusher cannot be deregistered halfway through.
    pub async fn attach_player(&self, channel: &str, player: Player) -> Result<(), RegistryError> {
        let channels = self.channels.read().await;

        let entry = channels
            .get(channel)
            .ok_or_else(|| RegistryError::ChannelNotFound(channel.to_string()))?;

        tracing::info!(channel = %channel, peer = %player.addr, "Player attached");
        entry.add_player(player).await;

        Ok(())
    }

    /// Detach a player from every pusher it is attached to
    ///
    /// Returns the number of player sets it was removed from.
    pub async fn detach_player(&self, addr: &str) -> usize {
        let channels = self.channels.read().await;
        let mut removed = 0;

        for entry in channels.values() {
            if entry.remove_player(addr).await {
                tracing::info!(channel = %entry.channel, peer = %addr, "Player detached");
                removed += 1;
            }
        }

        removed
    }

    /// Get the number of registered channels
    pub async fn channel_count(&self) -> usize {
        self.channels.read().await.len()
    }

    /// Get the number of players attached to a channel
    pub async fn player_count(&self, channel: &str) -> Option<usize> {
        let entry = self.get(channel).await?;
        Some(entry.player_count().await)
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::session::PeerWriter;

    fn entry(channel: &str, session_id: &str) -> Arc<ChannelEntry> {
        let (entry, _rx) = ChannelEntry::new(channel, session_id, "10.0.0.1:1000", Bytes::new(), 8);
        Arc::new(entry)
    }

    fn player(addr: &str) -> Player {
        let (local, _remote) = tokio::io::duplex(64);
        Player::new("player", addr, PeerWriter::new(local))
    }

    #[tokio::test]
    async fn test_register_pusher() {
        let registry = ChannelRegistry::new();

        registry.register(entry("cam1", "first")).await.unwrap();
        assert!(registry.contains("cam1").await);

        // Can't register another pusher
        let result = registry.register(entry("cam1", "second")).await;
        assert_eq!(result, Err(RegistryError::ChannelOccupied("cam1".into())));

        // The first pusher is still the owner
        assert_eq!(registry.get("cam1").await.unwrap().session_id, "first");
        assert_eq!(registry.channel_count().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_register_single_winner() {
        let registry = Arc::new(ChannelRegistry::new());

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move { registry.register(entry("cam1", &format!("s{}", i))).await })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                winners += 1;
            }
        }

        assert_eq!(winners, 1);
        assert_eq!(registry.channel_count().await, 1);
    }

    #[tokio::test]
    async fn test_unregister_requires_owner() {
        let registry = ChannelRegistry::new();
        registry.register(entry("cam1", "owner")).await.unwrap();

        assert!(!registry.unregister("cam1", "intruder").await);
        assert!(registry.contains("cam1").await);

        assert!(registry.unregister("cam1", "owner").await);
        assert!(!registry.contains("cam1").await);

        // Name is immediately available again
        registry.register(entry("cam1", "next")).await.unwrap();
    }

    #[tokio::test]
    async fn test_attach_requires_pusher() {
        let registry = ChannelRegistry::new();

        let result = registry.attach_player("cam1", player("10.0.0.2:2000")).await;
        assert_eq!(result, Err(RegistryError::ChannelNotFound("cam1".into())));

        registry.register(entry("cam1", "owner")).await.unwrap();
        registry.attach_player("cam1", player("10.0.0.2:2000")).await.unwrap();
        assert_eq!(registry.player_count("cam1").await, Some(1));
    }

    #[tokio::test]
    async fn test_detach_player_touches_only_its_channel() {
        let registry = ChannelRegistry::new();
        registry.register(entry("cam1", "a")).await.unwrap();
        registry.register(entry("cam2", "b")).await.unwrap();

        registry.attach_player("cam1", player("10.0.0.2:2000")).await.unwrap();
        registry.attach_player("cam2", player("10.0.0.3:3000")).await.unwrap();

        assert_eq!(registry.detach_player("10.0.0.2:2000").await, 1);

        assert_eq!(registry.player_count("cam1").await, Some(0));
        assert_eq!(registry.player_count("cam2").await, Some(1));
    }
}
