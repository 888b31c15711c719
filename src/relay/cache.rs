//! Trailing frame cache for late-joiner support
//!
//! Holds the most recent N relayed units so a player attaching mid-stream
//! can be handed immediate context instead of waiting for the next frames.
//! Pure FIFO: when full, the oldest unit is dropped to make room.

use bytes::Bytes;
use std::collections::VecDeque;

/// Bounded FIFO of recently relayed units
#[derive(Debug)]
pub struct TrailingCache {
    /// Maximum number of units (0 disables caching)
    capacity: usize,
    /// Cached units, oldest first
    units: VecDeque<Bytes>,
}

impl TrailingCache {
    /// Create a cache holding at most `capacity` units
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            units: VecDeque::with_capacity(capacity),
        }
    }

    /// Add a unit, evicting the oldest one if the cache is full
    ///
    /// Does nothing when caching is disabled.
    pub fn push(&mut self, unit: Bytes) {
        if self.capacity == 0 {
            return;
        }

        if self.units.len() == self.capacity {
            self.units.pop_front();
        }
        self.units.push_back(unit);
    }

    /// Iterate cached units, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Bytes> {
        self.units.iter()
    }

    /// Check if caching is enabled
    pub fn is_enabled(&self) -> bool {
        self.capacity > 0
    }

    /// Get the number of cached units
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}
