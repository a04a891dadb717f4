//! Duplicate suppression for flooded packets.
//!
//! Remembers the identities of the most recent packets this node has handled
//! or sent. Bounded: once `capacity` identities are held, the oldest one is
//! forgotten for each new one.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

use floodmesh_core::PacketId;

/// Bounded FIFO set of packet identities.
#[derive(Debug)]
pub struct DedupCache {
    seen: HashSet<PacketId>,
    order: VecDeque<PacketId>,
    capacity: usize,
}

impl DedupCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            seen: HashSet::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn contains(&self, id: &PacketId) -> bool {
        self.seen.contains(id)
    }

    /// Record `id`. Returns true if it was not already present.
    pub fn insert(&mut self, id: PacketId) -> bool {
        if !self.seen.insert(id) {
            return false;
        }
        self.order.push_back(id);
        while self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.seen.remove(&evicted);
            }
        }
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Shared handle to a `DedupCache`. Every critical section is a single
/// hash-set operation, so a blocking mutex is enough.
#[derive(Debug, Clone)]
pub struct SeenPackets {
    inner: Arc<Mutex<DedupCache>>,
}

impl SeenPackets {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(DedupCache::new(capacity))),
        }
    }

    /// Check-and-insert in one step. True exactly once per identity
    /// (until the identity is evicted).
    pub fn first_sighting(&self, id: PacketId) -> bool {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).insert(id)
    }

    /// Number of identities currently remembered.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
