// Copyright 2026 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-process delta map with last-writer-wins entries and an outbox.
//!
//! Stands in for the external CRDT in tests, examples, and single-process
//! deployments. Locally submitted deltas are applied and queued in the
//! outbox; a transport (or a test) drains the outbox and feeds the deltas
//! to peers via [`MemoryMap::receive`], which applies without re-queuing.

use std::collections::BTreeMap;

use overstory_rtree::{MapEntry, MapKey};

use crate::delta::{Delta, DeltaMap, PeerId};

/// In-memory last-writer-wins delta map.
#[derive(Clone, Default)]
pub struct MemoryMap {
    entries: BTreeMap<MapKey, MapEntry>,
    neighbors: Vec<PeerId>,
    outbox: Vec<Delta>,
}

impl std::fmt::Debug for MemoryMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryMap")
            .field("entries", &self.entries.len())
            .field("neighbors", &self.neighbors.len())
            .field("outbox", &self.outbox.len())
            .finish_non_exhaustive()
    }
}

impl MemoryMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an inbound delta from a peer, without echoing it back out.
    pub fn receive(&mut self, delta: Delta) {
        self.apply(&delta);
    }

    /// Take every delta queued for propagation.
    pub fn drain_outbox(&mut self) -> Vec<Delta> {
        std::mem::take(&mut self.outbox)
    }

    /// Current neighbor list.
    pub fn neighbors(&self) -> &[PeerId] {
        &self.neighbors
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True iff the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn apply(&mut self, delta: &Delta) {
        match delta {
            Delta::Add(key, entry) => {
                self.entries.insert(key.clone(), entry.clone());
            }
            Delta::Remove(key) => {
                self.entries.remove(key);
            }
        }
    }
}

impl DeltaMap for MemoryMap {
    fn submit(&mut self, delta: Delta) {
        self.apply(&delta);
        self.outbox.push(delta);
    }

    fn entries(&self) -> Vec<(MapKey, MapEntry)> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn set_neighbors(&mut self, peers: &[PeerId]) {
        self.neighbors = peers.to_vec();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use overstory_rtree::NodeKey;

    fn add(id: i64) -> Delta {
        Delta::Add(
            MapKey::Node(NodeKey::Int(id)),
            MapEntry::Root(NodeKey::Branch(id as u64)),
        )
    }

    #[test]
    fn submit_applies_and_queues() {
        let mut map = MemoryMap::new();
        map.submit(add(1));
        map.submit(add(2));
        assert_eq!(map.len(), 2);
        assert_eq!(map.drain_outbox().len(), 2);
        assert!(map.drain_outbox().is_empty());
    }

    #[test]
    fn receive_does_not_echo() {
        let mut map = MemoryMap::new();
        map.receive(add(1));
        assert_eq!(map.len(), 1);
        assert!(map.drain_outbox().is_empty());
    }

    #[test]
    fn last_writer_wins_per_key() {
        let mut map = MemoryMap::new();
        map.submit(add(1));
        map.submit(Delta::Add(
            MapKey::Node(NodeKey::Int(1)),
            MapEntry::Root(NodeKey::Branch(99)),
        ));
        assert_eq!(map.len(), 1);
        let entries = map.entries();
        assert_eq!(entries[0].1, MapEntry::Root(NodeKey::Branch(99)));
        map.submit(Delta::Remove(MapKey::Node(NodeKey::Int(1))));
        assert!(map.is_empty());
    }
}
