// Copyright 2026 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Wire deltas and the delta-map collaborator seam.
//!
//! The replication map itself (anti-entropy, gossip, conflict resolution
//! beyond per-key last-writer-wins) is an external collaborator. This
//! module pins down only what the bridge needs from it: accept deltas,
//! hand back a bootstrap snapshot, and track the neighbor list.

use overstory_rtree::{MapEntry, MapKey};
use serde::{Deserialize, Serialize};

/// Name of a peer node.
pub type PeerId = String;

/// One replicated change to the flat node map.
///
/// Keys and entries serialize losslessly; `children` order inside a branch
/// entry is part of the wire form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Delta {
    /// Insert or replace one entry.
    Add(MapKey, MapEntry),
    /// Remove one entry.
    Remove(MapKey),
}

impl Delta {
    /// The map key this delta touches.
    pub fn key(&self) -> &MapKey {
        match self {
            Self::Add(key, _) | Self::Remove(key) => key,
        }
    }
}

/// What the dispatcher requires from a delta-CRDT map implementation.
pub trait DeltaMap {
    /// Hand one local delta to the map for application and propagation.
    fn submit(&mut self, delta: Delta);

    /// The map's current contents, used once at join time to reconstruct
    /// the local tree.
    fn entries(&self) -> Vec<(MapKey, MapEntry)>;

    /// Replace the set of peers the map exchanges deltas with.
    fn set_neighbors(&mut self, peers: &[PeerId]);
}
