// Copyright 2026 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hash-summarized node-map store.
//!
//! Same semantics as [`PlainStore`](crate::stores::PlainStore), but every
//! entry (reserved ones included) keeps a 64-bit digest of its current
//! value. A [`Summary`] is a cheap snapshot of the digest table; diffing a
//! store against a pre-operation summary yields exactly the keys whose
//! records changed, which is what the replication bridge ships.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

use crate::idgen::GenState;
use crate::node::{MapEntry, MapKey, NodeKey, NodeRecord};
use crate::store::NodeStore;

/// Snapshot of the per-key digest table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary(BTreeMap<MapKey, u64>);

/// Node-map store with per-key hash summaries.
#[derive(Clone, Default)]
pub struct HashedStore {
    nodes: BTreeMap<NodeKey, NodeRecord>,
    root: Option<NodeKey>,
    ticket: GenState,
    digests: BTreeMap<MapKey, u64>,
}

impl core::fmt::Debug for HashedStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HashedStore")
            .field("nodes", &self.nodes.len())
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

fn digest(entry: &MapEntry) -> u64 {
    let mut hasher = FxHasher::default();
    entry.hash(&mut hasher);
    hasher.finish()
}

impl HashedStore {
    /// Snapshot the digest table.
    pub fn summary(&self) -> Summary {
        Summary(self.digests.clone())
    }

    /// Keys whose entries differ from the given summary, in key order.
    ///
    /// Covers keys present on either side only.
    pub fn diff(&self, since: &Summary) -> Vec<MapKey> {
        let mut out = Vec::new();
        for (key, value) in &self.digests {
            if since.0.get(key) != Some(value) {
                out.push(key.clone());
            }
        }
        for key in since.0.keys() {
            if !self.digests.contains_key(key) {
                out.push(key.clone());
            }
        }
        out.sort();
        out
    }
}

impl NodeStore for HashedStore {
    fn get(&self, key: &NodeKey) -> Option<&NodeRecord> {
        self.nodes.get(key)
    }

    fn put(&mut self, key: NodeKey, record: NodeRecord) {
        self.digests.insert(
            MapKey::Node(key.clone()),
            digest(&MapEntry::Node(record.clone())),
        );
        self.nodes.insert(key, record);
    }

    fn delete(&mut self, key: &NodeKey) -> Option<NodeRecord> {
        self.digests.remove(&MapKey::Node(key.clone()));
        self.nodes.remove(key)
    }

    fn has(&self, key: &NodeKey) -> bool {
        self.nodes.contains_key(key)
    }

    fn iter(&self) -> Box<dyn Iterator<Item = (&NodeKey, &NodeRecord)> + '_> {
        Box::new(self.nodes.iter())
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }

    fn root(&self) -> Option<&NodeKey> {
        self.root.as_ref()
    }

    fn set_root(&mut self, key: NodeKey) {
        self.digests
            .insert(MapKey::Root, digest(&MapEntry::Root(key.clone())));
        self.root = Some(key);
    }

    fn ticket(&self) -> GenState {
        self.ticket
    }

    fn set_ticket(&mut self, state: GenState) {
        self.digests
            .insert(MapKey::Ticket, digest(&MapEntry::Ticket(state)));
        self.ticket = state;
    }

    fn entries(&self) -> Vec<(MapKey, MapEntry)> {
        let mut out = Vec::with_capacity(self.nodes.len() + 2);
        if let Some(root) = &self.root {
            out.push((MapKey::Root, MapEntry::Root(root.clone())));
        }
        out.push((MapKey::Ticket, MapEntry::Ticket(self.ticket)));
        for (key, record) in &self.nodes {
            out.push((MapKey::Node(key.clone()), MapEntry::Node(record.clone())));
        }
        out
    }

    fn entry(&self, key: &MapKey) -> Option<MapEntry> {
        match key {
            MapKey::Root => self.root.clone().map(MapEntry::Root),
            MapKey::Ticket => Some(MapEntry::Ticket(self.ticket)),
            MapKey::Node(node) => self.nodes.get(node).cloned().map(MapEntry::Node),
        }
    }

    fn apply(&mut self, key: MapKey, entry: Option<MapEntry>) {
        match (key, entry) {
            (MapKey::Node(node), Some(MapEntry::Node(record))) => {
                self.put(node, record);
            }
            (MapKey::Node(node), None) => {
                self.delete(&node);
            }
            (MapKey::Root, Some(MapEntry::Root(root))) => self.set_root(root),
            (MapKey::Ticket, Some(MapEntry::Ticket(state))) => self.set_ticket(state),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Bounds;

    fn leaf(parent: NodeKey, pairs: &[(i64, i64)]) -> NodeRecord {
        NodeRecord::Leaf {
            parent,
            bounds: Bounds::from_pairs(pairs),
        }
    }

    #[test]
    fn diff_is_empty_without_changes() {
        let mut store = HashedStore::default();
        store.set_root(NodeKey::Branch(1));
        store.put(NodeKey::Int(1), leaf(NodeKey::Branch(1), &[(0, 1), (0, 1)]));
        let summary = store.summary();
        assert!(store.diff(&summary).is_empty());
    }

    #[test]
    fn diff_reports_changed_added_and_removed_keys() {
        let mut store = HashedStore::default();
        store.set_root(NodeKey::Branch(1));
        store.put(NodeKey::Int(1), leaf(NodeKey::Branch(1), &[(0, 1), (0, 1)]));
        store.put(NodeKey::Int(2), leaf(NodeKey::Branch(1), &[(2, 3), (2, 3)]));
        let summary = store.summary();

        store.put(NodeKey::Int(1), leaf(NodeKey::Branch(1), &[(5, 6), (5, 6)]));
        store.delete(&NodeKey::Int(2));
        store.put(NodeKey::Int(3), leaf(NodeKey::Branch(1), &[(9, 9), (9, 9)]));
        store.set_ticket(GenState(1, 2));

        let changed = store.diff(&summary);
        assert_eq!(
            changed,
            alloc::vec![
                MapKey::Ticket,
                MapKey::Node(NodeKey::Int(1)),
                MapKey::Node(NodeKey::Int(2)),
                MapKey::Node(NodeKey::Int(3)),
            ]
        );
    }

    #[test]
    fn replay_matches_plain_semantics() {
        let mut store = HashedStore::default();
        store.set_root(NodeKey::Branch(7));
        store.put(NodeKey::Int(4), leaf(NodeKey::Branch(7), &[(0, 2), (0, 2)]));

        let mut sink = HashedStore::default();
        for (key, entry) in store.entries() {
            sink.apply(key, Some(entry));
        }
        assert_eq!(sink.entries(), store.entries());
        assert!(sink.diff(&store.summary()).is_empty());
    }
}
