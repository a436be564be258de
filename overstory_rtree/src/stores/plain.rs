// Copyright 2026 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Plain node-map store: an ordered mapping with the two reserved entries.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::idgen::GenState;
use crate::node::{MapEntry, MapKey, NodeKey, NodeRecord};
use crate::store::NodeStore;

/// Plain mapping from key to node record.
#[derive(Clone, Default)]
pub struct PlainStore {
    nodes: BTreeMap<NodeKey, NodeRecord>,
    root: Option<NodeKey>,
    ticket: GenState,
}

impl core::fmt::Debug for PlainStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PlainStore")
            .field("nodes", &self.nodes.len())
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl NodeStore for PlainStore {
    fn get(&self, key: &NodeKey) -> Option<&NodeRecord> {
        self.nodes.get(key)
    }

    fn put(&mut self, key: NodeKey, record: NodeRecord) {
        self.nodes.insert(key, record);
    }

    fn delete(&mut self, key: &NodeKey) -> Option<NodeRecord> {
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
        self.root = Some(key);
    }

    fn ticket(&self) -> GenState {
        self.ticket
    }

    fn set_ticket(&mut self, state: GenState) {
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
    fn put_get_delete() {
        let mut store = PlainStore::default();
        let key = NodeKey::Int(1);
        store.put(key.clone(), leaf(NodeKey::Branch(9), &[(0, 1), (0, 1)]));
        assert!(store.has(&key));
        assert_eq!(store.len(), 1);
        assert!(store.delete(&key).is_some());
        assert!(store.delete(&key).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn entries_lead_with_reserved_keys() {
        let mut store = PlainStore::default();
        store.set_root(NodeKey::Branch(3));
        store.put(NodeKey::Int(1), leaf(NodeKey::Branch(3), &[(0, 1), (0, 1)]));
        let entries = store.entries();
        assert_eq!(entries[0].0, MapKey::Root);
        assert_eq!(entries[1].0, MapKey::Ticket);
        assert_eq!(entries[2].0, MapKey::Node(NodeKey::Int(1)));
    }

    #[test]
    fn apply_replays_the_flat_form() {
        let mut source = PlainStore::default();
        source.set_root(NodeKey::Branch(4));
        source.set_ticket(GenState(5, 6));
        source.put(NodeKey::Int(2), leaf(NodeKey::Branch(4), &[(1, 2), (1, 2)]));

        let mut sink = PlainStore::default();
        for (key, entry) in source.entries() {
            sink.apply(key, Some(entry));
        }
        assert_eq!(sink.entries(), source.entries());

        sink.apply(MapKey::Node(NodeKey::Int(2)), None);
        assert!(!sink.has(&NodeKey::Int(2)));
        // Reserved entries ignore removal.
        sink.apply(MapKey::Root, None);
        assert_eq!(sink.root(), Some(&NodeKey::Branch(4)));
    }
}
