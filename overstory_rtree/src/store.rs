// Copyright 2026 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node-map store trait used by the tree engine.
//!
//! The engine never touches a concrete mapping type: it reads and writes
//! node records, the reserved root pointer, and the reserved id-generator
//! ticket through this seam. Swapping the store changes how the map is
//! summarized (see [`crate::stores::HashedStore`]), never what the tree
//! means.

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::idgen::GenState;
use crate::node::{MapEntry, MapKey, NodeKey, NodeRecord};

/// Flat node-map contract: get, put, delete, has, iterate, plus the two
/// reserved entries and the flat form used for replication replay.
pub trait NodeStore: Default {
    /// Look up a node record.
    fn get(&self, key: &NodeKey) -> Option<&NodeRecord>;

    /// Insert or replace a node record.
    fn put(&mut self, key: NodeKey, record: NodeRecord);

    /// Remove a node record, returning it if present.
    fn delete(&mut self, key: &NodeKey) -> Option<NodeRecord>;

    /// True iff the key maps to a record.
    fn has(&self, key: &NodeKey) -> bool;

    /// Iterate all node records in key order.
    fn iter(&self) -> Box<dyn Iterator<Item = (&NodeKey, &NodeRecord)> + '_>;

    /// Number of node records (reserved entries excluded).
    fn len(&self) -> usize;

    /// True iff no node records are present.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Key of the current root branch.
    fn root(&self) -> Option<&NodeKey>;

    /// Point the reserved root entry at `key`.
    fn set_root(&mut self, key: NodeKey);

    /// The id-generator state after the most recent draw.
    fn ticket(&self) -> GenState;

    /// Persist an advanced id-generator state.
    fn set_ticket(&mut self, state: GenState);

    /// The complete flat form, reserved entries first.
    fn entries(&self) -> Vec<(MapKey, MapEntry)>;

    /// One entry of the flat form.
    fn entry(&self, key: &MapKey) -> Option<MapEntry>;

    /// Fold one replicated entry into the map: `Some` adds or replaces,
    /// `None` removes. Reserved entries cannot be removed; a mismatched
    /// key/entry pairing is dropped. No tree algorithms run here; the flat
    /// form is self-describing.
    fn apply(&mut self, key: MapKey, entry: Option<MapEntry>);
}
