// Copyright 2026 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Conversion between engine mutations and delta-map traffic.
//!
//! Outbound: after a mutating call, diff the hash-summarized store against
//! its pre-operation summary and submit one `Add`/`Remove` per changed key.
//! Inbound: fold a batch of deltas into the node map in order. No tree
//! algorithms run on either path; the flat map form is self-describing.

use overstory_rtree::{NodeStore, Summary, SummarizedTree, TreeGeneric};

use crate::delta::{Delta, DeltaMap};

/// Ship everything that changed since `before` into the delta map.
/// Returns the number of deltas submitted.
pub fn mirror<C: DeltaMap>(tree: &SummarizedTree, before: &Summary, map: &mut C) -> usize {
    let changed = tree.store().diff(before);
    let count = changed.len();
    for key in changed {
        match tree.store().entry(&key) {
            Some(entry) => map.submit(Delta::Add(key, entry)),
            None => map.submit(Delta::Remove(key)),
        }
    }
    count
}

/// Fold an inbound delta batch into the tree's node map, in order.
/// Returns the number of deltas applied.
pub fn absorb<S, I>(tree: &mut TreeGeneric<S>, batch: I) -> usize
where
    S: NodeStore,
    I: IntoIterator<Item = Delta>,
{
    let mut applied = 0;
    for delta in batch {
        match delta {
            Delta::Add(key, entry) => tree.apply_entry(key, Some(entry)),
            Delta::Remove(key) => tree.apply_entry(key, None),
        }
        applied += 1;
    }
    applied
}
