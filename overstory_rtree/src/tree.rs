// Copyright 2026 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The R-tree engine over a pluggable node-map store.
//!
//! ## Overview
//!
//! The tree is held entirely in a flat key → record map (plus the reserved
//! root and ticket entries), so a replica can reconstruct it from add/remove
//! deltas without re-running any of the algorithms below. Parent links are
//! logical lookups into the map, not owning references.
//!
//! - Insert descends along the least-enlargement path and grows ancestor
//!   boxes on the way back up; a branch exceeding the configured width is
//!   split with quadratic seed selection, cascading to a fresh root.
//! - Delete removes the leaf, recomputes ancestor boxes, and prunes emptied
//!   non-root branches. Orphan reinsertion is deliberately absent; deleting
//!   an absent key is the identity.
//! - Update rewrites the leaf in place while the parent box still contains
//!   the new box, and falls back to delete + reinsert otherwise.
//! - Queries are stack-based descents that prune non-overlapping subtrees.
//!
//! Branch ids are drawn from the deterministic generator in
//! [`crate::idgen`]; with one seed and one operation sequence, every replica
//! materializes byte-equal trees, internal ids included.

use alloc::collections::BTreeSet;
use alloc::vec::Vec;
use core::cmp::Ordering;

use crate::config::TreeOptions;
use crate::error::TreeError;
use crate::geom::{Bounds, combine_all};
use crate::idgen::{self, GenState};
use crate::node::{MapEntry, MapKey, NodeKey, NodeRecord};
use crate::store::NodeStore;
use crate::stores::{HashedStore, PlainStore, Summary};

/// Argument of [`TreeGeneric::update`]: the new box, optionally paired with
/// the box the caller believes is current. The stored box is authoritative;
/// the `from` half is advisory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UpdateSpec {
    /// Replace the leaf's box.
    To(Bounds),
    /// Replace the leaf's box, caller-supplied old box included.
    Move {
        /// What the caller thinks the leaf's box is.
        from: Bounds,
        /// The new box.
        to: Bounds,
    },
}

impl UpdateSpec {
    fn target(&self) -> &Bounds {
        match self {
            Self::To(to) | Self::Move { to, .. } => to,
        }
    }

    fn into_target(self) -> Bounds {
        match self {
            Self::To(to) | Self::Move { to, .. } => to,
        }
    }
}

impl From<Bounds> for UpdateSpec {
    fn from(to: Bounds) -> Self {
        Self::To(to)
    }
}

impl From<(Bounds, Bounds)> for UpdateSpec {
    fn from((from, to): (Bounds, Bounds)) -> Self {
        Self::Move { from, to }
    }
}

/// Dynamic R-tree parameterized by a node-map store.
pub struct TreeGeneric<S: NodeStore> {
    store: S,
    width: usize,
}

/// R-tree over the plain store.
pub type Tree = TreeGeneric<PlainStore>;

/// R-tree over the hash-summarized store, diffable for replication.
pub type SummarizedTree = TreeGeneric<HashedStore>;

impl<S: NodeStore> core::fmt::Debug for TreeGeneric<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TreeGeneric")
            .field("width", &self.width)
            .field("nodes", &self.store.len())
            .field("leaves", &self.len())
            .finish_non_exhaustive()
    }
}

impl<S: NodeStore> Default for TreeGeneric<S> {
    fn default() -> Self {
        Self::new(&TreeOptions::default())
    }
}

impl TreeGeneric<HashedStore> {
    /// Snapshot the store's digest table for later diffing.
    pub fn summary(&self) -> Summary {
        self.store.summary()
    }
}

impl<S: NodeStore> TreeGeneric<S> {
    /// Create an empty tree: one root branch with no children and the unset
    /// box, plus the seeded ticket (advanced once for the root id).
    pub fn new(options: &TreeOptions) -> Self {
        let options = options.clone().normalize();
        let mut store = S::default();
        let (root_id, state) = idgen::next(GenState::seeded(options.seed));
        let root = NodeKey::Branch(root_id);
        store.put(
            root.clone(),
            NodeRecord::Branch {
                children: Vec::new(),
                parent: None,
                bounds: Bounds::empty(),
            },
        );
        store.set_root(root);
        store.set_ticket(state);
        Self {
            store,
            width: options.width,
        }
    }

    /// Reconstruct a tree by folding a flat map emitted by another replica.
    pub fn from_entries<I>(options: &TreeOptions, entries: I) -> Self
    where
        I: IntoIterator<Item = (MapKey, MapEntry)>,
    {
        let options = options.clone().normalize();
        let mut store = S::default();
        for (key, entry) in entries {
            store.apply(key, Some(entry));
        }
        Self {
            store,
            width: options.width,
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Maximum children per branch.
    pub fn width(&self) -> usize {
        self.width
    }

    /// The id-generator state after the most recent draw.
    pub fn ticket(&self) -> GenState {
        self.store.ticket()
    }

    /// Key of the current root branch.
    pub fn root_key(&self) -> &NodeKey {
        self.store.root().expect("root entry missing")
    }

    /// The root's summary box (unset while the tree is empty).
    pub fn bounds(&self) -> Bounds {
        self.root_record().bounds().clone()
    }

    /// Number of live leaves.
    pub fn len(&self) -> usize {
        self.store.iter().filter(|(_, r)| r.is_leaf()).count()
    }

    /// True iff no leaves are present.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True iff `key` names a live leaf.
    pub fn contains(&self, key: &NodeKey) -> bool {
        self.store.get(key).is_some_and(NodeRecord::is_leaf)
    }

    /// The complete flat form, reserved entries first.
    pub fn entries(&self) -> Vec<(MapKey, MapEntry)> {
        self.store.entries()
    }

    /// Fold one replicated entry into the node map, bypassing the tree
    /// algorithms. The flat form is self-describing; structure is only
    /// guaranteed on the writer and after convergence.
    pub fn apply_entry(&mut self, key: MapKey, entry: Option<MapEntry>) {
        self.store.apply(key, entry);
    }

    /// Insert one leaf.
    ///
    /// Fails with [`TreeError::DuplicateKey`] when the key is already
    /// present and with [`TreeError::DimensionMismatch`] when the box does
    /// not match the tree's established dimensionality; either way the tree
    /// is untouched.
    pub fn insert(&mut self, key: NodeKey, bounds: Bounds) -> Result<(), TreeError> {
        if self.store.has(&key) {
            return Err(TreeError::DuplicateKey(key));
        }
        self.check_dims(&bounds)?;
        self.place_leaf(key, bounds);
        Ok(())
    }

    /// Insert a batch of leaves, equal to sequential single inserts.
    ///
    /// Keys are validated up front (against the store and within the batch)
    /// so a failing call leaves the tree untouched.
    pub fn insert_many(&mut self, entries: Vec<(NodeKey, Bounds)>) -> Result<(), TreeError> {
        let established = self
            .dims()
            .or_else(|| entries.first().map(|(_, b)| b.dims()));
        let mut seen = BTreeSet::new();
        for (key, bounds) in &entries {
            if self.store.has(key) || !seen.insert(key) {
                return Err(TreeError::DuplicateKey(key.clone()));
            }
            if let Some(expected) = established
                && bounds.dims() != expected
            {
                return Err(TreeError::DimensionMismatch {
                    expected,
                    got: bounds.dims(),
                });
            }
        }
        for (key, bounds) in entries {
            self.place_leaf(key, bounds);
        }
        Ok(())
    }

    /// Update the leaf when present, insert it otherwise.
    pub fn upsert(&mut self, key: NodeKey, bounds: Bounds) -> Result<(), TreeError> {
        if self.contains(&key) {
            self.update(&key, bounds)
        } else {
            self.insert(key, bounds)
        }
    }

    /// Delete one leaf. Deleting an absent key is the identity and
    /// succeeds.
    pub fn delete(&mut self, key: &NodeKey) -> Result<(), TreeError> {
        let Some(NodeRecord::Leaf { parent, .. }) = self.store.get(key).cloned() else {
            return Ok(());
        };
        self.store.delete(key);
        let (mut children, grandparent, bounds) = self.branch_parts(&parent);
        children.retain(|c| c != key);
        self.store.put(
            parent.clone(),
            NodeRecord::Branch {
                children,
                parent: grandparent,
                bounds,
            },
        );
        self.shrink_upward(parent);
        Ok(())
    }

    /// Delete a batch of leaves; one reply for the whole batch.
    pub fn delete_many(&mut self, keys: &[NodeKey]) -> Result<(), TreeError> {
        for key in keys {
            self.delete(key)?;
        }
        Ok(())
    }

    /// Move one leaf to a new box.
    ///
    /// While the parent's box still contains the new box the leaf is
    /// rewritten in place and ancestor boxes are recomputed (they may
    /// shrink); otherwise the leaf is deleted and reinserted, possibly under
    /// a different parent. Updating an absent key is the identity.
    pub fn update(&mut self, key: &NodeKey, spec: impl Into<UpdateSpec>) -> Result<(), TreeError> {
        let to = spec.into().into_target();
        let Some(NodeRecord::Leaf { parent, .. }) = self.store.get(key).cloned() else {
            return Ok(());
        };
        self.check_dims(&to)?;
        let (_, _, parent_bounds) = self.branch_parts(&parent);
        if parent_bounds.contains(&to) {
            self.store.put(
                key.clone(),
                NodeRecord::Leaf {
                    parent: parent.clone(),
                    bounds: to,
                },
            );
            self.shrink_upward(parent);
        } else {
            self.delete(key)?;
            self.place_leaf(key.clone(), to);
        }
        Ok(())
    }

    /// Update a batch of leaves; one reply for the whole batch. Targets are
    /// validated up front so a failing call leaves the tree untouched.
    pub fn update_many(&mut self, entries: Vec<(NodeKey, UpdateSpec)>) -> Result<(), TreeError> {
        for (key, spec) in &entries {
            if self.contains(key) {
                self.check_dims(spec.target())?;
            }
        }
        for (key, spec) in entries {
            self.update(&key, spec)?;
        }
        Ok(())
    }

    /// Leaf keys whose boxes overlap `bounds`. Result order is unspecified.
    pub fn query(&self, bounds: &Bounds) -> Vec<NodeKey> {
        let mut out = Vec::new();
        let mut stack = alloc::vec![self.root_key().clone()];
        while let Some(key) = stack.pop() {
            let record = self.store.get(&key).expect("dangling node key");
            if !record.bounds().overlaps(bounds) {
                continue;
            }
            match record {
                NodeRecord::Leaf { .. } => out.push(key),
                NodeRecord::Branch { children, .. } => stack.extend(children.iter().cloned()),
            }
        }
        out
    }

    /// Node keys at exactly `depth` (0 = root) whose boxes overlap
    /// `bounds`. A depth below the leaves yields the matching leaves.
    pub fn query_at_depth(&self, bounds: &Bounds, depth: usize) -> Vec<NodeKey> {
        let mut out = Vec::new();
        let mut stack = alloc::vec![(self.root_key().clone(), depth)];
        while let Some((key, remaining)) = stack.pop() {
            let record = self.store.get(&key).expect("dangling node key");
            if !record.bounds().overlaps(bounds) {
                continue;
            }
            if remaining == 0 {
                out.push(key);
                continue;
            }
            match record {
                NodeRecord::Leaf { .. } => out.push(key),
                NodeRecord::Branch { children, .. } => {
                    stack.extend(children.iter().cloned().map(|c| (c, remaining - 1)));
                }
            }
        }
        out
    }

    /// Drop every leaf and branch, keeping the root key, its emptied
    /// record, and the generator state.
    pub fn clear(&mut self) {
        let root = self.root_key().clone();
        let keys: Vec<NodeKey> = self.store.iter().map(|(k, _)| k.clone()).collect();
        for key in keys {
            if key != root {
                self.store.delete(&key);
            }
        }
        self.store.put(
            root,
            NodeRecord::Branch {
                children: Vec::new(),
                parent: None,
                bounds: Bounds::empty(),
            },
        );
    }

    // --- internals ---

    fn root_record(&self) -> &NodeRecord {
        self.store.get(self.root_key()).expect("root branch missing")
    }

    /// Established dimensionality, if any. The root box keeps its span
    /// count even when zeroed out by deletions.
    fn dims(&self) -> Option<usize> {
        match self.root_record().bounds().dims() {
            0 => None,
            d => Some(d),
        }
    }

    fn check_dims(&self, bounds: &Bounds) -> Result<(), TreeError> {
        match self.dims() {
            Some(expected) if bounds.dims() != expected => Err(TreeError::DimensionMismatch {
                expected,
                got: bounds.dims(),
            }),
            _ => Ok(()),
        }
    }

    fn branch_parts(&self, key: &NodeKey) -> (Vec<NodeKey>, Option<NodeKey>, Bounds) {
        let Some(NodeRecord::Branch {
            children,
            parent,
            bounds,
        }) = self.store.get(key)
        else {
            unreachable!("expected a branch record")
        };
        (children.clone(), parent.clone(), bounds.clone())
    }

    fn set_parent(&mut self, key: &NodeKey, new_parent: &NodeKey) {
        let mut record = self.store.get(key).expect("dangling node key").clone();
        match &mut record {
            NodeRecord::Leaf { parent, .. } => *parent = new_parent.clone(),
            NodeRecord::Branch { parent, .. } => *parent = Some(new_parent.clone()),
        }
        self.store.put(key.clone(), record);
    }

    /// Descend to the branch that should adopt a leaf with this box: the
    /// least-enlargement child at every level, ties broken by smaller
    /// volume, then earliest child order.
    fn choose_leaf_parent(&self, bounds: &Bounds) -> NodeKey {
        let mut cur = self.root_key().clone();
        loop {
            let next = {
                let Some(NodeRecord::Branch { children, .. }) = self.store.get(&cur) else {
                    unreachable!("descent visited a non-branch")
                };
                if children.is_empty() {
                    return cur;
                }
                let first = self.store.get(&children[0]).expect("dangling child key");
                if first.is_leaf() {
                    return cur;
                }
                let mut best: Option<(NodeKey, i128, i128)> = None;
                for child in children {
                    let child_bounds = self.store.get(child).expect("dangling child key").bounds();
                    let cost = child_bounds.enlargement(bounds);
                    let volume = child_bounds.volume();
                    let better = match &best {
                        None => true,
                        Some((_, best_cost, best_volume)) => {
                            cost < *best_cost || (cost == *best_cost && volume < *best_volume)
                        }
                    };
                    if better {
                        best = Some((child.clone(), cost, volume));
                    }
                }
                best.expect("branch without children").0
            };
            cur = next;
        }
    }

    /// Attach a leaf under the chosen branch, grow ancestor boxes, and
    /// resolve any overflow. Callers have already validated the key.
    fn place_leaf(&mut self, key: NodeKey, bounds: Bounds) {
        let target = self.choose_leaf_parent(&bounds);
        self.store.put(
            key.clone(),
            NodeRecord::Leaf {
                parent: target.clone(),
                bounds: bounds.clone(),
            },
        );
        let (mut children, parent, branch_bounds) = self.branch_parts(&target);
        children.push(key);
        self.store.put(
            target.clone(),
            NodeRecord::Branch {
                children,
                parent: parent.clone(),
                bounds: branch_bounds.combine(&bounds),
            },
        );
        let mut cur = parent;
        while let Some(ancestor) = cur {
            let (children, parent, ancestor_bounds) = self.branch_parts(&ancestor);
            self.store.put(
                ancestor,
                NodeRecord::Branch {
                    children,
                    parent: parent.clone(),
                    bounds: ancestor_bounds.combine(&bounds),
                },
            );
            cur = parent;
        }
        self.split_overflow(target);
    }

    fn split_overflow(&mut self, start: NodeKey) {
        let mut cur = Some(start);
        while let Some(key) = cur {
            let (children, parent, _) = self.branch_parts(&key);
            if children.len() <= self.width {
                break;
            }
            cur = Some(self.split_branch(&key, parent));
        }
    }

    /// Split an overflowing branch in two. The original key keeps the first
    /// group; the second group moves under a freshly drawn branch id.
    /// Returns the parent that gained a child (the new root when the split
    /// node was the root).
    fn split_branch(&mut self, key: &NodeKey, parent: Option<NodeKey>) -> NodeKey {
        let (children, _, _) = self.branch_parts(key);
        let boxes: Vec<Bounds> = children
            .iter()
            .map(|c| self.store.get(c).expect("dangling child key").bounds().clone())
            .collect();
        let (group_a, group_b) = split_entries(&boxes, self.width);
        let keys_a: Vec<NodeKey> = group_a.iter().map(|&i| children[i].clone()).collect();
        let keys_b: Vec<NodeKey> = group_b.iter().map(|&i| children[i].clone()).collect();
        let bounds_a = combine_all(group_a.iter().map(|&i| &boxes[i]));
        let bounds_b = combine_all(group_b.iter().map(|&i| &boxes[i]));

        let (sibling_id, state) = idgen::next(self.store.ticket());
        self.store.set_ticket(state);
        let sibling = NodeKey::Branch(sibling_id);
        for child in &keys_b {
            self.set_parent(child, &sibling);
        }
        self.store.put(
            key.clone(),
            NodeRecord::Branch {
                children: keys_a,
                parent: parent.clone(),
                bounds: bounds_a.clone(),
            },
        );

        match parent {
            Some(parent_key) => {
                self.store.put(
                    sibling.clone(),
                    NodeRecord::Branch {
                        children: keys_b,
                        parent: Some(parent_key.clone()),
                        bounds: bounds_b,
                    },
                );
                let (mut siblings, grandparent, parent_bounds) = self.branch_parts(&parent_key);
                let at = siblings
                    .iter()
                    .position(|c| c == key)
                    .expect("split node missing from its parent");
                siblings.insert(at + 1, sibling);
                self.store.put(
                    parent_key.clone(),
                    NodeRecord::Branch {
                        children: siblings,
                        parent: grandparent,
                        bounds: parent_bounds,
                    },
                );
                parent_key
            }
            None => {
                let (root_id, state) = idgen::next(self.store.ticket());
                self.store.set_ticket(state);
                let new_root = NodeKey::Branch(root_id);
                self.store.put(
                    sibling.clone(),
                    NodeRecord::Branch {
                        children: keys_b,
                        parent: Some(new_root.clone()),
                        bounds: bounds_b.clone(),
                    },
                );
                self.set_parent(key, &new_root);
                self.store.put(
                    new_root.clone(),
                    NodeRecord::Branch {
                        children: alloc::vec![key.clone(), sibling],
                        parent: None,
                        bounds: bounds_a.combine(&bounds_b),
                    },
                );
                self.store.set_root(new_root.clone());
                new_root
            }
        }
    }

    /// Recompute boxes from `start` to the root, pruning branches that ran
    /// out of children. An emptied root keeps its key and gets the all-zero
    /// box of the established dimensionality.
    fn shrink_upward(&mut self, start: NodeKey) {
        let mut cur = start;
        loop {
            let (children, parent, bounds) = self.branch_parts(&cur);
            if children.is_empty() {
                match parent {
                    Some(parent_key) => {
                        self.store.delete(&cur);
                        let (mut siblings, grandparent, parent_bounds) =
                            self.branch_parts(&parent_key);
                        siblings.retain(|c| *c != cur);
                        self.store.put(
                            parent_key.clone(),
                            NodeRecord::Branch {
                                children: siblings,
                                parent: grandparent,
                                bounds: parent_bounds,
                            },
                        );
                        cur = parent_key;
                        continue;
                    }
                    None => {
                        self.store.put(
                            cur,
                            NodeRecord::Branch {
                                children,
                                parent: None,
                                bounds: Bounds::zeroed(bounds.dims()),
                            },
                        );
                        break;
                    }
                }
            }
            let fresh = combine_all(
                children
                    .iter()
                    .map(|c| self.store.get(c).expect("dangling child key").bounds()),
            );
            self.store.put(
                cur.clone(),
                NodeRecord::Branch {
                    children,
                    parent: parent.clone(),
                    bounds: fresh,
                },
            );
            match parent {
                Some(parent_key) => cur = parent_key,
                None => break,
            }
        }
    }
}

/// Quadratic split of an overflowing branch's child boxes.
///
/// Seeds are the pair wasting the most area when combined; the rest is
/// assigned one at a time, greatest enlargement-difference first, to the
/// cheaper group. Once a group plus everything still unassigned would only
/// just reach the minimum fill `(width + 1) / 2`, the remainder is forced
/// into it. Returns index groups; the first keeps the original branch key.
fn split_entries(boxes: &[Bounds], width: usize) -> (Vec<usize>, Vec<usize>) {
    let min_fill = (width + 1) / 2;

    let mut seeds = (0, 1);
    let mut worst_waste = i128::MIN;
    for i in 0..boxes.len() {
        for j in (i + 1)..boxes.len() {
            let waste = boxes[i].combine(&boxes[j]).volume() - boxes[i].volume() - boxes[j].volume();
            if waste > worst_waste {
                worst_waste = waste;
                seeds = (i, j);
            }
        }
    }

    let mut group_a = alloc::vec![seeds.0];
    let mut group_b = alloc::vec![seeds.1];
    let mut bounds_a = boxes[seeds.0].clone();
    let mut bounds_b = boxes[seeds.1].clone();
    let mut remaining: Vec<usize> = (0..boxes.len())
        .filter(|&i| i != seeds.0 && i != seeds.1)
        .collect();

    while !remaining.is_empty() {
        if group_a.len() + remaining.len() == min_fill {
            for i in remaining.drain(..) {
                bounds_a = bounds_a.combine(&boxes[i]);
                group_a.push(i);
            }
            break;
        }
        if group_b.len() + remaining.len() == min_fill {
            for i in remaining.drain(..) {
                bounds_b = bounds_b.combine(&boxes[i]);
                group_b.push(i);
            }
            break;
        }

        let mut pick = 0;
        let mut best_difference = -1_i128;
        for (slot, &i) in remaining.iter().enumerate() {
            let difference =
                (bounds_a.enlargement(&boxes[i]) - bounds_b.enlargement(&boxes[i])).abs();
            if difference > best_difference {
                best_difference = difference;
                pick = slot;
            }
        }
        let i = remaining.remove(pick);
        let cost_a = bounds_a.enlargement(&boxes[i]);
        let cost_b = bounds_b.enlargement(&boxes[i]);
        let to_a = match cost_a.cmp(&cost_b) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => bounds_a.volume() <= bounds_b.volume(),
        };
        if to_a {
            bounds_a = bounds_a.combine(&boxes[i]);
            group_a.push(i);
        } else {
            bounds_b = bounds_b.combine(&boxes[i]);
            group_b.push(i);
        }
    }
    (group_a, group_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b(pairs: &[(i64, i64)]) -> Bounds {
        Bounds::from_pairs(pairs)
    }

    /// The seven leaves of the width-6 overflow scenario.
    fn seven_leaves() -> Vec<(NodeKey, Bounds)> {
        [
            (0, [(4, 5), (6, 7)]),
            (1, [(-34, -33), (40, 41)]),
            (2, [(-50, -49), (15, 16)]),
            (3, [(33, 34), (-10, -9)]),
            (4, [(35, 36), (-9, -8)]),
            (5, [(0, 1), (-9, -8)]),
            (6, [(9, 10), (9, 10)]),
        ]
        .iter()
        .map(|(id, pairs)| (NodeKey::Int(*id), b(pairs)))
        .collect()
    }

    fn seven_leaf_tree() -> Tree {
        let mut tree = Tree::default();
        tree.insert_many(seven_leaves()).unwrap();
        tree
    }

    fn sorted_ints(keys: Vec<NodeKey>) -> Vec<i64> {
        let mut out: Vec<i64> = keys
            .into_iter()
            .map(|k| match k {
                NodeKey::Int(id) => id,
                other => panic!("expected an Int key, got {other:?}"),
            })
            .collect();
        out.sort_unstable();
        out
    }

    #[test]
    fn single_insert_forms_leaf_under_root() {
        let mut tree = Tree::default();
        let root = tree.root_key().clone();
        tree.insert(NodeKey::from(7), b(&[(1, 2), (3, 4)])).unwrap();
        assert_eq!(
            tree.store().get(&NodeKey::Int(7)),
            Some(&NodeRecord::Leaf {
                parent: root,
                bounds: b(&[(1, 2), (3, 4)]),
            })
        );
        assert_eq!(tree.bounds(), b(&[(1, 2), (3, 4)]));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn duplicate_insert_is_rejected_and_changes_nothing() {
        let mut tree = Tree::default();
        tree.insert(NodeKey::from(7), b(&[(1, 2), (3, 4)])).unwrap();
        let before = tree.entries();
        assert_eq!(
            tree.insert(NodeKey::from(7), b(&[(3, 4), (5, 6)])),
            Err(TreeError::DuplicateKey(NodeKey::Int(7)))
        );
        assert_eq!(tree.entries(), before);
    }

    #[test]
    fn upsert_replaces_the_box() {
        let mut tree = Tree::default();
        tree.insert(NodeKey::from(7), b(&[(1, 2), (3, 4)])).unwrap();
        tree.upsert(NodeKey::from(7), b(&[(3, 4), (5, 6)])).unwrap();
        assert_eq!(
            tree.store().get(&NodeKey::Int(7)).unwrap().bounds(),
            &b(&[(3, 4), (5, 6)])
        );
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.bounds(), b(&[(3, 4), (5, 6)]));
    }

    #[test]
    fn upsert_of_a_fresh_key_inserts() {
        let mut tree = Tree::default();
        tree.upsert(NodeKey::from("a"), b(&[(0, 1), (0, 1)])).unwrap();
        assert!(tree.contains(&NodeKey::from("a")));
    }

    #[test]
    fn upsert_and_update_agree() {
        let mut upserted = Tree::default();
        upserted.insert(NodeKey::from(1), b(&[(0, 2), (0, 2)])).unwrap();
        upserted.upsert(NodeKey::from(1), b(&[(5, 6), (5, 6)])).unwrap();

        let mut updated = Tree::default();
        updated.insert(NodeKey::from(1), b(&[(0, 2), (0, 2)])).unwrap();
        updated.update(&NodeKey::Int(1), b(&[(5, 6), (5, 6)])).unwrap();

        assert_eq!(upserted.entries(), updated.entries());
    }

    #[test]
    fn overflow_splits_the_root_into_two_halves() {
        let tree = seven_leaf_tree();
        let (children, parent, bounds) = tree.branch_parts(tree.root_key());
        assert_eq!(children.len(), 2);
        assert_eq!(parent, None);
        assert_eq!(bounds, b(&[(-50, 36), (-10, 41)]));
        // Both halves are branches pointing back at the new root.
        let root = tree.root_key().clone();
        for child in &children {
            let (_, child_parent, _) = tree.branch_parts(child);
            assert_eq!(child_parent, Some(root.clone()));
        }
    }

    #[test]
    fn query_prunes_by_overlap() {
        let tree = seven_leaf_tree();
        assert_eq!(sorted_ints(tree.query(&b(&[(4, 5), (6, 7)]))), alloc::vec![0]);
        assert_eq!(
            sorted_ints(tree.query(&b(&[(-60, 0), (0, 100)]))),
            alloc::vec![1, 2]
        );
        assert_eq!(
            sorted_ints(tree.query(&b(&[(-100, 100), (-100, 100)]))),
            alloc::vec![0, 1, 2, 3, 4, 5, 6]
        );
        assert!(tree.query(&b(&[(1, 2), (1, 2)])).is_empty());
    }

    #[test]
    fn depth_query_walks_levels() {
        let tree = seven_leaf_tree();
        let everything = b(&[(-100, 100), (-100, 100)]);
        assert_eq!(
            tree.query_at_depth(&everything, 0),
            alloc::vec![tree.root_key().clone()]
        );
        assert!(tree.query_at_depth(&b(&[(200, 201), (200, 201)]), 0).is_empty());

        let level_one = tree.query_at_depth(&everything, 1);
        assert_eq!(level_one.len(), 2);
        assert!(level_one.iter().all(|k| matches!(k, NodeKey::Branch(_))));

        // Far below the leaves: matching leaf ids.
        assert_eq!(
            sorted_ints(tree.query_at_depth(&everything, 99)),
            alloc::vec![0, 1, 2, 3, 4, 5, 6]
        );
    }

    #[test]
    fn deleting_everything_zeroes_the_root_box() {
        let mut tree = seven_leaf_tree();
        let keys: Vec<NodeKey> = (0..7).map(NodeKey::Int).collect();
        tree.delete_many(&keys).unwrap();
        assert!(tree.is_empty());
        let (children, _, bounds) = tree.branch_parts(tree.root_key());
        assert!(children.is_empty());
        assert_eq!(bounds, b(&[(0, 0), (0, 0)]));
        // Pruned branches are gone from the map; only the root remains.
        assert_eq!(tree.store().len(), 1);

        let before = tree.entries();
        tree.delete_many(&keys).unwrap();
        assert_eq!(tree.entries(), before);
    }

    #[test]
    fn delete_of_absent_key_is_identity() {
        let mut tree = seven_leaf_tree();
        let before = tree.entries();
        tree.delete(&NodeKey::Int(99)).unwrap();
        tree.delete(&NodeKey::from("nobody")).unwrap();
        assert_eq!(tree.entries(), before);
    }

    #[test]
    fn update_inside_parent_box_keeps_the_parent() {
        let mut tree = seven_leaf_tree();
        let parent_of = |tree: &Tree, id: i64| match tree.store().get(&NodeKey::Int(id)) {
            Some(NodeRecord::Leaf { parent, .. }) => parent.clone(),
            other => panic!("expected leaf, got {other:?}"),
        };
        let before = parent_of(&tree, 0);
        tree.update(&NodeKey::Int(0), b(&[(13, 14), (6, 7)])).unwrap();
        assert_eq!(parent_of(&tree, 0), before);
    }

    #[test]
    fn update_outside_parent_box_reparents() {
        let mut tree = seven_leaf_tree();
        let parent_of = |tree: &Tree, id: i64| match tree.store().get(&NodeKey::Int(id)) {
            Some(NodeRecord::Leaf { parent, .. }) => parent.clone(),
            other => panic!("expected leaf, got {other:?}"),
        };
        let before = parent_of(&tree, 0);
        tree.update(&NodeKey::Int(0), b(&[(-5, -4), (6, 7)])).unwrap();
        assert_ne!(parent_of(&tree, 0), before);
        assert_eq!(tree.len(), 7);
    }

    #[test]
    fn update_of_absent_key_is_identity() {
        let mut tree = seven_leaf_tree();
        let before = tree.entries();
        tree.update(&NodeKey::Int(42), b(&[(0, 1), (0, 1)])).unwrap();
        assert_eq!(tree.entries(), before);
    }

    #[test]
    fn update_accepts_the_pair_form() {
        let mut tree = Tree::default();
        tree.insert(NodeKey::from(1), b(&[(0, 2), (0, 2)])).unwrap();
        tree.update(
            &NodeKey::Int(1),
            (b(&[(0, 2), (0, 2)]), b(&[(1, 2), (1, 2)])),
        )
        .unwrap();
        assert_eq!(
            tree.store().get(&NodeKey::Int(1)).unwrap().bounds(),
            &b(&[(1, 2), (1, 2)])
        );
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let mut tree = Tree::default();
        tree.insert(NodeKey::from(1), b(&[(0, 1), (0, 1)])).unwrap();
        assert_eq!(
            tree.insert(NodeKey::from(2), b(&[(0, 1)])),
            Err(TreeError::DimensionMismatch {
                expected: 2,
                got: 1
            })
        );
        assert_eq!(
            tree.update(&NodeKey::Int(1), b(&[(0, 1), (0, 1), (0, 1)])),
            Err(TreeError::DimensionMismatch {
                expected: 2,
                got: 3
            })
        );
    }

    #[test]
    fn failed_bulk_insert_changes_nothing() {
        let mut tree = Tree::default();
        tree.insert(NodeKey::from(3), b(&[(0, 1), (0, 1)])).unwrap();
        let before = tree.entries();
        let batch = alloc::vec![
            (NodeKey::from(10), b(&[(0, 1), (0, 1)])),
            (NodeKey::from(3), b(&[(2, 3), (2, 3)])),
        ];
        assert_eq!(
            tree.insert_many(batch),
            Err(TreeError::DuplicateKey(NodeKey::Int(3)))
        );
        assert_eq!(tree.entries(), before);

        let twice = alloc::vec![
            (NodeKey::from(11), b(&[(0, 1), (0, 1)])),
            (NodeKey::from(11), b(&[(2, 3), (2, 3)])),
        ];
        assert_eq!(
            tree.insert_many(twice),
            Err(TreeError::DuplicateKey(NodeKey::Int(11)))
        );
        assert_eq!(tree.entries(), before);
    }

    #[test]
    fn same_seed_and_ops_give_byte_equal_trees() {
        let options = TreeOptions {
            seed: 1234,
            ..TreeOptions::default()
        };
        let build = || {
            let mut tree = Tree::new(&options);
            tree.insert_many(seven_leaves()).unwrap();
            tree.delete(&NodeKey::Int(3)).unwrap();
            tree.update(&NodeKey::Int(0), b(&[(-5, -4), (6, 7)])).unwrap();
            tree
        };
        let a = build();
        let c = build();
        assert_eq!(a.entries(), c.entries());
        assert_eq!(a.ticket(), c.ticket());
    }

    #[test]
    fn clear_resets_to_the_fresh_shape() {
        let mut tree = seven_leaf_tree();
        let root = tree.root_key().clone();
        let ticket = tree.ticket();
        tree.clear();
        assert!(tree.is_empty());
        assert_eq!(tree.store().len(), 1);
        assert_eq!(tree.root_key(), &root);
        assert_eq!(tree.ticket(), ticket);
        assert_eq!(tree.bounds(), Bounds::empty());
    }

    #[test]
    fn split_groups_match_the_reference_partition() {
        let boxes: Vec<Bounds> = seven_leaves().into_iter().map(|(_, b)| b).collect();
        let (group_a, group_b) = split_entries(&boxes, 6);
        assert_eq!(group_a, alloc::vec![1, 2, 6]);
        assert_eq!(group_b, alloc::vec![4, 3, 5, 0]);
    }

    #[test]
    fn split_cascades_above_the_leaf_level() {
        let mut tree = Tree::new(&TreeOptions {
            width: 2,
            ..TreeOptions::default()
        });
        for i in 0..32 {
            let lo = i * 10;
            tree.insert(NodeKey::Int(i), b(&[(lo, lo + 1), (0, 1)])).unwrap();
        }
        assert_eq!(tree.len(), 32);
        let everything = b(&[(-1, 1000), (-1, 2)]);
        assert_eq!(sorted_ints(tree.query(&everything)), (0..32).collect::<Vec<_>>());
        // Every branch respects the width bound and leaves sit at one depth.
        let mut leaf_depths = BTreeSet::new();
        for (key, record) in tree.store().iter() {
            match record {
                NodeRecord::Branch { children, .. } => {
                    assert!(children.len() <= 2, "overflowing branch {key:?}");
                }
                NodeRecord::Leaf { .. } => {
                    let mut depth = 0;
                    let mut cur = key.clone();
                    while let Some(parent) = tree.store().get(&cur).unwrap().parent().cloned() {
                        depth += 1;
                        cur = parent;
                    }
                    leaf_depths.insert(depth);
                }
            }
        }
        assert_eq!(leaf_depths.len(), 1);
    }
}
