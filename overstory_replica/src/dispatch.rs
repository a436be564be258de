// Copyright 2026 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Single-writer dispatcher owning one tree and one delta-map handle.
//!
//! ## Overview
//!
//! The dispatcher serializes every mutating and read operation against one
//! engine value, so the engine never observes concurrent access: Rust
//! ownership is the locking discipline. In distributed mode every mutation
//! is followed by a summary diff whose changed entries are submitted to the
//! delta map; inbound batches from peers are folded back in with
//! [`Dispatcher::absorb`].
//!
//! Until [`Dispatcher::open`] runs, every tree operation fails with
//! [`DispatchError::NotInitialized`] and changes nothing.

use overstory_rtree::{
    Bounds, MapEntry, MapKey, Metadata, Mode, NodeKey, StoreKind, SummarizedTree, Summary, Tree,
    TreeError, TreeOptions, UpdateSpec,
};
use thiserror::Error;

use crate::bridge;
use crate::delta::{Delta, DeltaMap, PeerId};
use crate::memory::MemoryMap;

/// Errors surfaced by the dispatcher.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// An operation arrived before [`Dispatcher::open`].
    #[error("dispatcher holds no tree; call open first")]
    NotInitialized,
    /// The engine rejected the operation; the tree is unchanged.
    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// The engine behind the dispatcher: one tree over the configured store.
enum Engine {
    Plain(Tree),
    Summarized(SummarizedTree),
}

impl Engine {
    fn insert(&mut self, key: NodeKey, bounds: Bounds) -> Result<(), TreeError> {
        match self {
            Self::Plain(tree) => tree.insert(key, bounds),
            Self::Summarized(tree) => tree.insert(key, bounds),
        }
    }

    fn insert_many(&mut self, entries: Vec<(NodeKey, Bounds)>) -> Result<(), TreeError> {
        match self {
            Self::Plain(tree) => tree.insert_many(entries),
            Self::Summarized(tree) => tree.insert_many(entries),
        }
    }

    fn upsert(&mut self, key: NodeKey, bounds: Bounds) -> Result<(), TreeError> {
        match self {
            Self::Plain(tree) => tree.upsert(key, bounds),
            Self::Summarized(tree) => tree.upsert(key, bounds),
        }
    }

    fn delete(&mut self, key: &NodeKey) -> Result<(), TreeError> {
        match self {
            Self::Plain(tree) => tree.delete(key),
            Self::Summarized(tree) => tree.delete(key),
        }
    }

    fn delete_many(&mut self, keys: &[NodeKey]) -> Result<(), TreeError> {
        match self {
            Self::Plain(tree) => tree.delete_many(keys),
            Self::Summarized(tree) => tree.delete_many(keys),
        }
    }

    fn update(&mut self, key: &NodeKey, spec: UpdateSpec) -> Result<(), TreeError> {
        match self {
            Self::Plain(tree) => tree.update(key, spec),
            Self::Summarized(tree) => tree.update(key, spec),
        }
    }

    fn update_many(&mut self, entries: Vec<(NodeKey, UpdateSpec)>) -> Result<(), TreeError> {
        match self {
            Self::Plain(tree) => tree.update_many(entries),
            Self::Summarized(tree) => tree.update_many(entries),
        }
    }

    fn clear(&mut self) {
        match self {
            Self::Plain(tree) => tree.clear(),
            Self::Summarized(tree) => tree.clear(),
        }
    }

    fn query(&self, bounds: &Bounds) -> Vec<NodeKey> {
        match self {
            Self::Plain(tree) => tree.query(bounds),
            Self::Summarized(tree) => tree.query(bounds),
        }
    }

    fn query_at_depth(&self, bounds: &Bounds, depth: usize) -> Vec<NodeKey> {
        match self {
            Self::Plain(tree) => tree.query_at_depth(bounds, depth),
            Self::Summarized(tree) => tree.query_at_depth(bounds, depth),
        }
    }

    fn entries(&self) -> Vec<(MapKey, MapEntry)> {
        match self {
            Self::Plain(tree) => tree.entries(),
            Self::Summarized(tree) => tree.entries(),
        }
    }

    fn ticket(&self) -> overstory_rtree::GenState {
        match self {
            Self::Plain(tree) => tree.ticket(),
            Self::Summarized(tree) => tree.ticket(),
        }
    }

    fn leaves(&self) -> usize {
        match self {
            Self::Plain(tree) => tree.len(),
            Self::Summarized(tree) => tree.len(),
        }
    }
}

struct Opened {
    engine: Engine,
    meta: Metadata,
}

/// Single-writer owner of `(tree, metadata, delta map, peers)`.
pub struct Dispatcher<C: DeltaMap = MemoryMap> {
    map: C,
    peers: Vec<PeerId>,
    opened: Option<Opened>,
}

impl Default for Dispatcher<MemoryMap> {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher<MemoryMap> {
    /// Create a dispatcher backed by an in-process delta map.
    pub fn new() -> Self {
        Self::with_map(MemoryMap::new())
    }
}

impl<C: DeltaMap> core::fmt::Debug for Dispatcher<C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("opened", &self.opened.is_some())
            .field("peers", &self.peers.len())
            .finish_non_exhaustive()
    }
}

impl<C: DeltaMap> Dispatcher<C> {
    /// Create a dispatcher with an explicit delta-map handle.
    pub fn with_map(map: C) -> Self {
        Self {
            map,
            peers: Vec::new(),
            opened: None,
        }
    }

    /// Build the tree from normalized options.
    ///
    /// In distributed mode the store is forced to the hash-summarized kind,
    /// and a non-empty delta map is folded in to reconstruct the tree the
    /// cluster already converged on.
    pub fn open(&mut self, options: &TreeOptions) -> Result<(), DispatchError> {
        let options = options.clone().normalize();
        let engine = match options.store {
            StoreKind::Plain => Engine::Plain(Tree::new(&options)),
            StoreKind::HashSummarized => {
                let snapshot = self.map.entries();
                if options.mode == Mode::Distributed && !snapshot.is_empty() {
                    tracing::debug!(entries = snapshot.len(), "rebuilding from the delta map");
                    Engine::Summarized(SummarizedTree::from_entries(&options, snapshot))
                } else {
                    let tree = SummarizedTree::new(&options);
                    if options.mode == Mode::Distributed {
                        // Seed the reserved entries and the empty root so a
                        // joining peer can reconstruct without ever having
                        // seen a mutation.
                        bridge::mirror(&tree, &Summary::default(), &mut self.map);
                    }
                    Engine::Summarized(tree)
                }
            }
        };
        let meta = Metadata::new(&options, engine.ticket());
        self.opened = Some(Opened { engine, meta });
        Ok(())
    }

    /// Insert one leaf.
    pub fn insert(&mut self, key: NodeKey, bounds: Bounds) -> Result<(), DispatchError> {
        self.mutate("insert", |engine| engine.insert(key, bounds))
    }

    /// Insert a batch of leaves; one reply for the whole batch.
    pub fn insert_many(&mut self, entries: Vec<(NodeKey, Bounds)>) -> Result<(), DispatchError> {
        self.mutate("insert_many", |engine| engine.insert_many(entries))
    }

    /// Update the leaf when present, insert it otherwise.
    pub fn upsert(&mut self, key: NodeKey, bounds: Bounds) -> Result<(), DispatchError> {
        self.mutate("upsert", |engine| engine.upsert(key, bounds))
    }

    /// Delete one leaf; absent keys succeed and change nothing.
    pub fn delete(&mut self, key: &NodeKey) -> Result<(), DispatchError> {
        self.mutate("delete", |engine| engine.delete(key))
    }

    /// Delete a batch of leaves.
    pub fn delete_many(&mut self, keys: &[NodeKey]) -> Result<(), DispatchError> {
        self.mutate("delete_many", |engine| engine.delete_many(keys))
    }

    /// Move one leaf; absent keys succeed and change nothing.
    pub fn update(
        &mut self,
        key: &NodeKey,
        spec: impl Into<UpdateSpec>,
    ) -> Result<(), DispatchError> {
        let spec = spec.into();
        self.mutate("update", |engine| engine.update(key, spec))
    }

    /// Move a batch of leaves; one reply for the whole batch.
    pub fn update_many(&mut self, entries: Vec<(NodeKey, UpdateSpec)>) -> Result<(), DispatchError> {
        self.mutate("update_many", |engine| engine.update_many(entries))
    }

    /// Drop every leaf and branch, keeping the root and generator state.
    pub fn clear(&mut self) -> Result<(), DispatchError> {
        self.mutate("clear", |engine| {
            engine.clear();
            Ok(())
        })
    }

    /// Leaf keys overlapping `bounds`.
    pub fn query(&self, bounds: &Bounds) -> Result<Vec<NodeKey>, DispatchError> {
        Ok(self.opened()?.engine.query(bounds))
    }

    /// Node keys at exactly `depth` overlapping `bounds`.
    pub fn query_at_depth(
        &self,
        bounds: &Bounds,
        depth: usize,
    ) -> Result<Vec<NodeKey>, DispatchError> {
        Ok(self.opened()?.engine.query_at_depth(bounds, depth))
    }

    /// The tree's complete flat form.
    pub fn snapshot(&self) -> Result<Vec<(MapKey, MapEntry)>, DispatchError> {
        Ok(self.opened()?.engine.entries())
    }

    /// Configuration plus the live generator state.
    pub fn metadata(&self) -> Result<&Metadata, DispatchError> {
        Ok(&self.opened()?.meta)
    }

    /// Fold a batch of inbound deltas into the node map, in order.
    pub fn absorb<I>(&mut self, batch: I) -> Result<usize, DispatchError>
    where
        I: IntoIterator<Item = Delta>,
    {
        let opened = self.opened.as_mut().ok_or(DispatchError::NotInitialized)?;
        let applied = match &mut opened.engine {
            Engine::Plain(tree) => bridge::absorb(tree, batch),
            Engine::Summarized(tree) => bridge::absorb(tree, batch),
        };
        opened.meta.ticket = opened.engine.ticket();
        tracing::debug!(deltas = applied, "absorbed inbound batch");
        Ok(applied)
    }

    /// Replace the peer list and refresh the map's neighbors.
    pub fn set_members(&mut self, peers: Vec<PeerId>) {
        self.peers = peers;
        self.map.set_neighbors(&self.peers);
        tracing::debug!(peers = self.peers.len(), "membership replaced");
    }

    /// A peer came up.
    pub fn node_up(&mut self, peer: PeerId) {
        if !self.peers.contains(&peer) {
            self.peers.push(peer);
        }
        self.map.set_neighbors(&self.peers);
    }

    /// A peer went down.
    pub fn node_down(&mut self, peer: &PeerId) {
        self.peers.retain(|p| p != peer);
        self.map.set_neighbors(&self.peers);
    }

    /// Current peer list.
    pub fn members(&self) -> &[PeerId] {
        &self.peers
    }

    /// The delta-map handle.
    pub fn map(&self) -> &C {
        &self.map
    }

    /// Mutable access to the delta-map handle (transports drain it).
    pub fn map_mut(&mut self) -> &mut C {
        &mut self.map
    }

    // --- internals ---

    fn opened(&self) -> Result<&Opened, DispatchError> {
        self.opened.as_ref().ok_or(DispatchError::NotInitialized)
    }

    /// Run one mutating engine call; in distributed mode, mirror whatever
    /// changed into the delta map afterwards.
    fn mutate<F>(&mut self, op: &'static str, f: F) -> Result<(), DispatchError>
    where
        F: FnOnce(&mut Engine) -> Result<(), TreeError>,
    {
        let opened = self.opened.as_mut().ok_or(DispatchError::NotInitialized)?;
        let before = match (&opened.engine, opened.meta.mode) {
            (Engine::Summarized(tree), Mode::Distributed) => Some(tree.summary()),
            _ => None,
        };
        f(&mut opened.engine)?;
        let mut shipped = 0;
        if let (Some(before), Engine::Summarized(tree)) = (before, &opened.engine) {
            shipped = bridge::mirror(tree, &before, &mut self.map);
        }
        opened.meta.ticket = opened.engine.ticket();
        if opened.meta.verbose {
            tracing::info!(op, deltas = shipped, leaves = opened.engine.leaves(), "dispatched");
        } else {
            tracing::debug!(op, deltas = shipped, "dispatched");
        }
        Ok(())
    }
}
