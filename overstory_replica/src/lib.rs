// Copyright 2026 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Overstory Replica: delta-map replication for the Overstory R-tree.
//!
//! This crate turns the engine's flat node map into an eventually
//! consistent replica:
//!
//! - [`Delta`] is the wire unit: add or remove one map entry.
//! - [`DeltaMap`] is the collaborator seam for the external delta-CRDT map;
//!   [`MemoryMap`] is the in-process implementation used by tests, examples,
//!   and single-machine deployments.
//! - [`bridge`] converts mutations into deltas (summary diff → add/remove)
//!   and folds inbound batches back into a node map, without re-running any
//!   tree algorithm.
//! - [`Dispatcher`] is the single writer owning the tree, its metadata, the
//!   delta-map handle, and the peer list. Ownership is the concurrency
//!   model: one `&mut Dispatcher` at a time means one operation at a time.
//!
//! The tree is authoritative on the writer. A follower that has absorbed a
//! partial batch may transiently violate the structural invariants; they
//! hold again once the batch stream converges.
//!
//! # Example
//!
//! ```
//! use overstory_replica::Dispatcher;
//! use overstory_rtree::{Bounds, Mode, NodeKey, TreeOptions};
//!
//! let options = TreeOptions { mode: Mode::Distributed, ..TreeOptions::default() };
//!
//! let mut writer = Dispatcher::new();
//! writer.open(&options)?;
//! writer.insert(NodeKey::from(1), Bounds::from_pairs(&[(0, 10), (0, 10)]))?;
//!
//! // Ferry the queued deltas to a peer.
//! let mut follower = Dispatcher::new();
//! follower.open(&options)?;
//! let batch = writer.map_mut().drain_outbox();
//! follower.absorb(batch)?;
//!
//! assert_eq!(follower.snapshot()?, writer.snapshot()?);
//! # Ok::<(), overstory_replica::DispatchError>(())
//! ```

pub mod bridge;
pub mod delta;
pub mod dispatch;
pub mod memory;

pub use delta::{Delta, DeltaMap, PeerId};
pub use dispatch::{DispatchError, Dispatcher};
pub use memory::MemoryMap;
