// Copyright 2026 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Overstory R-tree: a dynamic R-tree over a flat, replicable node map.
//!
//! Overstory R-tree is a reusable spatial index for axis-aligned boxes of
//! any dimensionality.
//!
//! - Insert, upsert, update, and delete boxes keyed by external ids, singly
//!   or in batches.
//! - Query by box overlap, either for matching leaves or for the node keys
//!   at a chosen depth.
//! - Keep the whole tree as a flat key → record map so a map-replication
//!   layer can ship it entry by entry (see the `overstory_replica` crate).
//!
//! The engine is generic over a [`NodeStore`]: the [`PlainStore`] is an
//! ordered mapping, the [`HashedStore`] additionally keeps per-key digests
//! and answers "which entries changed since this summary", the question a
//! replication bridge asks after every mutation. Swapping stores changes
//! only that capability, never tree semantics.
//!
//! Internal branch ids come from a deterministic, explicitly threaded
//! generator ([`idgen`]), so two replicas running the same operations from
//! the same seed materialize byte-equal trees, observable internal ids
//! included.
//!
//! # Example
//!
//! ```
//! use overstory_rtree::{Bounds, NodeKey, Tree};
//!
//! let mut tree = Tree::default();
//! tree.insert(NodeKey::from(1), Bounds::from_pairs(&[(0, 10), (0, 10)]))?;
//! tree.insert(NodeKey::from(2), Bounds::from_pairs(&[(20, 30), (0, 10)]))?;
//!
//! let hits = tree.query(&Bounds::from_pairs(&[(5, 25), (2, 3)]));
//! assert_eq!(hits.len(), 2);
//!
//! tree.delete(&NodeKey::Int(1))?;
//! assert_eq!(tree.len(), 1);
//! # Ok::<(), overstory_rtree::TreeError>(())
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

pub mod config;
pub mod error;
pub mod geom;
pub mod idgen;
pub mod node;
pub mod store;
pub mod stores;
pub mod tree;

pub use config::{DEFAULT_WIDTH, Metadata, Mode, StoreKind, TreeOptions};
pub use error::TreeError;
pub use geom::{Bounds, Span, combine_all};
pub use idgen::GenState;
pub use node::{MapEntry, MapKey, NodeKey, NodeRecord};
pub use store::NodeStore;
pub use stores::{HashedStore, PlainStore, Summary};
pub use tree::{SummarizedTree, Tree, TreeGeneric, UpdateSpec};
