// Copyright 2026 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node keys, node records, and the flat map form shipped to replicas.

use alloc::string::String;
use alloc::vec::Vec;
use serde::{Deserialize, Serialize};

use crate::geom::Bounds;
use crate::idgen::GenState;

/// Key of a tree node.
///
/// Leaves carry external ids ([`NodeKey::Int`] or [`NodeKey::Name`]);
/// branches carry generated 64-bit ids ([`NodeKey::Branch`]). The derived
/// `Ord` gives every store and serialized form one deterministic iteration
/// order across peers.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeKey {
    /// External numeric leaf id.
    Int(i64),
    /// External string leaf id.
    Name(String),
    /// Internally generated branch id.
    Branch(u64),
}

impl From<i64> for NodeKey {
    fn from(id: i64) -> Self {
        Self::Int(id)
    }
}

impl From<&str> for NodeKey {
    fn from(id: &str) -> Self {
        Self::Name(String::from(id))
    }
}

/// A node record: what the flat map stores per key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeRecord {
    /// External entry with its bounding box.
    Leaf {
        /// Key of the owning branch.
        parent: NodeKey,
        /// The leaf's box.
        bounds: Bounds,
    },
    /// Internal node summarizing its children.
    Branch {
        /// Child keys in insertion order. Order is part of the wire form.
        children: Vec<NodeKey>,
        /// Owning branch, `None` only at the root.
        parent: Option<NodeKey>,
        /// Smallest box containing every child box.
        bounds: Bounds,
    },
}

impl NodeRecord {
    /// The record's box.
    pub fn bounds(&self) -> &Bounds {
        match self {
            Self::Leaf { bounds, .. } | Self::Branch { bounds, .. } => bounds,
        }
    }

    /// The owning branch, `None` only at the root.
    pub fn parent(&self) -> Option<&NodeKey> {
        match self {
            Self::Leaf { parent, .. } => Some(parent),
            Self::Branch { parent, .. } => parent.as_ref(),
        }
    }

    /// True for leaf records.
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf { .. })
    }
}

/// Key of one entry in the flat map form, reserved entries included.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MapKey {
    /// The reserved entry naming the current root branch.
    Root,
    /// The reserved entry carrying the id-generator state.
    Ticket,
    /// An ordinary node entry.
    Node(NodeKey),
}

/// Value of one entry in the flat map form.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MapEntry {
    /// Current root key.
    Root(NodeKey),
    /// Id-generator state after the last draw.
    Ticket(GenState),
    /// A node record.
    Node(NodeRecord),
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn keys_order_deterministically() {
        let mut keys = alloc::vec![
            NodeKey::Branch(2),
            NodeKey::Name("b".to_string()),
            NodeKey::Int(-1),
            NodeKey::Branch(1),
            NodeKey::Int(7),
        ];
        keys.sort();
        assert_eq!(
            keys,
            alloc::vec![
                NodeKey::Int(-1),
                NodeKey::Int(7),
                NodeKey::Name("b".to_string()),
                NodeKey::Branch(1),
                NodeKey::Branch(2),
            ]
        );
    }

    #[test]
    fn records_round_trip_through_json() {
        let record = NodeRecord::Branch {
            children: alloc::vec![NodeKey::Int(1), NodeKey::Name("x".to_string())],
            parent: None,
            bounds: Bounds::from_pairs(&[(0, 4), (-2, 2)]),
        };
        let wire = serde_json::to_string(&record).unwrap();
        let back: NodeRecord = serde_json::from_str(&wire).unwrap();
        assert_eq!(back, record);
    }
}
