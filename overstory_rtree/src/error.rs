// Copyright 2026 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Engine error types.

use thiserror::Error;

use crate::node::NodeKey;

/// Errors surfaced by tree mutations.
///
/// Every failing call leaves the tree exactly as it was. Deleting or
/// updating an absent key is not an error.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TreeError {
    /// Insert of a key that is already present.
    #[error("key already present: {0:?}")]
    DuplicateKey(NodeKey),
    /// A box whose dimensionality differs from the tree's established one.
    #[error("expected {expected} dimensions, got {got}")]
    DimensionMismatch {
        /// Dimensionality established at first insert.
        expected: usize,
        /// Dimensionality of the offending box.
        got: usize,
    },
}
