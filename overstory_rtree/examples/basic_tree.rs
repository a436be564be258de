// Copyright 2026 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Basic usage of the Overstory R-tree: insert, query, update, delete.

use overstory_rtree::{Bounds, NodeKey, Tree, TreeError};

fn main() -> Result<(), TreeError> {
    let mut tree = Tree::default();
    tree.insert(NodeKey::from(1), Bounds::from_pairs(&[(0, 10), (0, 10)]))?;
    tree.insert(NodeKey::from(2), Bounds::from_pairs(&[(20, 30), (0, 10)]))?;
    tree.insert(NodeKey::from("label"), Bounds::from_pairs(&[(5, 15), (5, 15)]))?;

    let hits = tree.query(&Bounds::from_pairs(&[(4, 24), (4, 6)]));
    println!("hits in [(4,24),(4,6)]: {hits:?}");

    // Move box 1 and look again.
    tree.update(&NodeKey::Int(1), Bounds::from_pairs(&[(100, 110), (0, 10)]))?;
    let hits = tree.query(&Bounds::from_pairs(&[(4, 24), (4, 6)]));
    println!("after the move: {hits:?}");

    tree.delete(&NodeKey::Int(2))?;
    println!("leaves: {}, root box: {:?}", tree.len(), tree.bounds());
    Ok(())
}
