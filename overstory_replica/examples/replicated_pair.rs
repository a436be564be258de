// Copyright 2026 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Two replicas on one machine: a writer mirrors every mutation into its
//! delta map, a follower absorbs the drained batches and converges.

use overstory_replica::{DispatchError, Dispatcher};
use overstory_rtree::{Bounds, Mode, NodeKey, TreeOptions};

fn main() -> Result<(), DispatchError> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let options = TreeOptions {
        mode: Mode::Distributed,
        verbose: true,
        seed: 11,
        ..TreeOptions::default()
    };

    let mut writer = Dispatcher::new();
    writer.open(&options)?;
    writer.set_members(vec!["follower@local".into()]);

    let mut follower = Dispatcher::new();
    follower.open(&options)?;

    for id in 0..12 {
        writer.insert(
            NodeKey::Int(id),
            Bounds::from_pairs(&[(id * 5, id * 5 + 3), (0, 3)]),
        )?;
    }
    writer.delete(&NodeKey::Int(4))?;
    writer.update(&NodeKey::Int(0), Bounds::from_pairs(&[(100, 103), (0, 3)]))?;

    let batch = writer.map_mut().drain_outbox();
    println!("ferrying {} deltas", batch.len());
    follower.absorb(batch)?;

    let probe = Bounds::from_pairs(&[(-10, 200), (-10, 10)]);
    let mut ours = writer.query(&probe)?;
    let mut theirs = follower.query(&probe)?;
    ours.sort();
    theirs.sort();
    println!("writer sees   {ours:?}");
    println!("follower sees {theirs:?}");
    assert_eq!(ours, theirs);
    assert_eq!(writer.snapshot()?, follower.snapshot()?);
    println!("replicas converged");
    Ok(())
}
