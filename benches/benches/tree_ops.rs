// Copyright 2026 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use overstory_rtree::{Bounds, NodeKey, Tree, TreeOptions};

#[derive(Clone)]
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    fn next_range(&mut self, span: i64) -> i64 {
        (self.next_u64() % span as u64) as i64
    }
}

fn gen_boxes(n: usize, world: i64, extent: i64, seed: u64) -> Vec<(NodeKey, Bounds)> {
    let mut rng = Rng::new(seed);
    (0..n)
        .map(|i| {
            let x = rng.next_range(world);
            let y = rng.next_range(world);
            let w = 1 + rng.next_range(extent);
            let h = 1 + rng.next_range(extent);
            (
                NodeKey::Int(i as i64),
                Bounds::from_pairs(&[(x, x + w), (y, y + h)]),
            )
        })
        .collect()
}

fn build_tree(entries: &[(NodeKey, Bounds)]) -> Tree {
    let mut tree = Tree::new(&TreeOptions {
        seed: 1,
        ..TreeOptions::default()
    });
    tree.insert_many(entries.to_vec()).expect("bench data has unique keys");
    tree
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");
    for &n in &[1_000usize, 10_000] {
        let entries = gen_boxes(n, 10_000, 50, 0x5eed);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_function(format!("sequential_{n}"), |b| {
            b.iter_batched(
                || entries.clone(),
                |entries| {
                    let mut tree = Tree::new(&TreeOptions {
                        seed: 1,
                        ..TreeOptions::default()
                    });
                    for (key, bounds) in entries {
                        tree.insert(key, bounds).unwrap();
                    }
                    tree
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("query");
    for &n in &[1_000usize, 10_000] {
        let entries = gen_boxes(n, 10_000, 50, 0x5eed);
        let tree = build_tree(&entries);
        let mut rng = Rng::new(0xfeed);
        let probes: Vec<Bounds> = (0..256)
            .map(|_| {
                let x = rng.next_range(10_000);
                let y = rng.next_range(10_000);
                Bounds::from_pairs(&[(x, x + 200), (y, y + 200)])
            })
            .collect();
        group.throughput(Throughput::Elements(probes.len() as u64));
        group.bench_function(format!("window_{n}"), |b| {
            let mut at = 0;
            b.iter(|| {
                let probe = &probes[at % probes.len()];
                at += 1;
                black_box(tree.query(probe))
            });
        });
    }
    group.finish();
}

fn bench_update(c: &mut Criterion) {
    let entries = gen_boxes(10_000, 10_000, 50, 0x5eed);
    let mut group = c.benchmark_group("update");
    group.bench_function("move_within_world", |b| {
        b.iter_batched(
            || (build_tree(&entries), Rng::new(0xabcd)),
            |(mut tree, mut rng)| {
                for _ in 0..100 {
                    let id = rng.next_range(10_000);
                    let x = rng.next_range(10_000);
                    let y = rng.next_range(10_000);
                    tree.update(
                        &NodeKey::Int(id),
                        Bounds::from_pairs(&[(x, x + 40), (y, y + 40)]),
                    )
                    .unwrap();
                }
                tree
            },
            BatchSize::SmallInput,
        );
    });
    group.finish();
}

criterion_group!(benches, bench_insert, bench_query, bench_update);
criterion_main!(benches);
