// Copyright 2026 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deterministic 64-bit id generation for internal branch keys.
//!
//! Branch ids are observable through depth queries and travel through the
//! replication map, so every replica must draw the same ids for the same
//! operation sequence. The generator is therefore a pure step function over
//! an explicit two-word state ([`GenState`]), persisted as the tree's
//! `ticket` entry rather than hidden inside a global RNG.

use serde::{Deserialize, Serialize};

/// State vector of the id generator: two 64-bit words.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GenState(pub u64, pub u64);

impl GenState {
    /// Derive an initial state from a configured seed via splitmix64.
    ///
    /// The all-zero state is a fixed point of xorshift and is remapped.
    pub fn seeded(seed: i64) -> Self {
        let mut x = seed as u64;
        let a = splitmix64(&mut x);
        let b = splitmix64(&mut x);
        if a == 0 && b == 0 {
            Self(0x9e37_79b9_7f4a_7c15, 0x2545_f491_4f6c_dd1d)
        } else {
            Self(a, b)
        }
    }
}

/// Draw the next id: one xorshift128+ step, returning the advanced state.
pub fn next(state: GenState) -> (u64, GenState) {
    let GenState(s0, s1) = state;
    let mut x = s0;
    let y = s1;
    x ^= x << 23;
    x ^= x >> 17;
    x ^= y ^ (y >> 26);
    (x.wrapping_add(y), GenState(y, x))
}

fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
