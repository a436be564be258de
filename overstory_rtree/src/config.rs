// Copyright 2026 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree configuration and the metadata carried alongside a tree.

use serde::{Deserialize, Serialize};

use crate::idgen::GenState;

/// Default maximum number of children per branch.
pub const DEFAULT_WIDTH: usize = 6;

/// Which node-map store backs the tree.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreKind {
    /// Plain mapping.
    #[default]
    Plain,
    /// Mapping with per-key hash summaries for diffing.
    HashSummarized,
}

/// Whether the tree mirrors its node map into a replication map.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    /// Single-process index; no mirroring.
    #[default]
    Standalone,
    /// Replicated index; forces [`StoreKind::HashSummarized`].
    Distributed,
}

/// Configuration recognized by [`TreeOptions::from_pairs`] and consumed at
/// construction. Invalid values are silently replaced by defaults rather
/// than surfaced.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeOptions {
    /// Maximum children per branch before a split.
    pub width: usize,
    /// Node-map backend.
    pub store: StoreKind,
    /// Standalone or distributed operation.
    pub mode: Mode,
    /// Raise per-operation diagnostics to info level.
    pub verbose: bool,
    /// Id-generator seed.
    pub seed: i64,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            store: StoreKind::default(),
            mode: Mode::default(),
            verbose: false,
            seed: 0,
        }
    }
}

impl TreeOptions {
    /// Parse loosely-typed `(key, value)` option pairs.
    ///
    /// Unknown keys and unparsable values are dropped in favor of the
    /// defaults; nothing is reported back.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut options = Self::default();
        for (key, value) in pairs {
            match key {
                "width" => {
                    if let Ok(width) = value.parse::<usize>() {
                        options.width = width;
                    }
                }
                "type" => match value {
                    "plain" | "Plain" => options.store = StoreKind::Plain,
                    "hash_summarized" | "HashSummarized" => {
                        options.store = StoreKind::HashSummarized;
                    }
                    _ => {}
                },
                "mode" => match value {
                    "standalone" | "Standalone" => options.mode = Mode::Standalone,
                    "distributed" | "Distributed" => options.mode = Mode::Distributed,
                    _ => {}
                },
                "verbose" => {
                    if let Ok(verbose) = value.parse::<bool>() {
                        options.verbose = verbose;
                    }
                }
                "seed" => {
                    if let Ok(seed) = value.parse::<i64>() {
                        options.seed = seed;
                    }
                }
                _ => {}
            }
        }
        options.normalize()
    }

    /// Replace invalid values with defaults and reconcile dependent options.
    ///
    /// A width below 2 cannot host a split pair and falls back to
    /// [`DEFAULT_WIDTH`]; distributed mode requires the hash-summarized
    /// store.
    pub fn normalize(mut self) -> Self {
        if self.width < 2 {
            self.width = DEFAULT_WIDTH;
        }
        if self.mode == Mode::Distributed {
            self.store = StoreKind::HashSummarized;
        }
        self
    }
}

/// Configuration plus the live id-generator state, carried alongside the
/// tree itself.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Maximum children per branch.
    pub width: usize,
    /// Node-map backend in use.
    pub store: StoreKind,
    /// Standalone or distributed operation.
    pub mode: Mode,
    /// Diagnostics verbosity.
    pub verbose: bool,
    /// Seed the generator started from.
    pub seed: i64,
    /// Generator state after the most recent draw.
    pub ticket: GenState,
}

impl Metadata {
    /// Metadata for freshly normalized options and the tree's ticket.
    pub fn new(options: &TreeOptions, ticket: GenState) -> Self {
        Self {
            width: options.width,
            store: options.store,
            mode: options.mode,
            verbose: options.verbose,
            seed: options.seed,
            ticket,
        }
    }
}
