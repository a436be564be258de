// Copyright 2026 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node-map store implementations.

pub mod hashed;
pub mod plain;

pub use hashed::{HashedStore, Summary};
pub use plain::PlainStore;
