// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! gantry-storage: persistence for versions and their sub-records

mod memory;
mod sqlite;
mod store;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use store::{CasOutcome, NewVersion, RecordKind, StatusRecord, StoreError, VersionStore};

#[cfg(test)]
#[path = "fixtures.rs"]
mod fixtures;
