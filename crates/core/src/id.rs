// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Record identifier generation

use crate::helm::HelmValuesId;
use crate::version::VersionId;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Generates identifiers for newly initiated versions and their Helm snapshots
pub trait IdGen: Clone + Send + Sync + 'static {
    /// A fresh opaque identifier
    fn next_raw(&self) -> String;

    fn version_id(&self) -> VersionId {
        VersionId::new(self.next_raw())
    }

    fn helm_values_id(&self) -> HelmValuesId {
        HelmValuesId::new(self.next_raw())
    }
}

/// UUIDv4 identifiers for production use
#[derive(Clone, Copy, Debug, Default)]
pub struct UuidIdGen;

impl IdGen for UuidIdGen {
    fn next_raw(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Predictable `prefix-N` identifiers for tests; clones share the counter
#[derive(Clone, Debug)]
pub struct SequentialIdGen {
    prefix: String,
    counter: Arc<AtomicU64>,
}

impl SequentialIdGen {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl Default for SequentialIdGen {
    fn default() -> Self {
        Self::new("id")
    }
}

impl IdGen for SequentialIdGen {
    fn next_raw(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        format!("{}-{}", self.prefix, n)
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
