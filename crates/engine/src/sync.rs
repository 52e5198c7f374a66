// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status synchronizer
//!
//! The only writer of version status. Each call reads the current snapshot,
//! merges the update onto it, and writes back conditionally on the revision it
//! read. A lost race re-reads and tries again, up to a fixed number of
//! attempts.

use crate::error::EngineError;
use gantry_core::{Clock, StatusSnapshot, StatusUpdate, VersionId};
use gantry_storage::{CasOutcome, StatusRecord, VersionStore};
use std::sync::Arc;

/// Default number of write attempts per call
pub const DEFAULT_WRITE_ATTEMPTS: u32 = 2;

pub struct StatusSynchronizer<S: ?Sized, K> {
    store: Arc<S>,
    clock: K,
    max_attempts: u32,
}

impl<S: ?Sized, K: Clone> Clone for StatusSynchronizer<S, K> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: self.clock.clone(),
            max_attempts: self.max_attempts,
        }
    }
}

impl<S, K> StatusSynchronizer<S, K>
where
    S: VersionStore + ?Sized,
    K: Clock,
{
    /// `max_attempts` is clamped to at least one
    pub fn new(store: Arc<S>, clock: K, max_attempts: u32) -> Self {
        Self {
            store,
            clock,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Current status fields, name and revision of a version
    pub fn status(&self, version_id: &VersionId) -> Result<StatusRecord, EngineError> {
        Ok(self.store.status(version_id)?)
    }

    /// Apply a sparse update to a version's status
    pub fn update_status(
        &self,
        version_id: &VersionId,
        update: &StatusUpdate,
    ) -> Result<StatusRecord, EngineError> {
        self.update_status_when(version_id, update, |_| Ok(()))
    }

    /// Like [`update_status`](Self::update_status), but only while
    /// `precondition` accepts the snapshot being merged onto. The check runs
    /// again on every attempt, so it is atomic with the write.
    pub fn update_status_when<F>(
        &self,
        version_id: &VersionId,
        update: &StatusUpdate,
        precondition: F,
    ) -> Result<StatusRecord, EngineError>
    where
        F: Fn(&StatusSnapshot) -> Result<(), EngineError>,
    {
        let span = tracing::debug_span!("status.update", version_id = %version_id);
        let _guard = span.enter();

        for attempt in 1..=self.max_attempts {
            let current = self.store.status(version_id)?;
            precondition(&current.status)?;

            let next = update.merge(&current.status);
            next.validate()?;

            let outcome = self.store.compare_and_set_status(
                version_id,
                current.revision,
                &next,
                self.clock.now(),
            )?;
            match outcome {
                CasOutcome::Applied(revision) => {
                    if next.approve != current.status.approve {
                        tracing::info!(
                            from = %current.status.approve,
                            to = %next.approve,
                            "approval status changed"
                        );
                    }
                    tracing::debug!(attempt, %revision, "status written");
                    return Ok(StatusRecord {
                        version_id: current.version_id,
                        name: current.name,
                        status: next,
                        revision,
                    });
                }
                CasOutcome::Stale { current: seen } => {
                    tracing::debug!(
                        attempt,
                        expected = %current.revision,
                        found = %seen,
                        "lost status race"
                    );
                }
            }
        }

        tracing::warn!(attempts = self.max_attempts, "status write attempts exhausted");
        Err(EngineError::ConcurrencyConflict {
            version: version_id.clone(),
            attempts: self.max_attempts,
        })
    }
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
