// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Callback ingestors
//!
//! Turn a CI callback into at most one artifact write plus one status write.
//! Re-delivered callbacks merge onto whatever is stored and so land on the
//! same status.

use crate::error::EngineError;
use crate::sync::StatusSynchronizer;
use gantry_core::{Clock, Outcome, Stage, StageStatus, VersionId};
use gantry_storage::{StatusRecord, VersionStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Callback body as received; every field is checked before use
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackPayload {
    #[serde(default)]
    pub version_id: Option<String>,
    #[serde(default)]
    pub outcome: Option<String>,
    #[serde(default)]
    pub artifact_location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Callback {
    version_id: VersionId,
    outcome: Outcome,
    artifact: Option<String>,
}

fn validate(stage: Stage, payload: &CallbackPayload) -> Result<Callback, EngineError> {
    let version_id = payload
        .version_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| EngineError::InvalidInput("versionId is required".to_string()))?;
    let outcome: Outcome = payload
        .outcome
        .as_deref()
        .ok_or_else(|| EngineError::InvalidInput("outcome is required".to_string()))?
        .parse()
        .map_err(EngineError::InvalidInput)?;

    let artifact = match payload.artifact_location.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => {
            url::Url::parse(raw).map_err(|e| {
                EngineError::InvalidInput(format!(
                    "artifactLocation must be an absolute URL: {}",
                    e
                ))
            })?;
            Some(raw.to_string())
        }
        _ => None,
    };
    let needs_artifact = matches!(stage, Stage::CodeAnalysis | Stage::BuildScan);
    if needs_artifact && outcome == Outcome::Success && artifact.is_none() {
        return Err(EngineError::InvalidInput(format!(
            "artifactLocation is required for a successful {} callback",
            stage
        )));
    }

    Ok(Callback {
        version_id: VersionId::new(version_id),
        outcome,
        artifact,
    })
}

pub struct CallbackIngestor<S: ?Sized, K> {
    store: Arc<S>,
    sync: StatusSynchronizer<S, K>,
    clock: K,
}

impl<S, K> CallbackIngestor<S, K>
where
    S: VersionStore + ?Sized,
    K: Clock,
{
    pub fn new(store: Arc<S>, sync: StatusSynchronizer<S, K>, clock: K) -> Self {
        Self { store, sync, clock }
    }

    pub fn ingest_code_analysis(
        &self,
        payload: &CallbackPayload,
    ) -> Result<StatusRecord, EngineError> {
        self.ingest(Stage::CodeAnalysis, payload)
    }

    pub fn ingest_build_scan(&self, payload: &CallbackPayload) -> Result<StatusRecord, EngineError> {
        self.ingest(Stage::BuildScan, payload)
    }

    pub fn ingest_deploy(&self, payload: &CallbackPayload) -> Result<StatusRecord, EngineError> {
        self.ingest(Stage::Deploy, payload)
    }

    pub fn ingest(
        &self,
        stage: Stage,
        payload: &CallbackPayload,
    ) -> Result<StatusRecord, EngineError> {
        let callback = validate(stage, payload)?;
        let span = tracing::info_span!(
            "ingest",
            %stage,
            version_id = %callback.version_id,
            outcome = %callback.outcome,
        );
        let _guard = span.enter();

        let now = self.clock.now();
        let status = match callback.outcome {
            Outcome::Success => StageStatus::Success,
            Outcome::Fail => StageStatus::Fail,
        };
        match stage {
            Stage::CodeAnalysis => self.store.record_code_analysis(
                &callback.version_id,
                status,
                callback.artifact.as_deref(),
                now,
            )?,
            Stage::BuildScan => {
                if let Some(report) = callback.artifact.as_deref() {
                    self.store
                        .record_scan_report(&callback.version_id, report, now)?;
                }
            }
            Stage::Deploy => {}
        }

        let record = self
            .sync
            .update_status(&callback.version_id, &stage.reported(callback.outcome))?;
        tracing::info!(flow = %record.status.flow, approve = %record.status.approve, "callback applied");
        Ok(record)
    }
}

#[cfg(test)]
#[path = "ingest_tests.rs"]
mod tests;
