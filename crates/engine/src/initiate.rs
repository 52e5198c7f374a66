// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline initiator

use crate::error::EngineError;
use gantry_core::{
    Clock, CodeAnalysis, HelmOverrides, HelmValues, IdGen, ProjectId, Revision, StatusSnapshot,
    Version, VersionId, VersionName,
};
use gantry_storage::{NewVersion, StoreError, VersionStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Name collisions tolerated before giving up
pub const MAX_NAMING_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateRequest {
    pub branch: String,
    #[serde(default)]
    pub helm_overrides: HelmOverrides,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Initiated {
    pub version_id: VersionId,
    pub version_name: VersionName,
}

/// Creates versions together with their Helm snapshot and code analysis row
pub struct PipelineInitiator<S: ?Sized, K, I> {
    store: Arc<S>,
    clock: K,
    ids: I,
}

impl<S, K, I> PipelineInitiator<S, K, I>
where
    S: VersionStore + ?Sized,
    K: Clock,
    I: IdGen,
{
    pub fn new(store: Arc<S>, clock: K, ids: I) -> Self {
        Self { store, clock, ids }
    }

    pub fn initiate(
        &self,
        project_id: &ProjectId,
        request: &InitiateRequest,
    ) -> Result<Initiated, EngineError> {
        let span = tracing::info_span!("initiate", project_id = %project_id);
        let _guard = span.enter();

        let branch = request.branch.trim();
        if branch.is_empty() {
            return Err(EngineError::InvalidInput("branch must not be empty".to_string()));
        }
        if request.helm_overrides.replica_count == Some(0) {
            return Err(EngineError::InvalidInput(
                "replicaCount must be at least 1".to_string(),
            ));
        }

        let project = self.store.project(project_id)?;
        let helm_values = HelmValues::resolve(
            self.ids.helm_values_id(),
            &request.helm_overrides,
            &project.helm,
        )
        .map_err(|e| EngineError::InvalidInput(e.to_string()))?;

        let mut name = VersionName::after(self.store.latest_version_name(project_id)?)?;
        for attempt in 1..=MAX_NAMING_ATTEMPTS {
            let version_id = self.ids.version_id();
            let now = self.clock.now();
            let new = NewVersion {
                version: Version {
                    id: version_id.clone(),
                    project_id: project.id.clone(),
                    name,
                    branch: branch.to_string(),
                    image: project.image_for(&name),
                    helm_values_id: helm_values.id.clone(),
                    scan_report_url: None,
                    status: StatusSnapshot::initial(),
                    revision: Revision::INITIAL,
                    created_at: now,
                    updated_at: now,
                },
                helm_values: helm_values.clone(),
                code_analysis: CodeAnalysis::pending(version_id.clone(), now),
            };

            match self.store.create_version(&new) {
                Ok(()) => {
                    tracing::info!(%version_id, version_name = %name, attempt, "version created");
                    return Ok(Initiated {
                        version_id,
                        version_name: name,
                    });
                }
                Err(StoreError::DuplicateName { .. }) => {
                    tracing::debug!(attempt, taken = %name, "version name taken");
                    name = name.next()?;
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::warn!(attempts = MAX_NAMING_ATTEMPTS, "could not find a free version name");
        Err(EngineError::NamingExhausted {
            project: project_id.clone(),
            attempts: MAX_NAMING_ATTEMPTS,
        })
    }
}

#[cfg(test)]
#[path = "initiate_tests.rs"]
mod tests;
