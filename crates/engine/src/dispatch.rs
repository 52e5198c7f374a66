// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stage dispatcher
//!
//! Sends one-way job triggers to the CI system. A trigger that fails is
//! compensated immediately: the stage and the flow are written to `fail`
//! before the error is returned, so no stage waits on a job that was never
//! started.

use crate::error::EngineError;
use crate::sync::StatusSynchronizer;
use gantry_adapters::{CiAdapter, CiError, DispatchRequest};
use gantry_core::{
    Clock, HelmValues, Project, Stage, StageStatus, StatusUpdate, Version, VersionId, VersionName,
};
use gantry_storage::VersionStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::Instrument;

/// Default bound on a single trigger call
pub const DEFAULT_DISPATCH_TIMEOUT: Duration = Duration::from_secs(10);

/// How the two pre-approval stages are started
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchStrategy {
    /// Code analysis first; build+scan only if that trigger went out and the
    /// flow has not failed since
    #[default]
    Sequential,
    /// Both at once; each failure compensated on its own
    Parallel,
}

/// What a stage's job should run against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchTarget {
    pub version_name: VersionName,
    pub repository: String,
    pub git_ref: String,
    pub inputs: BTreeMap<String, String>,
}

impl DispatchTarget {
    fn base(version: &Version, project: &Project) -> Self {
        Self {
            version_name: version.name,
            repository: project.repository.clone(),
            git_ref: version.branch.clone(),
            inputs: BTreeMap::new(),
        }
    }

    fn input(mut self, key: &str, value: impl Into<String>) -> Self {
        self.inputs.insert(key.to_string(), value.into());
        self
    }

    pub fn code_analysis(version: &Version, project: &Project) -> Self {
        Self::base(version, project)
    }

    pub fn build_scan(version: &Version, project: &Project) -> Self {
        Self::base(version, project)
            .input("build_context", project.build_context.as_str())
            .input("image", version.image.as_str())
    }

    pub fn deploy(
        version: &Version,
        project: &Project,
        helm: &HelmValues,
    ) -> Result<Self, EngineError> {
        let helm_values = serde_json::to_string(helm)?;
        Ok(Self::base(version, project)
            .input("image", version.image.as_str())
            .input("helm_values", helm_values))
    }
}

/// Pre-approval stages to start; `None` leaves a stage alone
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreApprovalJobs {
    pub code_analysis: Option<DispatchTarget>,
    pub build_scan: Option<DispatchTarget>,
}

impl PreApprovalJobs {
    /// Both stages, as started right after initiation
    pub fn all(version: &Version, project: &Project) -> Self {
        Self {
            code_analysis: Some(DispatchTarget::code_analysis(version, project)),
            build_scan: Some(DispatchTarget::build_scan(version, project)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.code_analysis.is_none() && self.build_scan.is_none()
    }

    /// Status write claiming the stages `strategy` triggers straight away.
    ///
    /// Sequential starts only its first stage; build+scan is claimed later,
    /// once the code analysis trigger has gone out.
    pub fn claim(&self, strategy: DispatchStrategy) -> StatusUpdate {
        let mut claim = StatusUpdate::new().flow(StageStatus::Pending);
        if self.code_analysis.is_some() {
            claim = claim.code(StageStatus::Pending);
            if strategy == DispatchStrategy::Sequential {
                return claim;
            }
        }
        if self.build_scan.is_some() {
            claim = claim.build(StageStatus::Pending).image(StageStatus::Pending);
        }
        claim
    }
}

pub struct StageDispatcher<C, S: ?Sized, K> {
    ci: C,
    sync: StatusSynchronizer<S, K>,
    callback_base_url: String,
    timeout: Duration,
}

impl<C, S, K> StageDispatcher<C, S, K>
where
    C: CiAdapter,
    S: VersionStore + ?Sized,
    K: Clock,
{
    pub fn new(
        ci: C,
        sync: StatusSynchronizer<S, K>,
        callback_base_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            ci,
            sync,
            callback_base_url: callback_base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// Where the CI system reports the stage's result
    pub fn callback_url(&self, version_id: &VersionId, stage: Stage) -> String {
        format!(
            "{}/versions/{}/callbacks/{}",
            self.callback_base_url,
            version_id,
            stage.slug()
        )
    }

    /// Trigger `stage` for a version, compensating on failure
    pub async fn dispatch(
        &self,
        stage: Stage,
        version_id: &VersionId,
        target: DispatchTarget,
    ) -> Result<(), EngineError> {
        let span = tracing::info_span!("dispatch", %stage, version_id = %version_id);
        async {
            let request = DispatchRequest {
                stage,
                version_id: version_id.clone(),
                version_name: target.version_name,
                repository: target.repository,
                git_ref: target.git_ref,
                callback_url: self.callback_url(version_id, stage),
                inputs: target.inputs,
            };

            let result = match tokio::time::timeout(self.timeout, self.ci.trigger(&request)).await
            {
                Ok(result) => result,
                Err(_) => Err(CiError::Timeout(self.timeout)),
            };

            let source = match result {
                Ok(()) => {
                    tracing::info!("stage dispatched");
                    return Ok(());
                }
                Err(source) => source,
            };

            tracing::warn!(error = %source, "trigger failed, marking stage failed");
            if let Err(e) = self.sync.update_status(version_id, &stage.failed()) {
                tracing::error!(error = %e, "compensation failed");
                return Err(e);
            }
            Err(EngineError::Dispatch {
                stage,
                version: version_id.clone(),
                source,
            })
        }
        .instrument(span)
        .await
    }

    /// Claim the pre-approval stages with one write, then trigger them
    pub async fn start_with(
        &self,
        strategy: DispatchStrategy,
        version_id: &VersionId,
        jobs: PreApprovalJobs,
    ) -> Result<(), EngineError> {
        if jobs.is_empty() {
            return Ok(());
        }
        self.sync.update_status(version_id, &jobs.claim(strategy))?;
        self.run(strategy, version_id, jobs).await
    }

    /// Start code analysis, then build+scan; stop at the first failure
    pub async fn start_sequential(
        &self,
        version_id: &VersionId,
        jobs: PreApprovalJobs,
    ) -> Result<(), EngineError> {
        self.start_with(DispatchStrategy::Sequential, version_id, jobs)
            .await
    }

    /// Start both stages at once. The first error is returned once both
    /// triggers have finished.
    pub async fn start_parallel(
        &self,
        version_id: &VersionId,
        jobs: PreApprovalJobs,
    ) -> Result<(), EngineError> {
        self.start_with(DispatchStrategy::Parallel, version_id, jobs)
            .await
    }

    /// Trigger stages already claimed with [`PreApprovalJobs::claim`]
    pub async fn run(
        &self,
        strategy: DispatchStrategy,
        version_id: &VersionId,
        jobs: PreApprovalJobs,
    ) -> Result<(), EngineError> {
        match strategy {
            DispatchStrategy::Sequential => self.run_sequential(version_id, jobs).await,
            DispatchStrategy::Parallel => self.run_parallel(version_id, jobs).await,
        }
    }

    async fn run_sequential(
        &self,
        version_id: &VersionId,
        jobs: PreApprovalJobs,
    ) -> Result<(), EngineError> {
        let after_code_analysis = jobs.code_analysis.is_some();
        if let Some(target) = jobs.code_analysis {
            self.dispatch(Stage::CodeAnalysis, version_id, target).await?;
        }
        if let Some(target) = jobs.build_scan {
            if after_code_analysis && !self.advance(Stage::BuildScan, version_id)? {
                return Ok(());
            }
            self.dispatch(Stage::BuildScan, version_id, target).await?;
        }
        Ok(())
    }

    async fn run_parallel(
        &self,
        version_id: &VersionId,
        jobs: PreApprovalJobs,
    ) -> Result<(), EngineError> {
        let code = async {
            match jobs.code_analysis {
                Some(target) => self.dispatch(Stage::CodeAnalysis, version_id, target).await,
                None => Ok(()),
            }
        };
        let build = async {
            match jobs.build_scan {
                Some(target) => self.dispatch(Stage::BuildScan, version_id, target).await,
                None => Ok(()),
            }
        };
        let (code, build) = tokio::join!(code, build);
        code.and(build)
    }

    /// Mark a follow-up stage pending, leaving the flow alone. Returns
    /// `false` without writing when the flow failed in the meantime, e.g.
    /// because the previous stage already reported a failure.
    fn advance(&self, stage: Stage, version_id: &VersionId) -> Result<bool, EngineError> {
        let result = self.sync.update_status_when(
            version_id,
            &stage.fields(StageStatus::Pending),
            |status| {
                if status.flow == StageStatus::Fail {
                    return Err(EngineError::InvalidState(format!(
                        "flow of version {} has failed",
                        version_id
                    )));
                }
                Ok(())
            },
        );
        match result {
            Ok(_) => Ok(true),
            // Stage fields alone never break the snapshot invariants, so
            // this can only be the failed flow
            Err(EngineError::InvalidState(reason)) => {
                tracing::info!(%stage, %reason, "not starting stage");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
