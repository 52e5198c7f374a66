// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Manual retry of failed stages
//!
//! Before approval, failed or never-started checks are started again with the
//! configured strategy. After approval, a failed deployment is dispatched
//! again with the version's existing Helm snapshot. Stages that already
//! succeeded are left alone.

use crate::dispatch::{DispatchStrategy, DispatchTarget, PreApprovalJobs, StageDispatcher};
use crate::error::EngineError;
use crate::sync::StatusSynchronizer;
use gantry_adapters::CiAdapter;
use gantry_core::{ApproveStatus, Clock, Stage, StageStatus, StatusSnapshot, VersionId};
use gantry_storage::{StatusRecord, VersionStore};
use std::sync::Arc;
use tracing::Instrument;

fn needs_rerun(status: StageStatus) -> bool {
    matches!(status, StageStatus::None | StageStatus::Fail)
}

fn retryable(status: &StatusSnapshot) -> Result<(), EngineError> {
    if status.flow != StageStatus::Fail {
        return Err(EngineError::InvalidState(format!(
            "only failed versions can be retried (flow is {})",
            status.flow
        )));
    }
    if status.approve == ApproveStatus::Rejected {
        return Err(EngineError::InvalidState(
            "rejected versions cannot be retried".to_string(),
        ));
    }
    Ok(())
}

pub struct Retrier<C, S: ?Sized, K> {
    store: Arc<S>,
    sync: StatusSynchronizer<S, K>,
    dispatcher: Arc<StageDispatcher<C, S, K>>,
    strategy: DispatchStrategy,
}

impl<C, S, K> Retrier<C, S, K>
where
    C: CiAdapter,
    S: VersionStore + ?Sized,
    K: Clock,
{
    pub fn new(
        store: Arc<S>,
        sync: StatusSynchronizer<S, K>,
        dispatcher: Arc<StageDispatcher<C, S, K>>,
        strategy: DispatchStrategy,
    ) -> Self {
        Self {
            store,
            sync,
            dispatcher,
            strategy,
        }
    }

    pub async fn retry(&self, version_id: &VersionId) -> Result<StatusRecord, EngineError> {
        let span = tracing::info_span!("retry", version_id = %version_id);
        async {
            let version = self.store.version(version_id)?;
            let status = version.status;
            retryable(&status)?;
            let project = self.store.project(&version.project_id)?;

            if status.approve == ApproveStatus::Approved {
                if status.deploy != StageStatus::Fail {
                    return Err(EngineError::InvalidState(format!(
                        "nothing to retry (deploy is {})",
                        status.deploy
                    )));
                }
                let helm = self.store.helm_values(&version.helm_values_id)?;
                let target = DispatchTarget::deploy(&version, &project, &helm)?;

                // Claiming the flow makes a concurrent retry fail the check above
                self.sync
                    .update_status_when(version_id, &Stage::Deploy.pending(), retryable)?;
                tracing::info!("retrying deployment");
                self.dispatcher
                    .dispatch(Stage::Deploy, version_id, target)
                    .await?;
                return self.sync.status(version_id);
            }

            let mut jobs = PreApprovalJobs::default();
            if needs_rerun(status.code) {
                jobs.code_analysis = Some(DispatchTarget::code_analysis(&version, &project));
            }
            if needs_rerun(status.build) || needs_rerun(status.image) {
                jobs.build_scan = Some(DispatchTarget::build_scan(&version, &project));
            }
            if jobs.is_empty() {
                return Err(EngineError::InvalidState(
                    "no failed stage to retry".to_string(),
                ));
            }

            self.sync
                .update_status_when(version_id, &jobs.claim(self.strategy), retryable)?;
            tracing::info!(
                code_analysis = jobs.code_analysis.is_some(),
                build_scan = jobs.build_scan.is_some(),
                "retrying checks"
            );
            self.dispatcher
                .run(self.strategy, version_id, jobs)
                .await?;
            self.sync.status(version_id)
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
