// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Approval gate

use crate::dispatch::{DispatchTarget, StageDispatcher};
use crate::error::EngineError;
use crate::sync::StatusSynchronizer;
use gantry_adapters::CiAdapter;
use gantry_core::{ApproveStatus, Clock, Stage, StageStatus, StatusSnapshot, StatusUpdate, VersionId};
use gantry_storage::{StatusRecord, VersionStore};
use std::sync::Arc;
use tracing::Instrument;

fn awaiting_decision(status: &StatusSnapshot) -> Result<(), EngineError> {
    if status.approve == ApproveStatus::Pending {
        Ok(())
    } else {
        Err(EngineError::InvalidState(format!(
            "version is not awaiting approval (approval is {})",
            status.approve
        )))
    }
}

/// Records a human decision and, on approval, starts the deployment
pub struct ApprovalGate<C, S: ?Sized, K> {
    store: Arc<S>,
    sync: StatusSynchronizer<S, K>,
    dispatcher: Arc<StageDispatcher<C, S, K>>,
}

impl<C, S, K> ApprovalGate<C, S, K>
where
    C: CiAdapter,
    S: VersionStore + ?Sized,
    K: Clock,
{
    pub fn new(
        store: Arc<S>,
        sync: StatusSynchronizer<S, K>,
        dispatcher: Arc<StageDispatcher<C, S, K>>,
    ) -> Self {
        Self {
            store,
            sync,
            dispatcher,
        }
    }

    pub async fn decide(
        &self,
        version_id: &VersionId,
        approved: bool,
    ) -> Result<StatusRecord, EngineError> {
        let span = tracing::info_span!("approval", version_id = %version_id, approved);
        async {
            if !approved {
                let record = self.sync.update_status_when(
                    version_id,
                    &StatusUpdate::new()
                        .approve(ApproveStatus::Rejected)
                        .flow(StageStatus::Fail),
                    awaiting_decision,
                )?;
                tracing::info!("version rejected");
                return Ok(record);
            }

            // Everything the deployment needs is read before approval is recorded
            let version = self.store.version(version_id)?;
            awaiting_decision(&version.status)?;
            let project = self.store.project(&version.project_id)?;
            let helm = self.store.helm_values(&version.helm_values_id)?;
            let target = DispatchTarget::deploy(&version, &project, &helm)?;

            self.sync.update_status_when(
                version_id,
                &StatusUpdate::new()
                    .approve(ApproveStatus::Approved)
                    .deploy(StageStatus::Pending)
                    .flow(StageStatus::Pending),
                awaiting_decision,
            )?;
            tracing::info!("version approved");

            self.dispatcher
                .dispatch(Stage::Deploy, version_id, target)
                .await?;
            self.sync.status(version_id)
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[path = "approval_tests.rs"]
mod tests;
