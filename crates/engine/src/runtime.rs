// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime for the Gantry engine
//!
//! Wires the synchronizer, dispatcher, initiator, ingestors, approval gate
//! and retry around one store and one CI adapter.

use crate::approval::ApprovalGate;
use crate::dispatch::{DispatchStrategy, PreApprovalJobs, StageDispatcher, DEFAULT_DISPATCH_TIMEOUT};
use crate::error::EngineError;
use crate::ingest::{CallbackIngestor, CallbackPayload};
use crate::initiate::{InitiateRequest, Initiated, PipelineInitiator};
use crate::retry::Retrier;
use crate::sync::{StatusSynchronizer, DEFAULT_WRITE_ATTEMPTS};
use gantry_adapters::CiAdapter;
use gantry_core::{Clock, IdGen, ProjectId, Stage, SystemClock, UuidIdGen, VersionId};
use gantry_storage::{StatusRecord, VersionStore};
use std::sync::Arc;
use std::time::Duration;

/// Runtime behaviour configuration
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Externally reachable base URL the CI system calls back on
    pub callback_base_url: String,
    pub dispatch_timeout: Duration,
    pub dispatch_strategy: DispatchStrategy,
    pub status_write_attempts: u32,
}

impl RuntimeConfig {
    pub fn new(callback_base_url: impl Into<String>) -> Self {
        Self {
            callback_base_url: callback_base_url.into(),
            dispatch_timeout: DEFAULT_DISPATCH_TIMEOUT,
            dispatch_strategy: DispatchStrategy::default(),
            status_write_attempts: DEFAULT_WRITE_ATTEMPTS,
        }
    }
}

/// Runtime adapter dependencies
pub struct RuntimeDeps<C, S: ?Sized> {
    pub ci: C,
    pub store: Arc<S>,
}

/// Runtime that coordinates versions through the pipeline
pub struct Runtime<C, S: ?Sized, K = SystemClock, I = UuidIdGen> {
    store: Arc<S>,
    sync: StatusSynchronizer<S, K>,
    initiator: PipelineInitiator<S, K, I>,
    dispatcher: Arc<StageDispatcher<C, S, K>>,
    ingestor: CallbackIngestor<S, K>,
    gate: ApprovalGate<C, S, K>,
    retrier: Retrier<C, S, K>,
    strategy: DispatchStrategy,
}

impl<C, S, K, I> Runtime<C, S, K, I>
where
    C: CiAdapter,
    S: VersionStore + ?Sized,
    K: Clock,
    I: IdGen,
{
    /// Create a new runtime
    pub fn new(deps: RuntimeDeps<C, S>, clock: K, id_gen: I, config: RuntimeConfig) -> Self {
        let store = deps.store;
        let sync = StatusSynchronizer::new(
            Arc::clone(&store),
            clock.clone(),
            config.status_write_attempts,
        );
        let dispatcher = Arc::new(StageDispatcher::new(
            deps.ci,
            sync.clone(),
            config.callback_base_url,
            config.dispatch_timeout,
        ));

        Self {
            initiator: PipelineInitiator::new(Arc::clone(&store), clock.clone(), id_gen),
            ingestor: CallbackIngestor::new(Arc::clone(&store), sync.clone(), clock),
            gate: ApprovalGate::new(Arc::clone(&store), sync.clone(), Arc::clone(&dispatcher)),
            retrier: Retrier::new(
                Arc::clone(&store),
                sync.clone(),
                Arc::clone(&dispatcher),
                config.dispatch_strategy,
            ),
            strategy: config.dispatch_strategy,
            dispatcher,
            sync,
            store,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn synchronizer(&self) -> &StatusSynchronizer<S, K> {
        &self.sync
    }

    pub fn dispatcher(&self) -> &StageDispatcher<C, S, K> {
        &self.dispatcher
    }

    /// Initiate a version and start its pre-approval stages.
    ///
    /// A failed trigger is returned as an error; the version still exists
    /// with its stage and flow marked failed, and can be retried.
    pub async fn create_version(
        &self,
        project_id: &ProjectId,
        request: &InitiateRequest,
    ) -> Result<Initiated, EngineError> {
        let initiated = self.initiator.initiate(project_id, request)?;
        let version = self.store.version(&initiated.version_id)?;
        let project = self.store.project(project_id)?;

        self.dispatcher
            .start_with(
                self.strategy,
                &initiated.version_id,
                PreApprovalJobs::all(&version, &project),
            )
            .await?;
        Ok(initiated)
    }

    pub fn status(&self, version_id: &VersionId) -> Result<StatusRecord, EngineError> {
        self.sync.status(version_id)
    }

    pub fn callback(
        &self,
        stage: Stage,
        payload: &CallbackPayload,
    ) -> Result<StatusRecord, EngineError> {
        self.ingestor.ingest(stage, payload)
    }

    pub async fn decide(
        &self,
        version_id: &VersionId,
        approved: bool,
    ) -> Result<StatusRecord, EngineError> {
        self.gate.decide(version_id, approved).await
    }

    pub async fn retry(&self, version_id: &VersionId) -> Result<StatusRecord, EngineError> {
        self.retrier.retry(version_id).await
    }
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
