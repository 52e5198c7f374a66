// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for engine tests

use crate::{
    DispatchStrategy, InitiateRequest, Initiated, PipelineInitiator, Runtime, RuntimeConfig,
    RuntimeDeps, StageDispatcher, StatusSynchronizer,
};
use chrono::{DateTime, Utc};
use gantry_adapters::FakeCiAdapter;
use gantry_core::{
    CodeAnalysis, FakeClock, HelmDefaults, HelmValues, HelmValuesId, Project, ProjectId,
    Revision, SequentialIdGen, StageStatus, StatusSnapshot, StatusUpdate, Version, VersionId,
    VersionName,
};
use gantry_storage::{
    CasOutcome, MemoryStore, NewVersion, StatusRecord, StoreError, VersionStore,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const CALLBACK_BASE: &str = "http://gantry.test";

pub fn project() -> Project {
    Project {
        id: ProjectId::new("shop"),
        name: "shop".to_string(),
        repository: "git@git.test:shop.git".to_string(),
        image_repository: "registry.test/shop".to_string(),
        build_context: "services/shop".to_string(),
        helm: HelmDefaults::default(),
    }
}

pub struct Harness<S: ?Sized = MemoryStore> {
    pub store: Arc<S>,
    pub ci: FakeCiAdapter,
    pub clock: FakeClock,
    pub ids: SequentialIdGen,
}

impl Harness<MemoryStore> {
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new())
    }
}

impl<S: VersionStore> Harness<S> {
    pub fn with_store(store: S) -> Self {
        store.upsert_project(&project()).unwrap();
        Self {
            store: Arc::new(store),
            ci: FakeCiAdapter::new(),
            clock: FakeClock::new(),
            ids: SequentialIdGen::new("id"),
        }
    }

    pub fn sync(&self) -> StatusSynchronizer<S, FakeClock> {
        StatusSynchronizer::new(Arc::clone(&self.store), self.clock.clone(), 2)
    }

    pub fn dispatcher(&self) -> StageDispatcher<FakeCiAdapter, S, FakeClock> {
        StageDispatcher::new(
            self.ci.clone(),
            self.sync(),
            CALLBACK_BASE,
            Duration::from_millis(200),
        )
    }

    pub fn runtime(
        &self,
        strategy: DispatchStrategy,
    ) -> Runtime<FakeCiAdapter, S, FakeClock, SequentialIdGen> {
        let mut config = RuntimeConfig::new(CALLBACK_BASE);
        config.dispatch_strategy = strategy;
        config.dispatch_timeout = Duration::from_millis(200);
        Runtime::new(
            RuntimeDeps {
                ci: self.ci.clone(),
                store: Arc::clone(&self.store),
            },
            self.clock.clone(),
            self.ids.clone(),
            config,
        )
    }

    /// Create a version without starting any stage
    pub fn initiate(&self) -> Initiated {
        PipelineInitiator::new(Arc::clone(&self.store), self.clock.clone(), self.ids.clone())
            .initiate(
                &project().id,
                &InitiateRequest {
                    branch: "main".to_string(),
                    ..Default::default()
                },
            )
            .unwrap()
    }

    /// Force status fields, bypassing the components under test
    pub fn force(&self, id: &VersionId, update: StatusUpdate) -> StatusRecord {
        self.sync().update_status(id, &update).unwrap()
    }

    pub fn status(&self, id: &VersionId) -> StatusSnapshot {
        self.store.status(id).unwrap().status
    }
}

/// Version that has passed both checks and awaits a decision
pub fn awaiting_approval(h: &Harness) -> VersionId {
    let id = h.initiate().version_id;
    h.force(
        &id,
        StatusUpdate::new()
            .code(StageStatus::Success)
            .build(StageStatus::Success)
            .image(StageStatus::Success),
    );
    id
}

/// Store wrapper that simulates other writers: queued updates land just
/// before the next conditional writes, and the latest version name can be
/// pinned to a stale value
pub struct ScriptedStore {
    inner: MemoryStore,
    races: Mutex<VecDeque<StatusUpdate>>,
    stale_latest: Mutex<Option<Option<VersionName>>>,
}

impl ScriptedStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            races: Mutex::new(VecDeque::new()),
            stale_latest: Mutex::new(None),
        }
    }

    /// Report `name` as the latest version name from now on
    pub fn pin_latest(&self, name: Option<VersionName>) {
        *self.stale_latest.lock().unwrap() = Some(name);
    }

    /// The next conditional write loses to `update`
    pub fn race_with(&self, update: StatusUpdate) {
        self.races.lock().unwrap().push_back(update);
    }

    pub fn pending_races(&self) -> usize {
        self.races.lock().unwrap().len()
    }
}

impl VersionStore for ScriptedStore {
    fn upsert_project(&self, project: &Project) -> Result<(), StoreError> {
        self.inner.upsert_project(project)
    }

    fn project(&self, id: &ProjectId) -> Result<Project, StoreError> {
        self.inner.project(id)
    }

    fn latest_version_name(&self, project: &ProjectId) -> Result<Option<VersionName>, StoreError> {
        if let Some(pinned) = *self.stale_latest.lock().unwrap() {
            return Ok(pinned);
        }
        self.inner.latest_version_name(project)
    }

    fn create_version(&self, new: &NewVersion) -> Result<(), StoreError> {
        self.inner.create_version(new)
    }

    fn version(&self, id: &VersionId) -> Result<Version, StoreError> {
        self.inner.version(id)
    }

    fn status(&self, id: &VersionId) -> Result<StatusRecord, StoreError> {
        self.inner.status(id)
    }

    fn compare_and_set_status(
        &self,
        id: &VersionId,
        expected: Revision,
        status: &StatusSnapshot,
        at: DateTime<Utc>,
    ) -> Result<CasOutcome, StoreError> {
        let race = self.races.lock().unwrap().pop_front();
        if let Some(update) = race {
            let current = self.inner.status(id)?;
            let theirs = update.merge(&current.status);
            self.inner
                .compare_and_set_status(id, current.revision, &theirs, at)?;
        }
        self.inner.compare_and_set_status(id, expected, status, at)
    }

    fn helm_values(&self, id: &HelmValuesId) -> Result<HelmValues, StoreError> {
        self.inner.helm_values(id)
    }

    fn code_analysis(&self, version: &VersionId) -> Result<CodeAnalysis, StoreError> {
        self.inner.code_analysis(version)
    }

    fn record_code_analysis(
        &self,
        version: &VersionId,
        status: StageStatus,
        report_url: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.inner
            .record_code_analysis(version, status, report_url, at)
    }

    fn record_scan_report(
        &self,
        version: &VersionId,
        report_url: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.inner.record_scan_report(version, report_url, at)
    }
}
