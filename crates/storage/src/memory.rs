// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory store

use crate::store::{CasOutcome, NewVersion, StatusRecord, StoreError, VersionStore};
use chrono::{DateTime, Utc};
use gantry_core::{
    CodeAnalysis, HelmValues, HelmValuesId, Project, ProjectId, Revision, StageStatus,
    StatusSnapshot, Version, VersionId, VersionName,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Tables {
    projects: HashMap<ProjectId, Project>,
    /// Version rows with their insertion sequence
    versions: HashMap<VersionId, (u64, Version)>,
    helm_values: HashMap<HelmValuesId, HelmValues>,
    code_analyses: HashMap<VersionId, CodeAnalysis>,
    next_seq: u64,
}

/// Store backed by mutex-guarded maps; clones share the same tables
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Tables {
    fn version_mut(&mut self, id: &VersionId) -> Result<&mut Version, StoreError> {
        self.versions
            .get_mut(id)
            .map(|(_, v)| v)
            .ok_or_else(|| StoreError::version_not_found(id))
    }
}

impl VersionStore for MemoryStore {
    fn upsert_project(&self, project: &Project) -> Result<(), StoreError> {
        self.tables()
            .projects
            .insert(project.id.clone(), project.clone());
        Ok(())
    }

    fn project(&self, id: &ProjectId) -> Result<Project, StoreError> {
        self.tables()
            .projects
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::project_not_found(id))
    }

    fn latest_version_name(&self, project: &ProjectId) -> Result<Option<VersionName>, StoreError> {
        Ok(self
            .tables()
            .versions
            .values()
            .filter(|(_, v)| &v.project_id == project)
            .max_by_key(|(seq, _)| *seq)
            .map(|(_, v)| v.name))
    }

    fn create_version(&self, new: &NewVersion) -> Result<(), StoreError> {
        let mut tables = self.tables();
        let version = &new.version;
        if !tables.projects.contains_key(&version.project_id) {
            return Err(StoreError::project_not_found(&version.project_id));
        }
        let taken = tables
            .versions
            .values()
            .any(|(_, v)| v.project_id == version.project_id && v.name == version.name);
        if taken {
            return Err(StoreError::DuplicateName {
                project: version.project_id.clone(),
                name: version.name,
            });
        }

        tables.next_seq += 1;
        let seq = tables.next_seq;
        tables
            .helm_values
            .insert(new.helm_values.id.clone(), new.helm_values.clone());
        tables
            .code_analyses
            .insert(version.id.clone(), new.code_analysis.clone());
        tables
            .versions
            .insert(version.id.clone(), (seq, version.clone()));
        Ok(())
    }

    fn version(&self, id: &VersionId) -> Result<Version, StoreError> {
        self.tables()
            .versions
            .get(id)
            .map(|(_, v)| v.clone())
            .ok_or_else(|| StoreError::version_not_found(id))
    }

    fn status(&self, id: &VersionId) -> Result<StatusRecord, StoreError> {
        let version = self.version(id)?;
        Ok(StatusRecord {
            version_id: version.id,
            name: version.name,
            status: version.status,
            revision: version.revision,
        })
    }

    fn compare_and_set_status(
        &self,
        id: &VersionId,
        expected: Revision,
        status: &StatusSnapshot,
        at: DateTime<Utc>,
    ) -> Result<CasOutcome, StoreError> {
        let mut tables = self.tables();
        let version = tables.version_mut(id)?;
        if version.revision != expected {
            return Ok(CasOutcome::Stale {
                current: version.revision,
            });
        }
        version.status = *status;
        version.revision = expected.next();
        version.updated_at = at;
        Ok(CasOutcome::Applied(version.revision))
    }

    fn helm_values(&self, id: &HelmValuesId) -> Result<HelmValues, StoreError> {
        self.tables()
            .helm_values
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::helm_values_not_found(id))
    }

    fn code_analysis(&self, version: &VersionId) -> Result<CodeAnalysis, StoreError> {
        self.tables()
            .code_analyses
            .get(version)
            .cloned()
            .ok_or_else(|| StoreError::code_analysis_not_found(version))
    }

    fn record_code_analysis(
        &self,
        version: &VersionId,
        status: StageStatus,
        report_url: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables();
        let analysis = tables
            .code_analyses
            .get_mut(version)
            .ok_or_else(|| StoreError::code_analysis_not_found(version))?;
        analysis.status = status;
        if let Some(url) = report_url {
            analysis.report_url = Some(url.to_string());
        }
        analysis.updated_at = at;
        Ok(())
    }

    fn record_scan_report(
        &self,
        version: &VersionId,
        report_url: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables();
        let version = tables.version_mut(version)?;
        version.scan_report_url = Some(report_url.to_string());
        version.updated_at = at;
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
