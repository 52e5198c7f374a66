// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Version record store contract

use chrono::{DateTime, Utc};
use gantry_core::{
    CodeAnalysis, HelmValues, HelmValuesId, Project, ProjectId, Revision, StageStatus,
    StatusSnapshot, Version, VersionId, VersionName,
};
use thiserror::Error;

/// Kinds of stored record, for not-found reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Project,
    Version,
    HelmValues,
    CodeAnalysis,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            RecordKind::Project => "project",
            RecordKind::Version => "version",
            RecordKind::HelmValues => "helm values",
            RecordKind::CodeAnalysis => "code analysis",
        })
    }
}

/// Errors raised by store implementations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: RecordKind, id: String },
    #[error("version {name} already exists in project {project}")]
    DuplicateName { project: ProjectId, name: VersionName },
    #[error("record {id} is corrupt: {reason}")]
    Corrupt { id: String, reason: String },
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    pub fn version_not_found(id: &VersionId) -> Self {
        StoreError::NotFound {
            kind: RecordKind::Version,
            id: id.to_string(),
        }
    }

    pub fn project_not_found(id: &ProjectId) -> Self {
        StoreError::NotFound {
            kind: RecordKind::Project,
            id: id.to_string(),
        }
    }

    pub fn helm_values_not_found(id: &HelmValuesId) -> Self {
        StoreError::NotFound {
            kind: RecordKind::HelmValues,
            id: id.to_string(),
        }
    }

    pub fn code_analysis_not_found(id: &VersionId) -> Self {
        StoreError::NotFound {
            kind: RecordKind::CodeAnalysis,
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Rows written together when a version is initiated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVersion {
    pub version: Version,
    pub helm_values: HelmValues,
    pub code_analysis: CodeAnalysis,
}

/// Status fields of a version as of one revision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRecord {
    pub version_id: VersionId,
    pub name: VersionName,
    pub status: StatusSnapshot,
    pub revision: Revision,
}

/// Result of a conditional status write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    /// The write landed and produced this revision
    Applied(Revision),
    /// Another writer moved the row on; nothing was written
    Stale { current: Revision },
}

/// Persistence for projects, versions and their sub-records.
///
/// Status fields are only ever rewritten through [`compare_and_set_status`],
/// which succeeds only when the caller's revision is still current.
///
/// [`compare_and_set_status`]: VersionStore::compare_and_set_status
pub trait VersionStore: Send + Sync + 'static {
    /// Insert or replace a project definition
    fn upsert_project(&self, project: &Project) -> Result<(), StoreError>;

    fn project(&self, id: &ProjectId) -> Result<Project, StoreError>;

    /// Name of the project's most recently created version
    fn latest_version_name(&self, project: &ProjectId) -> Result<Option<VersionName>, StoreError>;

    /// Write a version with its Helm values and code analysis atomically
    fn create_version(&self, new: &NewVersion) -> Result<(), StoreError>;

    fn version(&self, id: &VersionId) -> Result<Version, StoreError>;

    fn status(&self, id: &VersionId) -> Result<StatusRecord, StoreError>;

    /// Replace the status fields if the stored revision equals `expected`
    fn compare_and_set_status(
        &self,
        id: &VersionId,
        expected: Revision,
        status: &StatusSnapshot,
        at: DateTime<Utc>,
    ) -> Result<CasOutcome, StoreError>;

    fn helm_values(&self, id: &HelmValuesId) -> Result<HelmValues, StoreError>;

    fn code_analysis(&self, version: &VersionId) -> Result<CodeAnalysis, StoreError>;

    /// Record the analyzer's own outcome, independent of `Version.status.code`
    fn record_code_analysis(
        &self,
        version: &VersionId,
        status: StageStatus,
        report_url: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    fn record_scan_report(
        &self,
        version: &VersionId,
        report_url: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}
